//! Wall-clock time source.
//!
//! Every remaining/elapsed value in the crate is recomputed from an absolute
//! deadline against [`Clock::now`]. Nothing counts ticks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

/// Source of the current wall-clock time.
///
/// Implementations must never go backwards between two calls.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock, clamped so that it never reports an earlier instant
/// than one it already returned (NTP steps, manual clock changes).
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water_ms: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let now_ms = Utc::now().timestamp_millis();
        let prev = self.high_water_ms.fetch_max(now_ms, Ordering::SeqCst);
        let ms = prev.max(now_ms);
        from_millis(ms)
    }
}

/// A manually driven clock for tests and simulations.
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and give another to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Start the clock at the Unix epoch, so `at_secs(n)` reads as "t = n".
    pub fn at_epoch() -> Self {
        Self::new(from_millis(0))
    }

    /// Move forward by `secs` seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs.saturating_mul(1000));
    }

    /// Move forward by `ms` milliseconds. Negative values are ignored.
    pub fn advance_ms(&self, ms: i64) {
        if ms > 0 {
            self.now_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    /// Jump to `secs` seconds after the epoch. Jumps backwards are ignored.
    pub fn set_secs(&self, secs: i64) {
        self.now_ms
            .fetch_max(secs.saturating_mul(1000), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        from_millis(self.now_ms.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
