//! Triggers that drive the interval timer.
//!
//! Two kinds of trigger reach the engine: a periodic tick and a resume
//! signal raised when the process evidently slept (laptop lid closed,
//! SIGSTOP, a stalled terminal). Neither is trusted for timing; the engine
//! only uses them as a prompt to look at the clock.
//!
//! The loop waits on wall-clock targets in bounded steps, so a deadline is
//! honoured at or shortly after its instant even when the monotonic timer
//! stopped during a suspension.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::timer::Clock;

/// Smallest sleep the loop will schedule, to avoid spinning on a deadline
/// that is already due.
const MIN_STEP: StdDuration = StdDuration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Trigger {
    Tick,
    /// Wall-clock time jumped by `gap_ms` since the previous trigger.
    Resume { gap_ms: i64 },
}

/// Classifies wall-clock observations as regular ticks or resumes.
#[derive(Debug, Clone)]
pub struct ResumeDetector {
    threshold: Duration,
    last: Option<DateTime<Utc>>,
}

impl ResumeDetector {
    /// A gap longer than `threshold` between observations counts as a resume.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last: None,
        }
    }

    pub fn observe(&mut self, now: DateTime<Utc>) -> Trigger {
        let previous = self.last.replace(now);
        match previous {
            Some(prev) if now - prev > self.threshold => Trigger::Resume {
                gap_ms: (now - prev).num_milliseconds(),
            },
            _ => Trigger::Tick,
        }
    }

    /// Record `now` as the reference point without classifying it.
    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last = Some(now);
    }
}

/// Sleep until `clock` reads at least `target`, re-checking at most every
/// `max_step`.
pub async fn sleep_until(clock: &dyn Clock, target: DateTime<Utc>, max_step: StdDuration) {
    loop {
        let now = clock.now();
        if now >= target {
            return;
        }
        let left = (target - now).to_std().unwrap_or(MIN_STEP);
        tokio::time::sleep(left.min(max_step).max(MIN_STEP)).await;
    }
}

/// Periodic trigger source with suspension detection.
pub struct TickLoop {
    clock: Arc<dyn Clock>,
    period: StdDuration,
    detector: ResumeDetector,
}

impl TickLoop {
    /// Tick every `period`; a wall-clock gap of more than three periods
    /// (and at least two seconds) is reported as a resume.
    pub fn new(clock: Arc<dyn Clock>, period: StdDuration) -> Self {
        let period = period.max(MIN_STEP);
        let threshold = Duration::from_std(period * 3)
            .unwrap_or_else(|_| Duration::seconds(2))
            .max(Duration::seconds(2));
        Self {
            clock,
            period,
            detector: ResumeDetector::new(threshold),
        }
    }

    pub fn period(&self) -> StdDuration {
        self.period
    }

    /// Wait for the next trigger. When `deadline` falls before the next
    /// regular tick, wake at the deadline instead.
    ///
    /// Only the time spent asleep in this call counts towards a resume, so
    /// a call abandoned by `select!` leaves nothing stale behind.
    pub async fn next(&mut self, deadline: Option<DateTime<Utc>>) -> Trigger {
        let now = self.clock.now();
        self.detector.mark(now);
        let regular = now + Duration::from_std(self.period).unwrap_or_else(|_| Duration::seconds(1));
        let target = deadline.map_or(regular, |d| d.min(regular));
        sleep_until(self.clock.as_ref(), target, self.period).await;

        let trigger = self.detector.observe(self.clock.now());
        if let Trigger::Resume { gap_ms } = trigger {
            debug!(gap_ms, "wall clock jumped, treating as resume");
        }
        trigger
    }
}
