//! Interval timer engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads or count ticks; every call compares absolute deadlines against
//! the injected [`Clock`]. The caller drives it by calling [`IntervalTimer::tick`]
//! at any cadence and [`IntervalTimer::resume`] after a suspension.
//!
//! ## State Transitions
//!
//! ```text
//! Running(n) --deadline--> Capturing(n) --resolve--> Running(n + 1)
//! ```
//!
//! `resolve` is the only way out of `Capturing`, whether the user saved a
//! note or the capture window expired.
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = IntervalTimer::new(config, "Write docs", start, clock, alerts);
//! // In a loop:
//! if let Some(event) = timer.tick() { /* boundary or auto-save */ }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::alert::{AlertContext, AlertSink};
use crate::error::ValidationError;
use crate::events::Event;
use crate::ledger::{LedgerSnapshot, LogEntry, LogLedger};

pub const DEFAULT_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_CAPTURE_SECS: u64 = 50;

/// Longest accepted interval or capture window (one week).
const MAX_PHASE_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Running,
    Capturing,
}

/// Durations the engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    interval: Duration,
    capture_window: Duration,
}

impl TimerConfig {
    pub fn new(interval_secs: u64, capture_secs: u64) -> Result<Self, ValidationError> {
        Ok(Self {
            interval: phase_duration("interval_secs", interval_secs)?,
            capture_window: phase_duration("capture_secs", capture_secs)?,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn capture_window(&self) -> Duration {
        self.capture_window
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval.num_seconds() as u64
    }

    /// One full unattended cycle: an interval plus its capture window.
    fn cycle(&self) -> Duration {
        self.interval + self.capture_window
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::seconds(DEFAULT_INTERVAL_SECS as i64),
            capture_window: Duration::seconds(DEFAULT_CAPTURE_SECS as i64),
        }
    }
}

fn phase_duration(field: &str, secs: u64) -> Result<Duration, ValidationError> {
    if secs == 0 || secs > MAX_PHASE_SECS {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("must be between 1 and {MAX_PHASE_SECS} seconds, got {secs}"),
        });
    }
    Ok(Duration::seconds(secs as i64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseState {
    Running {
        end_at: DateTime<Utc>,
    },
    Capturing {
        deadline: DateTime<Utc>,
        /// Display-only; the real deadline is set on resolve.
        next_end_at: DateTime<Utc>,
    },
}

/// Core interval timer.
///
/// Owns the log ledger for the duration of a session. Alerts go through the
/// injected [`AlertSink`]; their failures are logged and never affect the
/// phase transition.
pub struct IntervalTimer<A: AlertSink> {
    config: TimerConfig,
    clock: Arc<dyn Clock>,
    alerts: A,
    task_title: String,
    session_start: DateTime<Utc>,
    interval: u32,
    state: PhaseState,
    /// Single-shot alert guard. Consumed by the first boundary alert and
    /// re-armed only when a capture resolves and a new interval starts.
    alert_armed: bool,
    ledger: LogLedger,
}

impl<A: AlertSink> IntervalTimer<A> {
    /// Start interval 1 now.
    pub fn new(
        config: TimerConfig,
        task_title: &str,
        session_start: DateTime<Utc>,
        clock: Arc<dyn Clock>,
        alerts: A,
    ) -> Self {
        let now = clock.now();
        info!(task = task_title, interval_secs = config.interval_secs(), "interval timer started");
        Self {
            config,
            clock,
            alerts,
            task_title: task_title.to_string(),
            session_start,
            interval: 1,
            state: PhaseState::Running {
                end_at: now + config.interval,
            },
            alert_armed: true,
            ledger: LogLedger::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        match self.state {
            PhaseState::Running { .. } => TimerPhase::Running,
            PhaseState::Capturing { .. } => TimerPhase::Capturing,
        }
    }

    /// Ordinal of the current interval (1-based).
    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// End of the running interval. While capturing, the provisional end of
    /// the next one.
    pub fn end_at(&self) -> DateTime<Utc> {
        match self.state {
            PhaseState::Running { end_at } => end_at,
            PhaseState::Capturing { next_end_at, .. } => next_end_at,
        }
    }

    pub fn capture_deadline(&self) -> Option<DateTime<Utc>> {
        match self.state {
            PhaseState::Capturing { deadline, .. } => Some(deadline),
            PhaseState::Running { .. } => None,
        }
    }

    /// The next instant at which `tick` will change state.
    pub fn next_deadline(&self) -> DateTime<Utc> {
        match self.state {
            PhaseState::Running { end_at } => end_at,
            PhaseState::Capturing { deadline, .. } => deadline,
        }
    }

    /// Time left in the active phase, never negative.
    pub fn remaining(&self) -> Duration {
        (self.next_deadline() - self.clock.now()).max(Duration::zero())
    }

    /// Time since the session started, never negative.
    pub fn elapsed(&self) -> Duration {
        (self.clock.now() - self.session_start).max(Duration::zero())
    }

    pub fn ledger(&self) -> &LogLedger {
        &self.ledger
    }

    pub fn ledger_snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    pub fn alerts(&self) -> &A {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut A {
        &mut self.alerts
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase(),
            interval: self.interval,
            remaining_ms: self.remaining().num_milliseconds(),
            elapsed_secs: self.elapsed().num_seconds(),
            logs_saved: self.ledger.len(),
            at: self.clock.now(),
        }
    }

    /// Event describing the end of the session. The engine itself keeps
    /// no ended state; the caller simply stops driving it.
    pub fn end_event(&self) -> Event {
        Event::SessionEnded {
            logs_saved: self.ledger.len(),
            elapsed_secs: self.elapsed().num_seconds(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Call periodically. Returns an event when a boundary is reached or an
    /// expired capture window is auto-saved. Safe to call any number of
    /// times, including back to back at the same instant.
    pub fn tick(&mut self) -> Option<Event> {
        let now = self.clock.now();
        match self.state {
            PhaseState::Running { end_at } => {
                if end_at > now {
                    return None;
                }
                Some(self.enter_capture(now, end_at))
            }
            PhaseState::Capturing { deadline, .. } => {
                if now < deadline {
                    return None;
                }
                debug!(interval = self.interval, "capture window expired, auto-saving");
                self.resolve_at(now, "", true)
            }
        }
    }

    /// Execution resumed after a suspension. Takes the same path as `tick`.
    pub fn resume(&mut self) -> Option<Event> {
        debug!(interval = self.interval, phase = ?self.phase(), "resume");
        self.tick()
    }

    /// Save `content` for the current interval and start the next one.
    ///
    /// Returns `None` when no capture window is open.
    pub fn resolve(&mut self, content: &str) -> Option<Event> {
        let now = self.clock.now();
        self.resolve_at(now, content, false)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_capture(&mut self, now: DateTime<Utc>, end_at: DateTime<Utc>) -> Event {
        // Boundaries that passed unseen: collapse them into one placeholder
        // entry for the deepest missed interval and capture the latest.
        let overdue_ms = (now - end_at).num_milliseconds().max(0);
        let cycle_ms = self.config.cycle().num_milliseconds().max(1);
        let missed = u32::try_from(overdue_ms / cycle_ms).unwrap_or(u32::MAX);

        let backlog_entry = if missed > 0 {
            let deepest = self.interval.saturating_add(missed - 1);
            let entry = LogEntry::new(deepest, now, "", true);
            self.ledger.append(entry.clone());
            self.interval = self.interval.saturating_add(missed);
            warn!(missed, captured = self.interval, "boundaries missed while suspended");
            Some(entry)
        } else {
            None
        };

        let deadline = now + self.config.capture_window;
        let next_end_at = now + self.config.interval;
        self.state = PhaseState::Capturing {
            deadline,
            next_end_at,
        };
        info!(interval = self.interval, %deadline, "boundary reached, capture window open");

        let alert = self.fire_alert_once();
        Event::BoundaryReached {
            interval: self.interval,
            missed_intervals: missed,
            backlog_entry,
            capture_deadline: deadline,
            next_end_at,
            alert,
            at: now,
        }
    }

    fn fire_alert_once(&mut self) -> Option<crate::alert::AlertReport> {
        if !std::mem::replace(&mut self.alert_armed, false) {
            return None;
        }
        let ctx = AlertContext::boundary(&self.task_title, self.config.interval_secs(), self.interval);
        let report = self.alerts.fire(&ctx);
        if report.failures() > 0 {
            warn!(interval = self.interval, ?report, "alert partially failed");
        }
        Some(report)
    }

    fn resolve_at(&mut self, now: DateTime<Utc>, content: &str, auto_saved: bool) -> Option<Event> {
        let PhaseState::Capturing { .. } = self.state else {
            debug!(interval = self.interval, "resolve ignored: no capture window open");
            return None;
        };

        let entry = LogEntry::new(self.interval, now, content, auto_saved);
        self.ledger.append(entry.clone());
        self.interval = self.interval.saturating_add(1);
        let end_at = now + self.config.interval;
        self.state = PhaseState::Running { end_at };
        self.alerts.dismiss();
        self.alert_armed = true;
        info!(
            closed = entry.interval,
            auto_saved,
            next_interval = self.interval,
            "capture resolved"
        );

        Some(Event::CaptureResolved {
            entry,
            next_interval: self.interval,
            end_at,
            at: now,
        })
    }
}
