use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::AlertReport;
use crate::ledger::LogEntry;
use crate::timer::TimerPhase;

/// Every state change in the system produces an Event.
/// The CLI renders them, or streams them as JSON lines with `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A running interval reached its end and the capture window opened.
    BoundaryReached {
        interval: u32,
        /// Whole cycles that elapsed unseen before this boundary was noticed.
        missed_intervals: u32,
        /// Placeholder entry written for the missed backlog, if any.
        backlog_entry: Option<LogEntry>,
        capture_deadline: DateTime<Utc>,
        /// Provisional end of the next interval; recomputed on resolve.
        next_end_at: DateTime<Utc>,
        /// `None` when the single-shot guard suppressed the alert.
        alert: Option<AlertReport>,
        at: DateTime<Utc>,
    },
    /// The capture window closed and a new interval started.
    CaptureResolved {
        entry: LogEntry,
        next_interval: u32,
        end_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        interval: u32,
        /// Time left in the active phase, never negative.
        remaining_ms: i64,
        elapsed_secs: i64,
        logs_saved: usize,
        at: DateTime<Utc>,
    },
    SessionEnded {
        logs_saved: usize,
        elapsed_secs: i64,
        at: DateTime<Utc>,
    },
}
