//! Append-only record of the log entries captured during a session.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Stored in place of empty or whitespace-only content.
pub const PLACEHOLDER: &str = "[No log entered]";

/// One note captured at an interval boundary. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Ordinal of the interval this entry closes out.
    pub interval: u32,
    pub captured_at: DateTime<Utc>,
    pub content: String,
    /// True when the capture window expired without user input.
    #[serde(default)]
    pub auto_saved: bool,
}

impl LogEntry {
    /// Build an entry, substituting [`PLACEHOLDER`] for blank content.
    pub fn new(interval: u32, captured_at: DateTime<Utc>, content: &str, auto_saved: bool) -> Self {
        let trimmed = content.trim();
        let content = if trimmed.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            interval,
            captured_at,
            content,
            auto_saved,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.content == PLACEHOLDER
    }

    /// Capture time in the local zone, e.g. `2:07:45 PM`.
    pub fn display_time(&self) -> String {
        self.captured_at
            .with_timezone(&Local)
            .format("%-I:%M:%S %p")
            .to_string()
    }
}

/// Ordered, append-only collection of [`LogEntry`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogLedger {
    entries: Vec<LogEntry>,
}

impl LogLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        debug_assert!(
            self.entries
                .last()
                .map_or(true, |last| last.interval < entry.interval),
            "ledger entries must be appended in interval order"
        );
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Immutable copy of the entries as of now.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot(self.entries.as_slice().into())
    }
}

/// Read-only view handed to the end-of-session collaborator.
///
/// Cheap to clone; later appends to the ledger are not visible through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot(Arc<[LogEntry]>);

impl LedgerSnapshot {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl Serialize for LedgerSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl Deref for LedgerSnapshot {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
