//! Markdown rendering of a finished session.

use std::fmt::Display;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use super::SessionInfo;
use crate::ledger::LedgerSnapshot;

/// Everything needed to write the session file.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub info: SessionInfo,
    pub ended_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub entries: LedgerSnapshot,
}

impl SessionReport {
    /// `session_<n>_<YYYY-MM-DD>.md`, dated by the session start (UTC).
    pub fn file_name(&self) -> String {
        format!(
            "session_{}_{}.md",
            self.info.number,
            self.info.started_at.format("%Y-%m-%d")
        )
    }

    /// Render with times in the local zone.
    pub fn render(&self) -> String {
        self.render_in(&Local)
    }

    pub fn render_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: Display,
    {
        let start = self.info.started_at.with_timezone(tz);
        let end = self.ended_at.with_timezone(tz);
        let end_time = end.format("%-I:%M %p");

        let mut md = String::new();
        md.push_str(&format!("# Work Session #{} - {}\n\n", self.info.number, self.info.task_title));
        md.push_str(&format!("**Date:** {}\n\n", start.format("%A, %B %-d, %Y")));
        md.push_str(&format!("**Time:** {} - {}\n\n", start.format("%-I:%M %p"), end_time));
        md.push_str(&format!("**Duration:** {}\n\n", format_duration(self.elapsed.num_seconds())));
        md.push_str(&format!("**Folder:** {}\n\n", self.info.folder));
        md.push_str(&format!("**Description:** {}\n\n", self.info.description));
        md.push_str("---\n\n");
        md.push_str("## Session Logs\n\n");

        if self.entries.is_empty() {
            md.push_str("*No logs recorded during this session.*\n\n");
        } else {
            for entry in self.entries.iter() {
                let captured = entry.captured_at.with_timezone(tz).format("%-I:%M:%S %p");
                md.push_str(&format!("### Interval {} - {}\n\n", entry.interval, captured));
                md.push_str(&format!("{}\n\n", entry.content));
            }
        }

        md.push_str("---\n\n");
        md.push_str(&format!("*Session ended at {end_time}*\n"));
        md
    }
}

/// `1 hour, 2 minutes, 5 seconds`; zero parts are left out, and an empty
/// duration reads `0 seconds`.
pub fn format_duration(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    let plural = |n: i64, unit: &str| format!("{n} {unit}{}", if n == 1 { "" } else { "s" });
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if mins > 0 {
        parts.push(plural(mins, "minute"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(plural(secs, "second"));
    }
    parts.join(", ")
}

/// Compact clock display, `MM:SS`, used for countdowns.
pub fn format_clock(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// `1h 2m 5s` / `2m 5s`, used for the running elapsed display.
pub fn format_elapsed(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else {
        format!("{mins}m {secs}s")
    }
}
