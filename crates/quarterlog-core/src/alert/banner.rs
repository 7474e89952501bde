//! In-app banner that hides itself after a fixed delay.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub title: String,
    pub body: String,
    pub shown_at: DateTime<Utc>,
    pub hide_at: DateTime<Utc>,
}

/// At most one banner is shown at a time; a new one replaces the old.
#[derive(Debug, Clone, Default)]
pub struct BannerSlot {
    current: Option<Banner>,
}

impl BannerSlot {
    pub fn show(&mut self, title: &str, body: &str, now: DateTime<Utc>, ttl: Duration) {
        self.current = Some(Banner {
            title: title.to_string(),
            body: body.to_string(),
            shown_at: now,
            hide_at: now + ttl,
        });
    }

    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// The banner, if it has not expired by `now`.
    pub fn visible(&self, now: DateTime<Utc>) -> Option<&Banner> {
        self.current.as_ref().filter(|b| now < b.hide_at)
    }
}
