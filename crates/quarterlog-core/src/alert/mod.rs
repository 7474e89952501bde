//! Alert dispatching: sound, system notification, in-app banner.
//!
//! Each channel is best-effort and independent. A failure in one is recorded
//! in the [`AlertReport`] and logged, and never prevents the others.
//!
//! Concrete sound and notification backends live outside the core; they are
//! injected as [`SoundPlayer`] and [`Notifier`] trait objects.

mod banner;

pub use banner::{Banner, BannerSlot};

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AlertError;
use crate::timer::Clock;

const MAX_BANNER_SECS: u64 = 24 * 60 * 60;

/// Whether the user allowed system notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Never asked.
    #[default]
    Default,
    Granted,
    Denied,
}

/// Plays the audible cue.
pub trait SoundPlayer: Send {
    /// False while the sound resource is still loading.
    fn is_ready(&self) -> bool;

    /// Start playback at `volume` (0.0 ..= 1.0). Must not block until the
    /// sound finishes.
    fn play(&mut self, volume: f32) -> Result<(), AlertError>;
}

/// The operating system's notification substrate.
pub trait Notifier: Send {
    fn permission(&self) -> NotificationPermission;

    /// Ask for permission. Implementations without a prompt may probe the
    /// notification service and answer from that.
    fn request_permission(&mut self) -> NotificationPermission;

    fn notify(&mut self, title: &str, body: &str, icon: &str) -> Result<(), AlertError>;
}

/// Anything the timer engine can ask to raise an alert.
pub trait AlertSink {
    fn fire(&mut self, ctx: &AlertContext) -> AlertReport;

    /// The capture the alert announced is over; withdraw anything still showing.
    fn dismiss(&mut self);
}

/// What the alert is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertContext {
    pub title: String,
    pub body: String,
    /// Interval whose boundary triggered the alert; `None` for test alerts.
    pub interval: Option<u32>,
}

impl AlertContext {
    /// Alert for the end of interval `interval` of a task.
    pub fn boundary(task_title: &str, interval_secs: u64, interval: u32) -> Self {
        Self {
            title: format!("{} Complete!", describe_duration(interval_secs)),
            body: format!("Time to log your progress on \"{task_title}\""),
            interval: Some(interval),
        }
    }

    /// Alert raised on demand to check volume and permissions.
    pub fn test() -> Self {
        Self {
            title: "Test Alert".to_string(),
            body: "This is what an interval boundary sounds like".to_string(),
            interval: None,
        }
    }
}

fn describe_duration(secs: u64) -> String {
    match secs {
        s if s % 60 == 0 && s / 60 == 1 => "1 Minute".to_string(),
        s if s % 60 == 0 => format!("{} Minutes", s / 60),
        1 => "1 Second".to_string(),
        s => format!("{s} Seconds"),
    }
}

/// Result of one channel for one firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered,
    Skipped(String),
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ChannelOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReport {
    pub sound: ChannelOutcome,
    pub notification: ChannelOutcome,
    pub banner: ChannelOutcome,
}

impl AlertReport {
    pub fn failures(&self) -> usize {
        [&self.sound, &self.notification, &self.banner]
            .iter()
            .filter(|c| c.is_failed())
            .count()
    }
}

/// User-adjustable alert settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSettings {
    /// 0 ..= 100
    pub volume: u8,
    pub muted: bool,
    pub notifications_enabled: bool,
    pub banner_secs: u64,
    pub icon: String,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            volume: 70,
            muted: false,
            notifications_enabled: true,
            banner_secs: 8,
            icon: "alarm-clock".to_string(),
        }
    }
}

impl AlertSettings {
    /// Effective playback volume, 0.0 when muted.
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            f32::from(self.volume.min(100)) / 100.0
        }
    }
}

/// Fans one alert out to sound, notification and banner.
pub struct AlertDispatcher {
    sound: Box<dyn SoundPlayer>,
    notifier: Box<dyn Notifier>,
    settings: AlertSettings,
    banner: BannerSlot,
    clock: Arc<dyn Clock>,
}

impl AlertDispatcher {
    pub fn new(
        sound: Box<dyn SoundPlayer>,
        notifier: Box<dyn Notifier>,
        settings: AlertSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sound,
            notifier,
            settings,
            banner: BannerSlot::default(),
            clock,
        }
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.settings.volume = volume.min(100);
        if volume > 0 {
            self.settings.muted = false;
        }
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.settings.muted = !self.settings.muted;
        self.settings.muted
    }

    /// False while a background-loaded sound is still loading.
    pub fn sound_ready(&self) -> bool {
        self.sound.is_ready()
    }

    pub fn permission(&self) -> NotificationPermission {
        self.notifier.permission()
    }

    pub fn request_permission(&mut self) -> NotificationPermission {
        self.notifier.request_permission()
    }

    /// The banner, if one is showing and has not timed out.
    pub fn banner(&self) -> Option<&Banner> {
        self.banner.visible(self.clock.now())
    }

    pub fn dismiss_banner(&mut self) -> bool {
        self.banner.dismiss()
    }

    /// Fire outside the timer, e.g. from a "test sound" action.
    pub fn fire_test(&mut self) -> AlertReport {
        self.fire(&AlertContext::test())
    }

    fn play_sound(&mut self) -> ChannelOutcome {
        let gain = self.settings.gain();
        if gain <= 0.0 {
            return ChannelOutcome::Skipped("muted".into());
        }
        if !self.sound.is_ready() {
            return ChannelOutcome::Skipped("sound not loaded yet".into());
        }
        match self.sound.play(gain) {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => {
                warn!(error = %e, "alert sound failed");
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }

    fn raise_notification(&mut self, ctx: &AlertContext) -> ChannelOutcome {
        if !self.settings.notifications_enabled {
            return ChannelOutcome::Skipped("notifications disabled".into());
        }
        if self.notifier.permission() != NotificationPermission::Granted {
            return ChannelOutcome::Skipped("permission not granted".into());
        }
        match self.notifier.notify(&ctx.title, &ctx.body, &self.settings.icon) {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) => {
                warn!(error = %e, "system notification failed");
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }
}

impl AlertSink for AlertDispatcher {
    fn fire(&mut self, ctx: &AlertContext) -> AlertReport {
        let sound = self.play_sound();
        let notification = self.raise_notification(ctx);
        let ttl = Duration::seconds(self.settings.banner_secs.min(MAX_BANNER_SECS) as i64);
        self.banner.show(&ctx.title, &ctx.body, self.clock.now(), ttl);

        let report = AlertReport {
            sound,
            notification,
            banner: ChannelOutcome::Delivered,
        };
        debug!(interval = ?ctx.interval, ?report, "alert fired");
        report
    }

    fn dismiss(&mut self) {
        if self.banner.dismiss() {
            debug!("banner withdrawn");
        }
    }
}

/// Sound player with nothing to play. Always reports "not loaded".
#[derive(Debug, Default)]
pub struct NoSound;

impl SoundPlayer for NoSound {
    fn is_ready(&self) -> bool {
        false
    }

    fn play(&mut self, _volume: f32) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Notifier for environments without a notification service.
#[derive(Debug, Default)]
pub struct NoNotifier;

impl Notifier for NoNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn request_permission(&mut self) -> NotificationPermission {
        NotificationPermission::Denied
    }

    fn notify(&mut self, _title: &str, _body: &str, _icon: &str) -> Result<(), AlertError> {
        Ok(())
    }
}
