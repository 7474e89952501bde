//! Integration tests for the interval timer.
//!
//! Drives the engine with a manual clock through the boundary, capture,
//! auto-save and resume paths, using the real alert dispatcher with
//! in-memory sound and notification backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Duration;
use proptest::prelude::*;
use quarterlog_core::alert::{ChannelOutcome, NoNotifier, NoSound, Notifier, SoundPlayer};
use quarterlog_core::{
    AlertDispatcher, AlertError, AlertSettings, Clock, Event, IntervalTimer, ManualClock,
    NotificationPermission, TimerConfig, TimerPhase, PLACEHOLDER,
};

struct CountingSound(Arc<AtomicUsize>);

impl SoundPlayer for CountingSound {
    fn is_ready(&self) -> bool {
        true
    }

    fn play(&mut self, _volume: f32) -> Result<(), AlertError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenNotifier;

impl Notifier for BrokenNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn request_permission(&mut self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn notify(&mut self, _title: &str, _body: &str, _icon: &str) -> Result<(), AlertError> {
        Err(AlertError::Notification("no notification daemon".into()))
    }
}

fn setup() -> (ManualClock, Arc<AtomicUsize>, IntervalTimer<AlertDispatcher>) {
    let clock = ManualClock::at_epoch();
    let plays = Arc::new(AtomicUsize::new(0));
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let alerts = AlertDispatcher::new(
        Box::new(CountingSound(plays.clone())),
        Box::new(NoNotifier),
        AlertSettings::default(),
        shared.clone(),
    );
    let timer = IntervalTimer::new(
        TimerConfig::new(900, 50).unwrap(),
        "Write the parser",
        clock.now(),
        shared,
        alerts,
    );
    (clock, plays, timer)
}

#[test]
fn test_boundary_capture_and_auto_save() {
    let (clock, plays, mut timer) = setup();
    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(timer.interval(), 1);
    assert_eq!(timer.end_at().timestamp(), 900);

    clock.set_secs(899);
    assert!(timer.tick().is_none());

    clock.set_secs(900);
    match timer.tick() {
        Some(Event::BoundaryReached {
            interval,
            missed_intervals,
            capture_deadline,
            alert: Some(report),
            ..
        }) => {
            assert_eq!(interval, 1);
            assert_eq!(missed_intervals, 0);
            assert_eq!(capture_deadline.timestamp(), 950);
            assert_eq!(report.sound, ChannelOutcome::Delivered);
        }
        other => panic!("expected boundary, got {other:?}"),
    }
    assert_eq!(plays.load(Ordering::SeqCst), 1);
    let banner = timer.alerts().banner().expect("banner visible");
    assert_eq!(banner.title, "15 Minutes Complete!");
    assert_eq!(banner.body, "Time to log your progress on \"Write the parser\"");

    clock.set_secs(945);
    assert!(timer.tick().is_none());
    assert_eq!(timer.phase(), TimerPhase::Capturing);
    assert_eq!(timer.remaining(), Duration::seconds(5));

    clock.set_secs(951);
    match timer.tick() {
        Some(Event::CaptureResolved { entry, next_interval, end_at, .. }) => {
            assert_eq!(entry.interval, 1);
            assert_eq!(entry.content, PLACEHOLDER);
            assert!(entry.auto_saved);
            assert_eq!(next_interval, 2);
            assert_eq!(end_at.timestamp(), 1851);
        }
        other => panic!("expected auto-save, got {other:?}"),
    }
    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(timer.ledger().len(), 1);
    // still exactly one alert for the whole boundary
    assert_eq!(plays.load(Ordering::SeqCst), 1);
}

#[test]
fn test_manual_resolve_restarts_from_resolution_time() {
    let (clock, _plays, mut timer) = setup();
    clock.set_secs(900);
    timer.tick();

    clock.set_secs(920);
    let event = timer.resolve("  Wrote spec  ").expect("capture was open");
    assert!(matches!(event, Event::CaptureResolved { .. }));
    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(timer.end_at().timestamp(), 1820);

    let last = timer.ledger().last().unwrap();
    assert_eq!(last.interval, 1);
    assert_eq!(last.content, "Wrote spec");
    assert!(!last.auto_saved);

    // the old deadline passing changes nothing
    clock.set_secs(951);
    assert!(timer.tick().is_none());
    assert_eq!(timer.ledger().len(), 1);
}

#[test]
fn test_saving_a_log_clears_the_banner() {
    let (clock, _plays, mut timer) = setup();
    clock.set_secs(900);
    timer.tick();
    assert!(timer.alerts().banner().is_some());

    clock.set_secs(902);
    timer.resolve("done");
    assert!(timer.alerts().banner().is_none());
    assert!(!timer.alerts_mut().dismiss_banner());
}

#[test]
fn test_auto_save_clears_a_long_lived_banner() {
    let clock = ManualClock::at_epoch();
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let settings = AlertSettings {
        banner_secs: 600,
        ..AlertSettings::default()
    };
    let alerts = AlertDispatcher::new(Box::new(NoSound), Box::new(NoNotifier), settings, shared.clone());
    let mut timer = IntervalTimer::new(TimerConfig::new(900, 50).unwrap(), "t", clock.now(), shared, alerts);

    clock.set_secs(900);
    timer.tick();
    clock.set_secs(950);
    assert!(matches!(timer.tick(), Some(Event::CaptureResolved { .. })));
    assert!(timer.alerts().banner().is_none());
}

#[test]
fn test_resume_after_suspend_fires_one_alert() {
    let (clock, plays, mut timer) = setup();
    clock.set_secs(2000);

    match timer.resume() {
        Some(Event::BoundaryReached {
            interval,
            missed_intervals,
            backlog_entry: Some(backlog),
            capture_deadline,
            ..
        }) => {
            assert_eq!(missed_intervals, 1);
            assert_eq!(backlog.interval, 1);
            assert!(backlog.is_placeholder());
            assert_eq!(interval, 2);
            assert_eq!(capture_deadline.timestamp(), 2050);
        }
        other => panic!("expected catch-up boundary, got {other:?}"),
    }
    assert_eq!(plays.load(Ordering::SeqCst), 1);

    // a second resume in the same window is a no-op
    clock.set_secs(2001);
    assert!(timer.resume().is_none());
    assert_eq!(plays.load(Ordering::SeqCst), 1);

    timer.resolve("back from lunch");
    let intervals: Vec<u32> = timer.ledger().iter().map(|e| e.interval).collect();
    assert_eq!(intervals, vec![1, 2]);
}

#[test]
fn test_failed_notification_does_not_block_sound_or_banner() {
    let clock = ManualClock::at_epoch();
    let plays = Arc::new(AtomicUsize::new(0));
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let alerts = AlertDispatcher::new(
        Box::new(CountingSound(plays.clone())),
        Box::new(BrokenNotifier),
        AlertSettings::default(),
        shared.clone(),
    );
    let mut timer = IntervalTimer::new(TimerConfig::new(60, 10).unwrap(), "t", clock.now(), shared, alerts);

    clock.set_secs(60);
    let Some(Event::BoundaryReached { alert: Some(report), .. }) = timer.tick() else {
        panic!("expected boundary");
    };
    assert!(report.notification.is_failed());
    assert_eq!(report.sound, ChannelOutcome::Delivered);
    assert_eq!(report.banner, ChannelOutcome::Delivered);
    assert_eq!(timer.phase(), TimerPhase::Capturing);
    assert_eq!(plays.load(Ordering::SeqCst), 1);
}

#[test]
fn test_muted_alert_still_shows_banner() {
    let (clock, plays, mut timer) = setup();
    assert!(timer.alerts_mut().toggle_mute());
    clock.set_secs(900);
    let Some(Event::BoundaryReached { alert: Some(report), .. }) = timer.tick() else {
        panic!("expected boundary");
    };
    assert!(matches!(report.sound, ChannelOutcome::Skipped(_)));
    assert_eq!(plays.load(Ordering::SeqCst), 0);
    assert!(timer.alerts().banner().is_some());

    clock.set_secs(909);
    assert!(timer.alerts().banner().is_none());
}

#[test]
fn test_long_session_ledger_is_ordered() {
    let (clock, plays, mut timer) = setup();
    let mut t = 0;
    for n in 1..=6 {
        t += 900;
        clock.set_secs(t);
        timer.tick();
        if n % 2 == 0 {
            t += 10;
            clock.set_secs(t);
            timer.resolve(&format!("note {n}"));
        } else {
            t += 50;
            clock.set_secs(t);
            timer.tick();
        }
    }

    let snapshot = timer.ledger_snapshot();
    assert_eq!(snapshot.len(), 6);
    assert_eq!(plays.load(Ordering::SeqCst), 6);
    for (i, entry) in snapshot.iter().enumerate() {
        assert_eq!(entry.interval, i as u32 + 1);
    }
    assert!(snapshot.windows(2).all(|w| w[0].captured_at <= w[1].captured_at));
    assert_eq!(snapshot[1].content, "note 2");
    assert_eq!(snapshot[2].content, PLACEHOLDER);
}

proptest! {
    #[test]
    fn prop_remaining_never_negative_and_alerts_once_per_boundary(
        steps in prop::collection::vec(1i64..400, 1..60)
    ) {
        let (clock, plays, mut timer) = setup();
        let mut boundaries = 0;
        for step in steps {
            clock.advance_secs(step);
            if let Some(Event::BoundaryReached { .. }) = timer.tick() {
                boundaries += 1;
            }
            prop_assert!(timer.remaining() >= Duration::zero());
            prop_assert!(timer.remaining() <= Duration::seconds(900));
        }
        prop_assert_eq!(plays.load(Ordering::SeqCst), boundaries);
        let intervals: Vec<u32> = timer.ledger().iter().map(|e| e.interval).collect();
        prop_assert!(intervals.windows(2).all(|w| w[0] < w[1]));
    }
}
