use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Subcommand;
use quarterlog_core::alert::Notifier;
use quarterlog_core::{Clock, Config, NotificationPermission, SystemClock};

use crate::alerts::{self, DesktopNotifier};

#[derive(Subcommand)]
pub enum AlertAction {
    /// Fire a test alert through every channel
    Test {
        /// Print the per-channel report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the notification permission
    Permission,
    /// Ask for notification permission and remember the answer
    Request,
    /// Stop sending system notifications
    Revoke,
}

pub fn run(action: AlertAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;

    match action {
        AlertAction::Test { json } => {
            let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
            let mut dispatcher = alerts::dispatcher(&config, clock);
            if let Some((file, exists)) = alerts::sound_file_status(&config) {
                if !exists {
                    eprintln!("warning: sound file {file} not found");
                }
            }
            // Background-loaded sounds get a moment before the test fires.
            let start = Instant::now();
            while !dispatcher.sound_ready() && start.elapsed() < Duration::from_secs(2) {
                std::thread::sleep(Duration::from_millis(50));
            }

            let report = dispatcher.fire_test();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("sound:        {:?}", report.sound);
                println!("notification: {:?}", report.notification);
                println!("banner:       {:?}", report.banner);
            }
        }
        AlertAction::Permission => {
            println!("{}", permission_label(config.notifications.permission));
        }
        AlertAction::Request => {
            // An explicit request re-asks even after a denial.
            let mut notifier = DesktopNotifier::new(NotificationPermission::Default);
            let answer = notifier.request_permission();
            config.notifications.permission = answer;
            config.save()?;
            println!("{}", permission_label(answer));
        }
        AlertAction::Revoke => {
            config.notifications.permission = NotificationPermission::Denied;
            config.save()?;
            println!("{}", permission_label(NotificationPermission::Denied));
        }
    }
    Ok(())
}

pub fn permission_label(permission: NotificationPermission) -> &'static str {
    match permission {
        NotificationPermission::Default => "default",
        NotificationPermission::Granted => "granted",
        NotificationPermission::Denied => "denied",
    }
}
