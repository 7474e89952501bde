//! Desktop alert backends for the dispatcher.
//!
//! Sound: the terminal bell by default, an external player for a configured
//! sound file, or (with the `audio` feature) in-process playback via rodio.
//! Notifications go through notify-rust.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use notify_rust::Notification;
use quarterlog_core::alert::{Notifier, SoundPlayer};
use quarterlog_core::{AlertDispatcher, AlertError, Clock, Config, NotificationPermission};
use tracing::{debug, warn};

const APP_NAME: &str = "quarterlog";

/// Build the dispatcher described by `config`.
pub fn dispatcher(config: &Config, clock: Arc<dyn Clock>) -> AlertDispatcher {
    AlertDispatcher::new(
        sound_player(config.alerts.sound_file.as_deref()),
        Box::new(DesktopNotifier::new(config.notifications.permission)),
        config.alert_settings(),
        clock,
    )
}

fn sound_player(sound_file: Option<&str>) -> Box<dyn SoundPlayer> {
    let Some(file) = sound_file.filter(|f| !f.trim().is_empty()) else {
        return Box::new(TerminalBell);
    };
    file_player(PathBuf::from(file))
}

#[cfg(feature = "audio")]
fn file_player(file: PathBuf) -> Box<dyn SoundPlayer> {
    Box::new(rodio_sound::RodioSound::spawn(file))
}

#[cfg(not(feature = "audio"))]
fn file_player(file: PathBuf) -> Box<dyn SoundPlayer> {
    Box::new(ExternalPlayer::new(file))
}

/// Rings the terminal bell on stderr. Volume is up to the terminal.
pub struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn is_ready(&self) -> bool {
        true
    }

    fn play(&mut self, _volume: f32) -> Result<(), AlertError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|()| err.flush())
            .map_err(|e| AlertError::Sound(e.to_string()))
    }
}

/// Hands the sound file to the first available command-line player.
#[cfg_attr(feature = "audio", allow(dead_code))]
pub struct ExternalPlayer {
    file: PathBuf,
}

#[cfg_attr(feature = "audio", allow(dead_code))]
impl ExternalPlayer {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }

    fn players(volume: f32) -> Vec<(&'static str, Vec<String>)> {
        // paplay volume is linear 0..=65536
        let pa_volume = ((volume.clamp(0.0, 1.0)) * 65536.0) as u32;
        vec![
            ("paplay", vec![format!("--volume={pa_volume}")]),
            ("afplay", vec!["-v".into(), format!("{volume:.2}")]),
            ("aplay", vec!["-q".into()]),
        ]
    }
}

impl SoundPlayer for ExternalPlayer {
    fn is_ready(&self) -> bool {
        self.file.exists()
    }

    fn play(&mut self, volume: f32) -> Result<(), AlertError> {
        for (cmd, args) in Self::players(volume) {
            let spawned = Command::new(cmd)
                .args(&args)
                .arg(&self.file)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            match spawned {
                Ok(child) => {
                    debug!(player = cmd, file = %self.file.display(), "playing alert sound");
                    reap(cmd, child);
                    return Ok(());
                }
                Err(e) => debug!(player = cmd, error = %e, "player unavailable"),
            }
        }
        Err(AlertError::Sound(format!(
            "no audio player found for {}",
            self.file.display()
        )))
    }
}

/// Wait for the player on a detached thread so it never lingers as a zombie.
/// The handle yields the exit status once the sound has finished.
#[cfg_attr(feature = "audio", allow(dead_code))]
fn reap(player: &'static str, mut child: Child) -> Option<JoinHandle<Option<ExitStatus>>> {
    let spawned = thread::Builder::new()
        .name("alert-player".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => {
                if status.success() {
                    debug!(player, "alert sound finished");
                } else {
                    warn!(player, %status, "alert sound player exited with an error");
                }
                Some(status)
            }
            Err(e) => {
                warn!(player, error = %e, "could not wait for alert sound player");
                None
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(player, error = %e, "could not start player watcher");
            None
        }
    }
}

#[cfg(feature = "audio")]
mod rodio_sound {
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Sender};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use quarterlog_core::alert::SoundPlayer;
    use quarterlog_core::AlertError;
    use rodio::{Decoder, OutputStream, Sink};
    use tracing::warn;

    enum AudioCommand {
        Play(f32),
    }

    /// Decodes and plays the sound file on a dedicated thread that owns the
    /// non-Send output stream. The file is read in the background; until it
    /// is loaded the player reports not ready.
    pub struct RodioSound {
        tx: Option<Sender<AudioCommand>>,
        ready: Arc<AtomicBool>,
        worker: Option<JoinHandle<()>>,
    }

    impl RodioSound {
        pub fn spawn(file: PathBuf) -> Self {
            let (tx, rx) = mpsc::channel::<AudioCommand>();
            let ready = Arc::new(AtomicBool::new(false));
            let loaded = Arc::clone(&ready);

            let worker = thread::Builder::new()
                .name("alert-audio".to_string())
                .spawn(move || {
                    let bytes = match std::fs::read(&file) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(file = %file.display(), error = %e, "could not load alert sound");
                            return;
                        }
                    };
                    loaded.store(true, Ordering::SeqCst);

                    let mut output: Option<(OutputStream, Sink)> = None;
                    while let Ok(cmd) = rx.recv() {
                        let AudioCommand::Play(volume) = cmd;
                        if output.is_none() {
                            match open_output() {
                                Ok(o) => output = Some(o),
                                Err(e) => {
                                    warn!(error = %e, "audio output unavailable");
                                    continue;
                                }
                            }
                        }
                        let Some((_, sink)) = output.as_ref() else {
                            continue;
                        };
                        match Decoder::new(Cursor::new(bytes.clone())) {
                            Ok(source) => {
                                sink.set_volume(volume.clamp(0.0, 1.0));
                                sink.append(source);
                            }
                            Err(e) => warn!(error = %e, "could not decode alert sound"),
                        }
                    }
                    // Let the last cue finish before the stream goes away.
                    if let Some((_, sink)) = output {
                        sink.sleep_until_end();
                    }
                })
                .ok();

            Self {
                tx: Some(tx),
                ready,
                worker,
            }
        }
    }

    fn open_output() -> Result<(OutputStream, Sink), String> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| format!("Failed to open audio output: {e}"))?;
        let sink = Sink::try_new(&handle).map_err(|e| format!("Failed to create audio sink: {e}"))?;
        Ok((stream, sink))
    }

    impl SoundPlayer for RodioSound {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn play(&mut self, volume: f32) -> Result<(), AlertError> {
            let tx = self
                .tx
                .as_ref()
                .ok_or_else(|| AlertError::Sound("audio thread stopped".into()))?;
            tx.send(AudioCommand::Play(volume))
                .map_err(|_| AlertError::Sound("audio thread stopped".into()))
        }
    }

    impl Drop for RodioSound {
        fn drop(&mut self) {
            self.tx.take();
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }
}

/// System notifications through notify-rust.
///
/// There is no interactive permission prompt on the desktop; asking probes
/// the notification service and answers from that.
pub struct DesktopNotifier {
    permission: NotificationPermission,
}

impl DesktopNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self { permission }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notification_service_available() -> bool {
    match notify_rust::get_server_information() {
        Ok(info) => {
            debug!(server = %info.name, "notification service found");
            true
        }
        Err(e) => {
            warn!(error = %e, "no notification service");
            false
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn notification_service_available() -> bool {
    true
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) -> NotificationPermission {
        if self.permission == NotificationPermission::Default {
            self.permission = if notification_service_available() {
                NotificationPermission::Granted
            } else {
                NotificationPermission::Denied
            };
        }
        self.permission
    }

    fn notify(&mut self, title: &str, body: &str, icon: &str) -> Result<(), AlertError> {
        Notification::new()
            .summary(title)
            .body(body)
            .appname(APP_NAME)
            .icon(icon)
            .show()
            .map(|_| ())
            .map_err(|e| AlertError::Notification(e.to_string()))
    }
}

/// Whether the configured sound file exists, for `alert test` diagnostics.
pub fn sound_file_status(config: &Config) -> Option<(String, bool)> {
    let file = config.alerts.sound_file.as_deref()?;
    Some((file.to_string(), Path::new(file).exists()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn finished_players_are_waited_on() {
        let child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        let handle = reap("sh", child).expect("watcher thread");
        let status = handle.join().unwrap().expect("exit status collected");
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn missing_sound_file_is_not_ready() {
        let player = ExternalPlayer::new(PathBuf::from("/nonexistent/quarterlog/ding.wav"));
        assert!(!player.is_ready());
    }
}
