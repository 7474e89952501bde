//! Interactive work session: setup prompts, the timer loop, and the
//! save-then-publish flow at the end.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Local;
use clap::Args;
use quarterlog_core::session::{format_clock, format_elapsed, CloseStage, SaveOutcome};
use quarterlog_core::{
    AlertDispatcher, AlertReport, Clock, Config, Event, FsSessionStore, GitPublisher,
    IntervalTimer, NotificationPermission, PublishOutcome, Publisher, SessionCloser, SessionInfo,
    SessionReport, SessionStore, SystemClock, TickLoop, TimerPhase, Trigger, PLACEHOLDER,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use crate::alerts;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const HELP: &str = "Commands: :status  :test  :mute  :vol <0-100>  :dismiss  :end";

#[derive(Args)]
pub struct StartArgs {
    /// What you are working on
    #[arg(long)]
    pub title: Option<String>,
    /// Project folder (created if missing)
    #[arg(long)]
    pub folder: Option<String>,
    /// Optional session description
    #[arg(long)]
    pub description: Option<String>,
    /// Save the report without committing or pushing
    #[arg(long)]
    pub no_publish: bool,
    /// Stream events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: StartArgs) -> CliResult<()> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session(args, config));
    // A pending stdin read would otherwise hold shutdown until the next line.
    runtime.shutdown_background();
    result
}

async fn session(args: StartArgs, mut config: Config) -> CliResult<()> {
    let timer_config = config.timer_config()?;
    let store = super::folders::store(&config);
    let out = Output { json: args.json };
    let mut input = Input::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let info = setup(&args, &store, &mut input, clock.as_ref()).await?;

    let mut dispatcher = alerts::dispatcher(&config, clock.clone());
    if config.notifications.enabled && dispatcher.permission() == NotificationPermission::Default {
        config.notifications.permission = dispatcher.request_permission();
        if let Err(e) = config.save() {
            warn!(error = %e, "could not remember notification permission");
        }
    }

    let mut timer = IntervalTimer::new(
        timer_config,
        &info.task_title,
        info.started_at,
        clock.clone(),
        dispatcher,
    );
    let mut ticks = TickLoop::new(clock.clone(), StdDuration::from_millis(config.timer.tick_millis));
    out.started(&info, &timer);

    let mut confirm_end = false;
    loop {
        let deadline = timer.next_deadline();
        tokio::select! {
            trigger = ticks.next(Some(deadline)) => {
                let event = match trigger {
                    Trigger::Tick => timer.tick(),
                    Trigger::Resume { gap_ms } => {
                        info!(gap_ms, "resumed after a pause in wall-clock time");
                        timer.resume()
                    }
                };
                if let Some(event) = event {
                    out.event(&event, &timer);
                }
            }
            line = input.line() => {
                let Some(line) = line? else {
                    break;
                };
                if let Flow::End = handle_line(&line, &mut timer, &out, &mut confirm_end) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                out.note("Interrupted, ending session.");
                break;
            }
        }
    }

    out.event(&timer.end_event(), &timer);
    let report = SessionReport {
        ended_at: clock.now(),
        elapsed: timer.elapsed(),
        entries: timer.ledger_snapshot(),
        info,
    };
    drop(timer);
    if !out.json {
        println!("\n{}", report.render());
    }

    let publisher = if config.publish.enabled && !args.no_publish {
        Some(GitPublisher::new(std::env::current_dir()?, config.publish.push))
    } else {
        None
    };
    let closer = SessionCloser::new(&store, publisher.as_ref().map(|p| p as &dyn Publisher));

    loop {
        match closer.save_and_publish(&report, |stage| out.stage(stage)) {
            Ok(outcome) => {
                out.saved(&outcome);
                return Ok(());
            }
            Err(e) if !e.is_retryable() => return Err(e.into()),
            Err(e) => {
                eprintln!("error: {e}");
                let answer = tokio::select! {
                    answer = input.ask("[r]etry or [d]iscard? ") => answer.unwrap_or_default(),
                    _ = tokio::signal::ctrl_c() => String::new(),
                };
                if !matches!(answer.to_ascii_lowercase().as_str(), "r" | "retry") {
                    eprintln!("Discarded. Nothing further will be saved or published.");
                    return Ok(());
                }
            }
        }
    }
}

/// Collect title, folder and description from flags or prompts.
async fn setup(
    args: &StartArgs,
    store: &FsSessionStore,
    input: &mut Input,
    clock: &dyn Clock,
) -> CliResult<SessionInfo> {
    let title = match args.title.as_deref() {
        Some(title) => title.to_string(),
        None => loop {
            let title = input.ask("Task title: ").await?;
            if !title.is_empty() {
                break title;
            }
            eprintln!("A task title is required.");
        },
    };

    let folder = match args.folder.as_deref() {
        Some(folder) => store.create_folder(folder)?,
        None => pick_folder(store, input).await?,
    };

    let description = match args.description.as_deref() {
        Some(description) => description.to_string(),
        None => input.ask("Description (optional): ").await?,
    };

    Ok(SessionInfo::prepare(store, &folder, &title, &description, clock.now())?)
}

async fn pick_folder(store: &FsSessionStore, input: &mut Input) -> CliResult<String> {
    let folders = store.list_folders()?;
    if !folders.is_empty() {
        eprintln!("Folders:");
        for (i, name) in folders.iter().enumerate() {
            eprintln!("  {}. {name}", i + 1);
        }
    }

    loop {
        let answer = input.ask("Folder (number, or a new name): ").await?;
        if answer.is_empty() {
            continue;
        }
        if let Ok(n) = answer.parse::<usize>() {
            if let Some(name) = n.checked_sub(1).and_then(|i| folders.get(i)) {
                return Ok(name.clone());
            }
            eprintln!("No folder #{n}.");
            continue;
        }
        return Ok(store.create_folder(&answer)?);
    }
}

enum Flow {
    Continue,
    End,
}

#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    End,
    Test,
    Mute,
    /// `None` when the argument is not a volume.
    Volume(Option<u8>),
    Dismiss,
    Status,
    Help,
}

impl SessionCommand {
    fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(':')?;
        let mut parts = rest.split_whitespace();
        let command = match parts.next()? {
            "end" => Self::End,
            "test" => Self::Test,
            "mute" => Self::Mute,
            "vol" | "volume" => Self::Volume(
                parts
                    .next()
                    .and_then(|v| v.parse::<u8>().ok())
                    .filter(|v| *v <= 100),
            ),
            "dismiss" => Self::Dismiss,
            "status" => Self::Status,
            "help" => Self::Help,
            _ => return None,
        };
        Some(command)
    }
}

fn handle_line(
    line: &str,
    timer: &mut IntervalTimer<AlertDispatcher>,
    out: &Output,
    confirm_end: &mut bool,
) -> Flow {
    let text = line.trim();
    if std::mem::take(confirm_end) {
        if text.eq_ignore_ascii_case("y") || text.eq_ignore_ascii_case("yes") {
            return Flow::End;
        }
        out.note("Session continues.");
        return Flow::Continue;
    }

    let Some(command) = SessionCommand::parse(text) else {
        if timer.phase() == TimerPhase::Capturing {
            if let Some(event) = timer.resolve(text) {
                out.event(&event, timer);
            }
        } else if !text.is_empty() {
            out.note(&format!("Not capturing right now. {HELP}"));
        }
        return Flow::Continue;
    };

    match command {
        SessionCommand::End => {
            *confirm_end = true;
            prompt("End the session? [y/N] ");
        }
        SessionCommand::Test => {
            let report = timer.alerts_mut().fire_test();
            out.alert_test(&report);
        }
        SessionCommand::Mute => {
            let muted = timer.alerts_mut().toggle_mute();
            out.note(if muted { "Muted." } else { "Unmuted." });
        }
        SessionCommand::Volume(Some(volume)) => {
            timer.alerts_mut().set_volume(volume);
            out.note(&format!("Volume {volume}."));
        }
        SessionCommand::Volume(None) => out.note("Usage: :vol <0-100>"),
        SessionCommand::Dismiss => {
            let dismissed = timer.alerts_mut().dismiss_banner();
            out.note(if dismissed { "Banner dismissed." } else { "No banner showing." });
        }
        SessionCommand::Status => out.event(&timer.snapshot(), timer),
        SessionCommand::Help => out.note(HELP),
    }
    Flow::Continue
}

fn prompt(text: &str) {
    eprint!("{text}");
    let _ = std::io::stderr().flush();
}

/// Line-oriented stdin.
struct Input {
    lines: Lines<BufReader<Stdin>>,
}

impl Input {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }

    async fn ask(&mut self, question: &str) -> CliResult<String> {
        prompt(question);
        match self.line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err("input closed before the session started".into()),
        }
    }
}

/// Renders events as text, or as JSON lines on stdout with `--json`.
/// Side notes go to stderr in JSON mode so stdout stays machine-readable.
struct Output {
    json: bool,
}

impl Output {
    fn json_line(&self, value: &impl Serialize) {
        match serde_json::to_string(value) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "could not serialize output"),
        }
    }

    fn note(&self, text: &str) {
        if self.json {
            eprintln!("{text}");
        } else {
            println!("{text}");
        }
    }

    fn started(&self, info: &SessionInfo, timer: &IntervalTimer<AlertDispatcher>) {
        if self.json {
            self.json_line(&serde_json::json!({
                "type": "session_started",
                "session": info,
                "interval_secs": timer.config().interval_secs(),
                "end_at": timer.end_at(),
            }));
            return;
        }
        println!(
            "Work Session #{} - {} ({})",
            info.number, info.task_title, info.folder
        );
        println!(
            "Interval 1 running until {}. {HELP}",
            timer.end_at().with_timezone(&Local).format("%-I:%M:%S %p")
        );
    }

    fn event(&self, event: &Event, timer: &IntervalTimer<AlertDispatcher>) {
        if self.json {
            self.json_line(event);
            return;
        }
        match event {
            Event::BoundaryReached {
                interval,
                missed_intervals,
                backlog_entry,
                alert,
                ..
            } => {
                if let Some(entry) = backlog_entry {
                    println!(
                        "Missed {missed_intervals} interval(s) while away; interval {} saved as {}.",
                        entry.interval, entry.content
                    );
                }
                if let Some(banner) = timer.alerts().banner() {
                    println!("\n*** {} ***\n{}", banner.title, banner.body);
                }
                if alert.as_ref().is_some_and(|r| r.failures() > 0) {
                    eprintln!("Some alert channels failed; set QUARTERLOG_LOG=warn for details.");
                }
                println!(
                    "Interval {interval}: what did you do? {} left, an empty line saves {PLACEHOLDER}",
                    format_clock(ceil_secs(timer.remaining().num_milliseconds()))
                );
            }
            Event::CaptureResolved {
                entry,
                next_interval,
                end_at,
                ..
            } => {
                let how = if entry.auto_saved { "auto-saved" } else { "saved" };
                println!(
                    "Interval {} {how} at {}: {}",
                    entry.interval,
                    entry.display_time(),
                    entry.content
                );
                println!(
                    "Interval {next_interval} running until {}.",
                    end_at.with_timezone(&Local).format("%-I:%M:%S %p")
                );
            }
            Event::StateSnapshot {
                phase,
                interval,
                remaining_ms,
                elapsed_secs,
                logs_saved,
                ..
            } => {
                let phase = match phase {
                    TimerPhase::Running => "running",
                    TimerPhase::Capturing => "capturing",
                };
                println!(
                    "Interval {interval} | {phase} | {} left | elapsed {} | {logs_saved} log(s) saved",
                    format_clock(ceil_secs(*remaining_ms)),
                    format_elapsed(*elapsed_secs)
                );
                let volume = timer.alerts().settings();
                println!(
                    "Volume {}{}",
                    volume.volume,
                    if volume.muted { " (muted)" } else { "" }
                );
                if let Some(banner) = timer.alerts().banner() {
                    println!("Banner: {}", banner.title);
                }
            }
            Event::SessionEnded {
                logs_saved,
                elapsed_secs,
                ..
            } => {
                println!(
                    "Session ended after {} with {logs_saved} log(s).",
                    format_elapsed(*elapsed_secs)
                );
            }
        }
    }

    fn alert_test(&self, report: &AlertReport) {
        if self.json {
            self.json_line(&serde_json::json!({ "type": "alert_test", "report": report }));
        } else {
            println!(
                "Test alert: sound {:?}, notification {:?}, banner {:?}",
                report.sound, report.notification, report.banner
            );
        }
    }

    fn stage(&self, stage: CloseStage) {
        if self.json {
            let name = match stage {
                CloseStage::Saving => "saving",
                CloseStage::Publishing => "publishing",
            };
            self.json_line(&serde_json::json!({ "type": "close_stage", "stage": name }));
        } else {
            eprintln!("{}", stage.message());
        }
    }

    fn saved(&self, outcome: &SaveOutcome) {
        if self.json {
            self.json_line(&serde_json::json!({ "type": "session_saved", "outcome": outcome }));
            return;
        }
        println!("Saved {}", outcome.path.display());
        let published = match outcome.publish {
            Some(PublishOutcome::Pushed) => "Committed and pushed.",
            Some(PublishOutcome::Committed) => "Committed (push disabled).",
            Some(PublishOutcome::NothingToCommit) => "Nothing new to commit.",
            None => "Publishing skipped.",
        };
        println!("{published}");
    }
}

fn ceil_secs(ms: i64) -> i64 {
    (ms.max(0) + 999) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_commands() {
        assert_eq!(SessionCommand::parse(":end"), Some(SessionCommand::End));
        assert_eq!(SessionCommand::parse(":vol 40"), Some(SessionCommand::Volume(Some(40))));
        assert_eq!(SessionCommand::parse(":vol 101"), Some(SessionCommand::Volume(None)));
        assert_eq!(SessionCommand::parse(":vol"), Some(SessionCommand::Volume(None)));
        assert_eq!(SessionCommand::parse(":status"), Some(SessionCommand::Status));
    }

    #[test]
    fn plain_text_and_unknown_commands_are_content() {
        assert_eq!(SessionCommand::parse("fixed the lexer"), None);
        assert_eq!(SessionCommand::parse(":shrug"), None);
        assert_eq!(SessionCommand::parse(""), None);
    }

    #[test]
    fn remaining_rounds_up_to_whole_seconds() {
        assert_eq!(ceil_secs(0), 0);
        assert_eq!(ceil_secs(1), 1);
        assert_eq!(ceil_secs(5_000), 5);
        assert_eq!(ceil_secs(-20), 0);
    }
}
