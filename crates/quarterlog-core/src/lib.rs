//! # Quarterlog Core Library
//!
//! Core logic for Quarterlog, a work-session logger that interrupts you every
//! fifteen minutes and asks what you did. The CLI binary is a thin layer over
//! this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: An absolute-deadline state machine alternating between
//!   a running interval and a short capture window. The caller drives it with
//!   `tick()`; time comes from an injected [`Clock`].
//! - **Alerts**: Sound, system notification and in-app banner, each
//!   best-effort and fired at most once per boundary.
//! - **Ledger**: Ordered, append-only record of captured logs.
//! - **Storage**: Folder-per-project markdown reports and TOML configuration.
//! - **Publish**: Stages, commits and pushes reports with git.
//!
//! ## Key Components
//!
//! - [`IntervalTimer`]: Core timer state machine
//! - [`AlertDispatcher`]: Alert fan-out
//! - [`LogLedger`]: Captured entries
//! - [`SessionCloser`]: Save-then-publish at session end
//! - [`Config`]: Application configuration management

pub mod alert;
pub mod error;
pub mod events;
pub mod ledger;
pub mod publish;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod timer;

pub use alert::{AlertContext, AlertDispatcher, AlertReport, AlertSettings, AlertSink, NotificationPermission};
pub use error::{AlertError, ConfigError, CoreError, PublishError, StorageError, ValidationError};
pub use events::Event;
pub use ledger::{LedgerSnapshot, LogEntry, LogLedger, PLACEHOLDER};
pub use publish::{GitPublisher, PublishOutcome, PublishRequest, Publisher};
pub use scheduler::{TickLoop, Trigger};
pub use session::{SaveOutcome, SessionCloser, SessionInfo, SessionReport};
pub use storage::{Config, FsSessionStore, SessionStore};
pub use timer::{Clock, IntervalTimer, ManualClock, SystemClock, TimerConfig, TimerPhase};
