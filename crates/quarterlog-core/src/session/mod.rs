//! Session setup and the save-then-publish sequence at session end.
//!
//! A session is pinned to one folder and one task title. Its number is the
//! count of reports already in the folder plus one. At the end the report is
//! written first and only then published; a failure at either step leaves
//! the caller free to run the whole sequence again.

mod report;

pub use report::{format_clock, format_duration, format_elapsed, SessionReport};

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, ValidationError};
use crate::publish::{PublishOutcome, PublishRequest, Publisher};
use crate::storage::SessionStore;

/// Description used when the user leaves it blank.
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// Identity of a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub task_title: String,
    pub folder: String,
    pub description: String,
    pub number: u32,
    pub started_at: DateTime<Utc>,
}

impl SessionInfo {
    /// Validate the user's choices and number the session from `store`.
    pub fn prepare(
        store: &dyn SessionStore,
        folder: &str,
        task_title: &str,
        description: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let folder = folder.trim();
        if folder.is_empty() {
            return Err(ValidationError::MissingField("folder").into());
        }
        let task_title = task_title.trim();
        if task_title.is_empty() {
            return Err(ValidationError::MissingField("task_title").into());
        }
        let description = match description.trim() {
            "" => DEFAULT_DESCRIPTION,
            d => d,
        };

        let existing = store.count_session_files(folder)?;
        let number = u32::try_from(existing)
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "folder".into(),
                message: format!("too many sessions ({existing})"),
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            task_title: task_title.to_string(),
            folder: folder.to_string(),
            description: description.to_string(),
            number,
            started_at,
        })
    }
}

/// Progress reported while closing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStage {
    Saving,
    Publishing,
}

impl CloseStage {
    pub fn message(self) -> &'static str {
        match self {
            CloseStage::Saving => "Saving session file...",
            CloseStage::Publishing => "Publishing to the remote...",
        }
    }
}

/// Result of a successful close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub path: PathBuf,
    /// `None` when publishing is disabled.
    pub publish: Option<PublishOutcome>,
}

/// Writes the report, then publishes it.
pub struct SessionCloser<'a> {
    store: &'a dyn SessionStore,
    publisher: Option<&'a dyn Publisher>,
}

impl<'a> SessionCloser<'a> {
    pub fn new(store: &'a dyn SessionStore, publisher: Option<&'a dyn Publisher>) -> Self {
        Self { store, publisher }
    }

    /// Save then publish. Nothing is published unless the save succeeded.
    /// Calling again after an error retries the full sequence; rewriting the
    /// same file is harmless.
    pub fn save_and_publish(
        &self,
        report: &SessionReport,
        mut on_stage: impl FnMut(CloseStage),
    ) -> Result<SaveOutcome, CoreError> {
        let file_name = report.file_name();
        let content = report.render();
        validate_save(&report.info, &file_name, &content)?;

        on_stage(CloseStage::Saving);
        let path = self
            .store
            .write_session_file(&report.info.folder, &file_name, &content)
            .inspect_err(|e| warn!(error = %e, "saving session file failed"))?;
        info!(path = %path.display(), number = report.info.number, "session saved");

        let Some(publisher) = self.publisher else {
            return Ok(SaveOutcome { path, publish: None });
        };

        let request = PublishRequest {
            folder_path: self.store.folder_path(&report.info.folder),
            session_number: report.info.number,
            task_title: report.info.task_title.clone(),
            date: report.info.started_at.date_naive(),
        };
        request.validate()?;

        on_stage(CloseStage::Publishing);
        let outcome = publisher
            .publish(&request)
            .inspect_err(|e| warn!(error = %e, "publishing session failed"))?;
        Ok(SaveOutcome {
            path,
            publish: Some(outcome),
        })
    }
}

fn validate_save(info: &SessionInfo, file_name: &str, content: &str) -> Result<(), ValidationError> {
    if info.folder.trim().is_empty() {
        return Err(ValidationError::MissingField("folder"));
    }
    if info.task_title.trim().is_empty() {
        return Err(ValidationError::MissingField("task_title"));
    }
    if file_name.contains('/') || file_name.contains('\\') {
        return Err(ValidationError::InvalidValue {
            field: "file_name".into(),
            message: format!("'{file_name}' must not contain a path separator"),
        });
    }
    if content.is_empty() {
        return Err(ValidationError::MissingField("content"));
    }
    Ok(())
}
