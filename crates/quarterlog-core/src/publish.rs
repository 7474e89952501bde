//! Publishing saved session reports through git.
//!
//! Stage the project folder, commit with a generated message, push. A commit
//! with nothing staged counts as success.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PublishError, ValidationError};

/// What to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Folder to stage, as a path git understands (relative to the repo or absolute).
    pub folder_path: PathBuf,
    pub session_number: u32,
    pub task_title: String,
    pub date: NaiveDate,
}

impl PublishRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.folder_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingField("folder"));
        }
        if self.session_number == 0 {
            return Err(ValidationError::MissingField("session_number"));
        }
        if self.task_title.trim().is_empty() {
            return Err(ValidationError::MissingField("task_title"));
        }
        Ok(())
    }

    pub fn commit_message(&self) -> String {
        format!(
            "Work Session #{} - {} - {}",
            self.session_number,
            self.task_title.trim(),
            self.date.format("%Y-%m-%d")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    Pushed,
    /// Committed locally; pushing is disabled.
    Committed,
    NothingToCommit,
}

/// The version-control side of session end.
pub trait Publisher {
    fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishError>;
}

/// Publishes with the `git` executable inside `repo_dir`.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    push: bool,
}

impl GitPublisher {
    pub fn new(repo_dir: impl Into<PathBuf>, push: bool) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            push,
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn git(&self, args: &[&str]) -> Result<Output, PublishError> {
        debug!(?args, dir = %self.repo_dir.display(), "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            // Output is matched against English messages.
            .env("LC_ALL", "C")
            .output()
            .map_err(PublishError::GitUnavailable)
    }
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr.trim());
    }
    text
}

fn is_nothing_to_commit(text: &str) -> bool {
    text.contains("nothing to commit")
        || text.contains("nothing added to commit")
        || text.contains("no changes added to commit")
}

impl Publisher for GitPublisher {
    fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishError> {
        let folder = request.folder_path.to_string_lossy().into_owned();

        let add = self.git(&["add", "--", folder.as_str()])?;
        if !add.status.success() {
            return Err(PublishError::StageFailed(combined_output(&add)));
        }

        let message = request.commit_message();
        let commit = self.git(&["commit", "-m", message.as_str()])?;
        if !commit.status.success() {
            let text = combined_output(&commit);
            if is_nothing_to_commit(&text) {
                info!(folder = %folder, "nothing to commit");
                return Ok(PublishOutcome::NothingToCommit);
            }
            return Err(PublishError::CommitFailed(text));
        }

        if !self.push {
            info!(%message, "committed (push disabled)");
            return Ok(PublishOutcome::Committed);
        }

        let push = self.git(&["push"])?;
        if !push.status.success() {
            return Err(PublishError::PushFailed(combined_output(&push)));
        }
        info!(%message, "pushed");
        Ok(PublishOutcome::Pushed)
    }
}
