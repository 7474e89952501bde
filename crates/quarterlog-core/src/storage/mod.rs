mod config;
pub mod sessions;

pub use config::{AlertsConfig, Config, NotificationsConfig, PublishConfig, StorageConfig, TimerSection};
pub use sessions::{sanitize_folder_name, FsSessionStore, SessionStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/quarterlog[-dev]/` based on QUARTERLOG_ENV.
///
/// Set QUARTERLOG_ENV=dev to use the development data directory, or
/// QUARTERLOG_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("QUARTERLOG_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("QUARTERLOG_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("quarterlog-dev")
            } else {
                base_dir.join("quarterlog")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DirUnavailable {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
