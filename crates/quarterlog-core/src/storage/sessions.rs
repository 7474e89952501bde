//! Folder-per-project storage of session reports.
//!
//! Layout under the sessions root:
//!
//! ```text
//! work_sessions/
//!   my_project/
//!     session_1_2026-10-19.md
//!     session_2_2026-10-20.md
//! ```

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Persistence operations used by session setup and session end.
pub trait SessionStore {
    /// Folder names, sorted.
    fn list_folders(&self) -> Result<Vec<String>, StorageError>;

    /// Where `folder` lives; also the path handed to the publisher.
    fn folder_path(&self, folder: &str) -> PathBuf;

    /// Create `name` (after sanitizing) if missing. Returns the name used.
    fn create_folder(&self, name: &str) -> Result<String, StorageError>;

    /// Number of `.md` files in `folder`; 0 when the folder does not exist.
    fn count_session_files(&self, folder: &str) -> Result<usize, StorageError>;

    /// Write `content` to `folder/file_name`, creating the folder if needed.
    fn write_session_file(
        &self,
        folder: &str,
        file_name: &str,
        content: &str,
    ) -> Result<PathBuf, StorageError>;
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_folder_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// [`SessionStore`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsSessionStore {
    root: PathBuf,
}

impl FsSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(path: &Path) -> Result<(), StorageError> {
        std::fs::create_dir_all(path).map_err(|source| StorageError::CreateFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SessionStore for FsSessionStore {
    fn folder_path(&self, folder: &str) -> PathBuf {
        self.root.join(sanitize_folder_name(folder))
    }

    fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        Self::ensure_dir(&self.root)?;
        let list_failed = |source: std::io::Error| StorageError::ListFailed {
            path: self.root.clone(),
            source,
        };

        let mut folders = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(list_failed)? {
            let entry = entry.map_err(list_failed)?;
            if entry.file_type().map_err(list_failed)?.is_dir() {
                folders.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        folders.sort();
        Ok(folders)
    }

    fn create_folder(&self, name: &str) -> Result<String, StorageError> {
        let safe = sanitize_folder_name(name);
        Self::ensure_dir(&self.root.join(&safe))?;
        Ok(safe)
    }

    fn count_session_files(&self, folder: &str) -> Result<usize, StorageError> {
        let path = self.folder_path(folder);
        if !path.exists() {
            return Ok(0);
        }
        let read_failed = |source: std::io::Error| StorageError::ReadFailed {
            path: path.clone(),
            source,
        };

        let mut count = 0;
        for entry in std::fs::read_dir(&path).map_err(read_failed)? {
            let entry = entry.map_err(read_failed)?;
            if entry.path().extension().is_some_and(|ext| ext == "md") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn write_session_file(
        &self,
        folder: &str,
        file_name: &str,
        content: &str,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.folder_path(folder);
        Self::ensure_dir(&dir)?;
        let path = dir.join(file_name);
        std::fs::write(&path, content).map_err(|source| StorageError::WriteFailed {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize_folder_name("My Project!"), "My_Project_");
        assert_eq!(sanitize_folder_name("../etc"), "___etc");
        assert_eq!(sanitize_folder_name("ok_name-2"), "ok_name-2");
        assert_eq!(sanitize_folder_name("  padded  "), "padded");
    }

    #[test]
    fn list_folders_is_sorted_and_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path().join("work_sessions"));
        store.create_folder("zeta").unwrap();
        store.create_folder("alpha").unwrap();
        std::fs::write(store.root().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list_folders().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn create_folder_returns_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let name = store.create_folder("side project").unwrap();
        assert_eq!(name, "side_project");
        assert!(dir.path().join("side_project").is_dir());
        // idempotent
        assert_eq!(store.create_folder("side project").unwrap(), "side_project");
    }

    #[test]
    fn count_only_markdown_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        assert_eq!(store.count_session_files("missing").unwrap(), 0);

        store.write_session_file("proj", "session_1_2026-01-01.md", "# one").unwrap();
        store.write_session_file("proj", "session_2_2026-01-02.md", "# two").unwrap();
        store.write_session_file("proj", "scratch.txt", "nope").unwrap();
        assert_eq!(store.count_session_files("proj").unwrap(), 2);
    }

    #[test]
    fn write_creates_folder_and_returns_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSessionStore::new(dir.path());
        let path = store
            .write_session_file("new", "session_1_2026-01-01.md", "body")
            .unwrap();
        assert_eq!(path, dir.path().join("new").join("session_1_2026-01-01.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "body");
    }
}
