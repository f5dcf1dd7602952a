use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup";

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to create backup {path}: {source}")]
    BackupFailed { path: PathBuf, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    WriteDenied { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub path: PathBuf,
    pub changed: bool,
    /// True only on the run that created the backup
    pub backup_created: bool,
    pub backup_path: PathBuf,
}

/// Backup-on-write file patcher.
///
/// The first time a file is patched a sibling `<file><suffix>` copy of its
/// current content is written. Later patches never touch that backup, so it
/// always holds the content from before the first patch.
#[derive(Debug, Clone)]
pub struct FilePatcher {
    suffix: String,
}

impl Default for FilePatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_SUFFIX)
    }
}

impl FilePatcher {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name: OsString = path.as_os_str().to_owned();
        name.push(&self.suffix);
        PathBuf::from(name)
    }

    /// Copies `path` to its backup location unless a backup already exists.
    /// Returns whether a backup was created.
    pub fn ensure_backup(&self, path: &Path) -> Result<bool, PatchError> {
        if !path.is_file() {
            return Err(PatchError::NotFound(path.to_path_buf()));
        }

        let backup = self.backup_path(path);
        if backup.exists() {
            debug!(backup = %backup.display(), "Backup already present");
            return Ok(false);
        }

        fs::copy(path, &backup).map_err(|source| PatchError::BackupFailed {
            path: backup.clone(),
            source,
        })?;
        info!(backup = %backup.display(), "Created backup");
        Ok(true)
    }

    /// Reads `path`, backs it up once, applies `transform` and writes the
    /// result back only if it differs from what was read.
    pub fn patch<F>(&self, path: &Path, transform: F) -> Result<PatchOutcome, PatchError>
    where
        F: FnOnce(&str) -> String,
    {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                PatchError::NotFound(path.to_path_buf())
            } else {
                PatchError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let backup_path = self.backup_path(path);
        let backup_created = if backup_path.exists() {
            false
        } else {
            fs::write(&backup_path, &content).map_err(|source| PatchError::BackupFailed {
                path: backup_path.clone(),
                source,
            })?;
            info!(backup = %backup_path.display(), "Created backup");
            true
        };

        let patched = transform(&content);
        let changed = patched != content;

        if changed {
            fs::write(path, patched).map_err(|source| PatchError::WriteDenied {
                path: path.to_path_buf(),
                source,
            })?;
            debug!(file = %path.display(), "Patched file");
        } else {
            debug!(file = %path.display(), "No change, skipping write");
        }

        Ok(PatchOutcome {
            path: path.to_path_buf(),
            changed,
            backup_created,
            backup_path,
        })
    }
}
