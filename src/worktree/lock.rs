//! Cross-process exclusion for mutating operations
//!
//! The lock file lives in the system temp directory and is named after the
//! repository's git common directory, so every worktree of one repository
//! contends on the same file. Acquisition never blocks.

use super::error::{Result, WorktreeError};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive repository lock, released on drop
#[derive(Debug)]
pub struct RepoLock {
    file: File,
    path: PathBuf,
}

impl RepoLock {
    /// Try to take the lock for the repository whose common dir is given.
    pub fn acquire(common_dir: &Path) -> Result<Self> {
        let path = Self::lock_path(common_dir);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| WorktreeError::io(format!("failed to open {}", path.display()), e))?;

        file.try_lock_exclusive()
            .map_err(|_| WorktreeError::Locked { path: path.clone() })?;
        log::debug!("acquired repository lock {}", path.display());
        Ok(Self { file, path })
    }

    /// Lock file path for a repository
    pub fn lock_path(common_dir: &Path) -> PathBuf {
        let canonical = common_dir
            .canonicalize()
            .unwrap_or_else(|_| common_dir.to_path_buf());
        let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
        std::env::temp_dir().join(format!("wtr-{}.lock", &hex::encode(digest)[..16]))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("failed to release {}: {}", self.path.display(), e);
        }
    }
}
