//! One-time conversion of a conventional checkout into the container layout
//!
//! `/work/myproject` (main checkout of `main`) becomes
//! `/work/myproject/main`, so the directory the user cloned into is the
//! container for sibling worktrees. The checkout is renamed to a hidden
//! sibling, an empty container takes its name, and the checkout moves inside.
//! Across filesystems each move is copy, verify, then delete: the original is
//! only removed once the copy matches it.

use super::error::{Result, WorktreeError};
use super::layout::{Layout, classify};
use ignore::{DirEntry, WalkBuilder};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Move the main checkout at `repo_root` to `<repo_root>/<main_branch>`.
///
/// Fails without touching the filesystem unless `repo_root` classifies as
/// [`Layout::NeedsRestructure`]. Returns the new checkout path; changing the
/// working directory is left to the caller.
pub fn restructure(repo_root: &Path, main_branch: &str) -> Result<PathBuf> {
    let new_main = match classify(repo_root, main_branch) {
        Layout::NeedsRestructure { expected_main } => expected_main,
        Layout::Valid => {
            return Err(WorktreeError::InvalidLayout {
                path: repo_root.to_path_buf(),
                reason: "already in worktree layout; nothing to restructure".to_string(),
            });
        }
        Layout::Invalid { reason } => {
            return Err(WorktreeError::InvalidLayout {
                path: repo_root.to_path_buf(),
                reason,
            });
        }
    };

    let aside = staging_path(repo_root)?;
    if fs::symlink_metadata(&aside).is_ok() {
        return Err(WorktreeError::TargetExists { path: aside });
    }

    log::info!(
        "restructuring {} -> {}",
        repo_root.display(),
        new_main.display()
    );
    move_dir(repo_root, &aside)?;

    if let Err(e) = fs::create_dir(repo_root) {
        put_back(&aside, repo_root);
        return Err(WorktreeError::io(
            format!("failed to create container {}", repo_root.display()),
            e,
        ));
    }

    if let Err(e) = move_dir(&aside, &new_main) {
        if let Err(cleanup) = fs::remove_dir(repo_root) {
            log::warn!("could not remove {}: {}", repo_root.display(), cleanup);
        }
        put_back(&aside, repo_root);
        return Err(e);
    }

    Ok(new_main)
}

/// Rename, or copy across devices
fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            log::debug!("rename crosses devices, falling back to copy: {}", e);
            move_across_devices(src, dst)
        }
        Err(e) => Err(WorktreeError::io(
            format!("failed to move {} to {}", src.display(), dst.display()),
            e,
        )),
    }
}

/// Undo the first step of a failed restructure
fn put_back(aside: &Path, repo_root: &Path) {
    if let Err(e) = move_dir(aside, repo_root) {
        log::error!(
            "checkout left at {} (could not restore {}): {}",
            aside.display(),
            repo_root.display(),
            e
        );
    }
}

/// Copy `src` next to `dst`, verify the copy, rename it into place, then
/// delete `src`.
///
/// Any failure before the final delete leaves `src` untouched and removes the
/// partial copy.
pub(crate) fn move_across_devices(src: &Path, dst: &Path) -> Result<()> {
    move_via_copy(src, dst, copy_tree)
}

fn move_via_copy<F>(src: &Path, dst: &Path, copy: F) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> Result<()>,
{
    let staging = staging_path(dst)?;
    if fs::symlink_metadata(&staging).is_ok() {
        return Err(WorktreeError::TargetExists { path: staging });
    }

    let staged = copy(src, &staging)
        .and_then(|()| verify_copy(src, &staging))
        .and_then(|()| {
            fs::rename(&staging, dst).map_err(|e| {
                WorktreeError::io(format!("failed to move copy into {}", dst.display()), e)
            })
        });
    if let Err(e) = staged {
        if let Err(cleanup) = fs::remove_dir_all(&staging)
            && cleanup.kind() != ErrorKind::NotFound
        {
            log::warn!(
                "could not remove partial copy {}: {}",
                staging.display(),
                cleanup
            );
        }
        return Err(e);
    }

    fs::remove_dir_all(src).map_err(|e| {
        WorktreeError::io(
            format!(
                "copied checkout to {} but failed to remove the original {}",
                dst.display(),
                src.display()
            ),
            e,
        )
    })
}

fn staging_path(dst: &Path) -> Result<PathBuf> {
    match (dst.parent(), dst.file_name()) {
        (Some(parent), Some(name)) => Ok(parent.join(format!(
            ".{}.wtr-staging",
            name.to_string_lossy()
        ))),
        _ => Err(WorktreeError::InvalidLayout {
            path: dst.to_path_buf(),
            reason: "target has no parent directory".to_string(),
        }),
    }
}

fn walk(root: &Path) -> impl Iterator<Item = std::result::Result<DirEntry, ignore::Error>> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
}

fn walk_error(e: ignore::Error) -> WorktreeError {
    match e.into_io_error() {
        Some(io) => WorktreeError::io("failed to walk checkout", io),
        None => WorktreeError::CopyVerificationFailed {
            reason: "directory walk failed".to_string(),
        },
    }
}

fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in walk(src) {
        let entry = entry.map_err(walk_error)?;
        let target = dst.join(relative(src, entry.path()));
        let file_type = entry
            .file_type()
            .ok_or_else(|| WorktreeError::CopyVerificationFailed {
                reason: format!("cannot determine type of {}", entry.path().display()),
            })?;

        let copied = if file_type.is_dir() {
            fs::create_dir_all(&target)
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };
        copied.map_err(|e| {
            WorktreeError::io(format!("failed to copy {}", entry.path().display()), e)
        })?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

/// Number of non-directory entries and total byte size under a root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeStats {
    pub files: u64,
    pub bytes: u64,
}

pub(crate) fn tree_stats(root: &Path) -> Result<TreeStats> {
    let mut stats = TreeStats { files: 0, bytes: 0 };
    for entry in walk(root) {
        let entry = entry.map_err(walk_error)?;
        let path = entry.path();
        let meta = fs::symlink_metadata(path)
            .map_err(|e| WorktreeError::io(format!("failed to stat {}", path.display()), e))?;
        if meta.is_dir() {
            continue;
        }
        stats.files += 1;
        stats.bytes += meta.len();
    }
    Ok(stats)
}

/// SHA-256 over relative paths and contents, in sorted walk order.
pub(crate) fn tree_digest(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for entry in walk(root) {
        let entry = entry.map_err(walk_error)?;
        let path = entry.path();
        let meta = fs::symlink_metadata(path)
            .map_err(|e| WorktreeError::io(format!("failed to stat {}", path.display()), e))?;
        if meta.is_dir() {
            continue;
        }
        hasher.update(relative(root, path).to_string_lossy().as_bytes());
        hasher.update([0u8]);
        let content = if meta.file_type().is_symlink() {
            fs::read_link(path).map(|t| t.to_string_lossy().into_owned().into_bytes())
        } else {
            fs::read(path)
        };
        let content = content
            .map_err(|e| WorktreeError::io(format!("failed to read {}", path.display()), e))?;
        hasher.update(&content);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn verify_copy(src: &Path, copy: &Path) -> Result<()> {
    let (expected, actual) = (tree_stats(src)?, tree_stats(copy)?);
    if expected != actual {
        return Err(WorktreeError::CopyVerificationFailed {
            reason: format!(
                "source has {} files / {} bytes, copy has {} files / {} bytes",
                expected.files, expected.bytes, actual.files, actual.bytes
            ),
        });
    }

    let (src_git, copy_git) = (src.join(".git"), copy.join(".git"));
    if tree_digest(&src_git)? != tree_digest(&copy_git)? {
        return Err(WorktreeError::CopyVerificationFailed {
            reason: ".git checksum mismatch".to_string(),
        });
    }
    Ok(())
}
