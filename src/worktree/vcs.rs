//! The query/command boundary over the version-control tool
//!
//! Every method takes the directory to run in explicitly. Implementations
//! carry no policy: they report what git says and nothing more. The only
//! mutating methods are [`Vcs::add_worktree`] and [`Vcs::remove_worktree`].

use super::error::Result;
use super::{CommitSummary, InProgress, WorktreeEntry};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub trait Vcs: Send + Sync {
    /// All worktrees known to the repository, main checkout first
    fn list_worktrees(&self, dir: &Path) -> Result<Vec<WorktreeEntry>>;

    /// Local branch names, sorted
    fn list_local_branches(&self, dir: &Path) -> Result<Vec<String>>;

    /// Tag names, sorted
    fn list_tags(&self, dir: &Path) -> Result<Vec<String>>;

    fn branch_exists(&self, dir: &Path, name: &str) -> Result<bool>;

    /// Branch checked out in `dir`, or None when HEAD is detached
    fn current_branch(&self, dir: &Path) -> Result<Option<String>>;

    /// Full SHA of a commit-ish, or None if it does not resolve
    fn resolve_ref(&self, dir: &Path, spec: &str) -> Result<Option<String>>;

    /// `git worktree add`. With `new_branch`, creates that branch at `reference`.
    fn add_worktree(
        &self,
        dir: &Path,
        path: &Path,
        reference: &str,
        new_branch: Option<&str>,
        detach: bool,
    ) -> Result<()>;

    fn remove_worktree(&self, dir: &Path, path: &Path, force: bool) -> Result<()>;

    /// Re-link worktree administrative files after the main checkout moved
    fn repair_worktrees(&self, dir: &Path) -> Result<()>;

    /// Whether `branch` is an ancestor of (fully merged into) `target`
    fn is_merged(&self, dir: &Path, branch: &str, target: &str) -> Result<bool>;

    /// Commits on `branch` not on `remote_ref`, and vice versa
    fn ahead_behind(&self, dir: &Path, branch: &str, remote_ref: &str) -> Result<(u32, u32)>;

    /// Tracked files with staged or unstaged modifications
    fn dirty_files(&self, path: &Path) -> Result<Vec<String>>;

    /// Untracked, non-ignored files
    fn untracked_files(&self, path: &Path) -> Result<Vec<String>>;

    fn stash_count(&self, path: &Path) -> Result<u32>;

    fn in_progress_state(&self, path: &Path) -> Result<InProgress>;

    /// Branch that `origin/HEAD` points at, if the remote default is tracked
    fn remote_default_branch(&self, dir: &Path) -> Result<Option<String>>;

    /// Upstream ref of a local branch (e.g. `origin/feature`). None when
    /// unset or when the remote branch is gone.
    fn upstream_of(&self, dir: &Path, branch: &str) -> Result<Option<String>>;

    fn last_commit_time(&self, dir: &Path, reference: &str) -> Result<Option<DateTime<Local>>>;

    fn recent_commits(&self, dir: &Path, reference: &str, count: usize)
    -> Result<Vec<CommitSummary>>;

    /// Top-level directory of the checkout containing `dir`
    fn toplevel(&self, dir: &Path) -> Result<PathBuf>;

    /// Absolute path of the shared git directory
    fn common_dir(&self, dir: &Path) -> Result<PathBuf>;
}
