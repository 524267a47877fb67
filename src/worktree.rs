//! Worktree discovery, layout enforcement and status tracking
//!
//! This module holds the worktree state engine: the [`Vcs`] boundary over the
//! external git executable, layout classification and one-time restructuring,
//! per-branch status resolution, and stale-worktree pruning. The
//! [`WorktreeManager`] facade binds all of it to one repository root.

mod error;
mod git;
mod layout;
mod lock;
mod manager;
#[cfg(test)]
mod mock;
mod prune;
mod restructure;
mod shared;
mod status;
mod vcs;

pub use error::{Result as WorktreeResult, WorktreeError};
pub use git::{GitCli, parse_worktree_list};
pub use layout::{Layout, classify, resolve_main_branch};
pub use lock::RepoLock;
pub use manager::{CreateRequest, CreateSource, CreatedWorktree, EngineOptions, WorktreeManager};
pub use prune::{PruneOutcome, PruneReport, StaleReason, StaleWorktree};
pub use restructure::restructure;
pub use shared::{SHARE_OBJ_FILENAME, create_shared_symlinks};
pub use status::{BranchStatus, Probe};
pub use vcs::Vcs;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A worktree as reported by `git worktree list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeEntry {
    /// Branch name, or the directory name for a detached HEAD
    pub branch_or_ref: String,

    /// Absolute filesystem path
    pub path: PathBuf,

    /// Whether HEAD is detached
    pub is_detached: bool,

    /// Commit SHA checked out (empty for a bare entry)
    pub head: String,

    /// Whether the worktree is locked against removal
    pub locked: bool,
}

/// Operation in progress inside a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InProgress {
    None,
    Rebase,
    Merge,
}

impl std::fmt::Display for InProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InProgress::None => write!(f, "none"),
            InProgress::Rebase => write!(f, "rebase"),
            InProgress::Merge => write!(f, "merge"),
        }
    }
}

/// One line of branch history, used for previews
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Abbreviated SHA (7 chars)
    pub sha: String,

    /// First line of the message, at most 60 chars
    pub subject: String,

    pub time: DateTime<Local>,
}
