//! Per-branch status snapshots
//!
//! A snapshot is assembled from independent VCS queries. Fields that need a
//! checkout to answer (dirty, untracked, stash, in-progress operations) are
//! [`Probe`]s so that "no worktree" never reads as "clean".

use super::InProgress;
use super::error::Result;
use super::vcs::Vcs;
use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// A value that is only observable inside a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "value")]
pub enum Probe<T> {
    Known(T),
    Unknown,
}

impl<T> Probe<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Probe::Known(v) => Some(v),
            Probe::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Probe::Unknown)
    }
}

impl Probe<bool> {
    /// True only when known to be true
    pub fn is_set(&self) -> bool {
        matches!(self, Probe::Known(true))
    }
}

/// Status of one branch at the time it was resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchStatus {
    pub branch: String,

    /// Tracked files with staged or unstaged changes
    pub dirty: Probe<bool>,
    pub untracked_count: Probe<usize>,

    /// Commits ahead of / behind the upstream; 0 without one
    pub ahead: u32,
    pub behind: u32,

    pub last_commit_time: Option<DateTime<Local>>,

    pub has_stash: Probe<bool>,
    pub rebase_in_progress: Probe<bool>,
    pub merge_in_progress: Probe<bool>,
}

impl BranchStatus {
    /// Short indicator string, e.g. `* [+2] [S]`, or `?` when the branch has
    /// no checkout.
    pub fn indicators(&self) -> String {
        if self.dirty.is_unknown() {
            return "?".to_string();
        }

        let mut parts = Vec::new();
        if self.dirty.is_set() {
            parts.push("*".to_string());
        }
        if let Some(&n) = self.untracked_count.known()
            && n > 0
        {
            parts.push(format!("[+{}]", n));
        }
        if self.rebase_in_progress.is_set() {
            parts.push("[R]".to_string());
        }
        if self.merge_in_progress.is_set() {
            parts.push("[M]".to_string());
        }
        if self.has_stash.is_set() {
            parts.push("[S]".to_string());
        }
        parts.join(" ")
    }
}

/// Resolve the status of `branch`; `worktree` is its checkout, if any.
pub(crate) fn resolve(
    vcs: &dyn Vcs,
    root: &Path,
    branch: &str,
    worktree: Option<&Path>,
) -> Result<BranchStatus> {
    let (ahead, behind) = match vcs.upstream_of(root, branch)? {
        Some(upstream) => vcs.ahead_behind(root, branch, &upstream)?,
        None => (0, 0),
    };
    let last_commit_time = vcs.last_commit_time(root, branch)?;

    let mut status = BranchStatus {
        branch: branch.to_string(),
        dirty: Probe::Unknown,
        untracked_count: Probe::Unknown,
        ahead,
        behind,
        last_commit_time,
        has_stash: Probe::Unknown,
        rebase_in_progress: Probe::Unknown,
        merge_in_progress: Probe::Unknown,
    };

    if let Some(path) = worktree {
        let state = vcs.in_progress_state(path)?;
        status.dirty = Probe::Known(!vcs.dirty_files(path)?.is_empty());
        status.untracked_count = Probe::Known(vcs.untracked_files(path)?.len());
        status.has_stash = Probe::Known(vcs.stash_count(path)? > 0);
        status.rebase_in_progress = Probe::Known(state == InProgress::Rebase);
        status.merge_in_progress = Probe::Known(state == InProgress::Merge);
    }

    Ok(status)
}

/// Resolve many branches in parallel; output order matches input order.
///
/// Each branch succeeds or fails on its own.
pub(crate) fn resolve_all(
    vcs: &dyn Vcs,
    root: &Path,
    branches: &[(String, Option<&Path>)],
) -> Vec<Result<BranchStatus>> {
    branches
        .par_iter()
        .map(|(branch, worktree)| {
            resolve(vcs, root, branch, *worktree).inspect_err(|e| {
                log::warn!("status of {} failed: {}", branch, e);
            })
        })
        .collect()
}

/// Dirty and untracked files of a checkout, sorted and de-duplicated
pub(crate) fn uncommitted_files(vcs: &dyn Vcs, worktree: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = worktree else {
        return Ok(Vec::new());
    };
    let mut files = vcs.dirty_files(path)?;
    files.extend(vcs.untracked_files(path)?);
    files.sort();
    files.dedup();
    Ok(files)
}
