//! Detection and removal of stale worktrees
//!
//! A worktree is stale when its branch ref is gone or when the branch is fully
//! merged into the main branch. Removal never forces, so dirty or locked
//! worktrees fail on their own without stopping the rest of the batch.

use super::WorktreeEntry;
use super::error::{Result, WorktreeError};
use super::vcs::Vcs;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "target")]
pub enum StaleReason {
    BranchDeleted,
    MergedInto(String),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StaleReason::BranchDeleted => write!(f, "branch deleted"),
            StaleReason::MergedInto(target) => write!(f, "merged into {}", target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleWorktree {
    pub branch: String,
    pub path: PathBuf,
    pub reason: StaleReason,
}

/// Result of removing one worktree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneOutcome {
    pub branch: String,
    pub result: std::result::Result<(), String>,
}

impl PruneOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// One outcome per requested branch, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub outcomes: Vec<PruneOutcome>,
}

impl PruneReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &PruneOutcome> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PruneOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// At least one removal failed
    pub fn is_partial_failure(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// Stale worktrees, excluding the main checkout and detached HEADs.
///
/// `launch_branch` is the branch checked out where the engine was started; it
/// is never reported as merged.
pub(crate) fn find_stale(
    vcs: &dyn Vcs,
    root: &Path,
    main_branch: &str,
    launch_branch: Option<&str>,
) -> Result<Vec<StaleWorktree>> {
    let worktrees = vcs.list_worktrees(root)?;
    let mut stale = Vec::new();

    // git lists the main checkout first
    for wt in worktrees.iter().skip(1).filter(|w| !w.is_detached) {
        if let Some(reason) = stale_reason(vcs, root, wt, main_branch, launch_branch)? {
            log::debug!("stale worktree {} ({})", wt.branch_or_ref, reason);
            stale.push(StaleWorktree {
                branch: wt.branch_or_ref.clone(),
                path: wt.path.clone(),
                reason,
            });
        }
    }

    Ok(stale)
}

fn stale_reason(
    vcs: &dyn Vcs,
    root: &Path,
    wt: &WorktreeEntry,
    main_branch: &str,
    launch_branch: Option<&str>,
) -> Result<Option<StaleReason>> {
    let branch = wt.branch_or_ref.as_str();
    if !vcs.branch_exists(root, branch)? {
        return Ok(Some(StaleReason::BranchDeleted));
    }
    if branch == main_branch || Some(branch) == launch_branch {
        return Ok(None);
    }
    if vcs.is_merged(root, branch, main_branch)? {
        return Ok(Some(StaleReason::MergedInto(main_branch.to_string())));
    }
    Ok(None)
}

/// Remove the worktree of each branch without `--force`.
pub(crate) fn prune(vcs: &dyn Vcs, root: &Path, branches: &[String]) -> Result<PruneReport> {
    let worktrees = vcs.list_worktrees(root)?;
    let main_path = worktrees.first().map(|w| w.path.clone());

    let outcomes = branches
        .iter()
        .map(|branch| {
            let result = match worktrees
                .iter()
                .find(|w| !w.is_detached && &w.branch_or_ref == branch)
            {
                None => Err(WorktreeError::NoWorktree {
                    branch: branch.clone(),
                }),
                Some(wt) if Some(&wt.path) == main_path.as_ref() => {
                    Err(WorktreeError::MainCheckout {
                        branch: branch.clone(),
                    })
                }
                Some(wt) => vcs.remove_worktree(root, &wt.path, false),
            };
            if let Err(e) = &result {
                log::warn!("failed to prune {}: {}", branch, e);
            }
            PruneOutcome {
                branch: branch.clone(),
                result: result.map_err(|e| e.to_string()),
            }
        })
        .collect();

    Ok(PruneReport { outcomes })
}
