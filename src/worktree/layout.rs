//! Main-branch resolution and on-disk layout classification
//!
//! The expected layout is a *container* directory holding one checkout per
//! branch as siblings. The main checkout (the one with a real `.git`
//! directory) must be named after the main branch; linked worktrees (whose
//! `.git` is a file) are valid wherever they sit. A conventional clone at
//! `/work/myproject` needs restructuring into `/work/myproject/<main>`.

use super::error::{Result, WorktreeError};
use super::vcs::Vcs;
use std::path::{Path, PathBuf};

/// Classification of a checkout against the container layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Linked worktree, or main checkout already named after the main branch
    Valid,

    /// Main checkout that must be moved to `expected_main` first
    NeedsRestructure { expected_main: PathBuf },

    /// Not a checkout the engine may operate on
    Invalid { reason: String },
}

impl Layout {
    pub fn is_valid(&self) -> bool {
        matches!(self, Layout::Valid)
    }
}

/// Resolve the canonical branch name.
///
/// First hit wins: configured override, `origin/HEAD`, a local `main` or
/// `master`, then whatever the main checkout has checked out.
pub fn resolve_main_branch(
    vcs: &dyn Vcs,
    dir: &Path,
    override_branch: Option<&str>,
) -> Result<String> {
    if let Some(branch) = override_branch.map(str::trim).filter(|b| !b.is_empty()) {
        return Ok(branch.to_string());
    }

    if let Some(branch) = vcs.remote_default_branch(dir)? {
        return Ok(branch);
    }

    for candidate in ["main", "master"] {
        if vcs.branch_exists(dir, candidate)? {
            return Ok(candidate.to_string());
        }
    }

    // git lists the main checkout first
    let worktrees = vcs.list_worktrees(dir)?;
    if let Some(main) = worktrees.first().filter(|w| !w.is_detached) {
        return Ok(main.branch_or_ref.clone());
    }

    Err(WorktreeError::AmbiguousMainBranch)
}

/// Classify `repo_root` given the resolved main branch.
pub fn classify(repo_root: &Path, main_branch: &str) -> Layout {
    let git_entry = repo_root.join(".git");
    let Ok(meta) = std::fs::symlink_metadata(&git_entry) else {
        return Layout::Invalid {
            reason: format!("{} has no .git entry", repo_root.display()),
        };
    };

    if meta.is_file() {
        return Layout::Valid;
    }
    if !meta.is_dir() {
        return Layout::Invalid {
            reason: format!("{} is neither a file nor a directory", git_entry.display()),
        };
    }

    let named_after_main = repo_root
        .file_name()
        .is_some_and(|name| name.to_string_lossy() == main_branch);
    if named_after_main {
        return Layout::Valid;
    }
    if main_branch.contains('/') || main_branch.contains('\\') {
        return Layout::Invalid {
            reason: format!(
                "main branch '{}' cannot name a directory; set worktree.default_base",
                main_branch
            ),
        };
    }
    // the checkout's own directory becomes the container
    Layout::NeedsRestructure {
        expected_main: repo_root.join(main_branch),
    }
}

/// Fail unless the layout is [`Layout::Valid`].
pub(crate) fn ensure_valid(repo_root: &Path, layout: &Layout) -> Result<()> {
    match layout {
        Layout::Valid => Ok(()),
        Layout::NeedsRestructure { expected_main } => Err(WorktreeError::InvalidLayout {
            path: repo_root.to_path_buf(),
            reason: format!(
                "the main checkout must live at {}; run `wtr restructure` to move it",
                expected_main.display()
            ),
        }),
        Layout::Invalid { reason } => Err(WorktreeError::InvalidLayout {
            path: repo_root.to_path_buf(),
            reason: reason.clone(),
        }),
    }
}
