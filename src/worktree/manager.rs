//! WorktreeManager - the engine bound to one repository root

use super::error::{Result, WorktreeError};
use super::git::GitCli;
use super::layout::{self, Layout};
use super::lock::RepoLock;
use super::prune::{self, PruneReport, StaleWorktree};
use super::shared::create_shared_symlinks;
use super::status::{self, BranchStatus};
use super::vcs::Vcs;
use super::{CommitSummary, WorktreeEntry, restructure};
use crate::fuzzy::DEFAULT_THRESHOLD;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Settings the engine takes from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Overrides main-branch detection and is the default base for new branches
    pub default_base: Option<String>,
    pub fuzzy_threshold: u8,
    pub prune_auto_suggest: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_base: None,
            fuzzy_threshold: DEFAULT_THRESHOLD,
            prune_auto_suggest: true,
        }
    }
}

/// Where a new worktree's HEAD comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateSource {
    /// Check out branch `name`, creating it from `base` if it does not exist
    Branch { base: Option<String> },

    /// Detached at `commit`, or on a new branch `name` started there
    Commit { commit: String, new_branch: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub name: String,
    pub source: CreateSource,
}

impl CreateRequest {
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: CreateSource::Branch { base: None },
        }
    }
}

/// A freshly created worktree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedWorktree {
    pub path: PathBuf,

    /// Problems creating shared symlinks; the worktree itself is fine
    pub warnings: Vec<String>,
}

/// Worktree engine for the checkout at `root`
pub struct WorktreeManager {
    vcs: Box<dyn Vcs>,
    root: PathBuf,
    container: PathBuf,
    launch_branch: Option<String>,
    main_branch: OnceLock<String>,
    options: EngineOptions,
}

impl std::fmt::Debug for WorktreeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("WorktreeManager")
            .field("root", &self.root)
            .field("container", &self.container)
            .field("launch_branch", &self.launch_branch)
            .field("main_branch", &self.main_branch.get())
            .field("options", &self.options)
            .finish()
    }
}

impl WorktreeManager {
    /// Find the checkout containing `start_dir` using the `git` on PATH
    pub fn discover(start_dir: &Path, options: EngineOptions) -> Result<Self> {
        let vcs = GitCli::locate()?;
        let root = vcs.toplevel(start_dir)?;
        Self::open(root, Box::new(vcs), options)
    }

    /// Bind to an already known checkout root
    pub fn open(root: PathBuf, vcs: Box<dyn Vcs>, options: EngineOptions) -> Result<Self> {
        let root = root.canonicalize().unwrap_or(root);
        let launch_branch = vcs.current_branch(&root)?;
        // git lists the main checkout first; its parent holds every worktree,
        // including ones nested like `feature/login`
        let container = vcs
            .list_worktrees(&root)?
            .first()
            .and_then(|main| main.path.parent().map(Path::to_path_buf))
            .or_else(|| root.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| root.clone());
        log::debug!(
            "opened {} on {}",
            root.display(),
            launch_branch.as_deref().unwrap_or("(detached)")
        );
        Ok(Self {
            vcs,
            root,
            container,
            launch_branch,
            main_branch: OnceLock::new(),
            options,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the main checkout and every worktree
    pub fn container(&self) -> &Path {
        &self.container
    }

    /// Branch checked out at `root` when the manager was opened
    pub fn current_branch(&self) -> Option<&str> {
        self.launch_branch.as_deref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Canonical branch name, resolved once per manager
    pub fn main_branch(&self) -> Result<String> {
        if let Some(branch) = self.main_branch.get() {
            return Ok(branch.clone());
        }
        let branch = layout::resolve_main_branch(
            self.vcs.as_ref(),
            &self.root,
            self.options.default_base.as_deref(),
        )?;
        Ok(self.main_branch.get_or_init(|| branch).clone())
    }

    pub fn classify(&self) -> Result<Layout> {
        Ok(layout::classify(&self.root, &self.main_branch()?))
    }

    pub fn ensure_valid(&self) -> Result<()> {
        layout::ensure_valid(&self.root, &self.classify()?)
    }

    /// Move the main checkout into the container layout. Returns its new
    /// path; open a new manager there to keep working.
    pub fn restructure(&self) -> Result<PathBuf> {
        let main = self.main_branch()?;
        let _lock = self.lock()?;
        let new_main = restructure::restructure(&self.root, &main)?;
        if let Err(e) = self.vcs.repair_worktrees(&new_main) {
            log::warn!("moved checkout but `git worktree repair` failed: {}", e);
        }
        Ok(new_main)
    }

    pub fn worktrees(&self) -> Result<Vec<WorktreeEntry>> {
        self.vcs.list_worktrees(&self.root)
    }

    /// Branch (or detached directory name) to worktree path
    pub fn worktree_map(&self) -> Result<BTreeMap<String, PathBuf>> {
        Ok(self
            .worktrees()?
            .into_iter()
            .map(|w| (w.branch_or_ref, w.path))
            .collect())
    }

    pub fn worktree_path(&self, branch: &str) -> Result<Option<PathBuf>> {
        Ok(self.worktree_map()?.remove(branch))
    }

    pub fn list_local_branches(&self) -> Result<Vec<String>> {
        self.vcs.list_local_branches(&self.root)
    }

    pub fn list_tags(&self) -> Result<Vec<String>> {
        self.vcs.list_tags(&self.root)
    }

    /// Add a worktree at `container/name`.
    ///
    /// Fails with `TargetExists` if anything is already there, and removes
    /// whatever `git worktree add` left behind if it fails.
    pub fn create_worktree(&self, request: CreateRequest) -> Result<CreatedWorktree> {
        self.ensure_valid()?;
        let name = request.name.trim();
        validate_name(name)?;

        let path = self.container().join(name);
        if fs::symlink_metadata(&path).is_ok() {
            return Err(WorktreeError::TargetExists { path });
        }

        let (reference, new_branch, detach) = match &request.source {
            CreateSource::Branch { base: _ } if self.vcs.branch_exists(&self.root, name)? => {
                (name.to_string(), None, false)
            }
            CreateSource::Branch { base } => {
                let base = match base.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
                    Some(b) => b.to_string(),
                    None => self.main_branch()?,
                };
                (base, Some(name), false)
            }
            CreateSource::Commit { commit, new_branch } => {
                if self.vcs.resolve_ref(&self.root, commit)?.is_none() {
                    return Err(WorktreeError::RefNotFound {
                        spec: commit.clone(),
                    });
                }
                if *new_branch {
                    (commit.clone(), Some(name), false)
                } else {
                    (commit.clone(), None, true)
                }
            }
        };

        let _lock = self.lock()?;
        let created_root = first_missing_ancestor(&path, self.container());
        log::info!("creating worktree {} from {}", path.display(), reference);
        if let Err(e) =
            self.vcs
                .add_worktree(&self.root, &path, &reference, new_branch, detach)
        {
            if let Err(cleanup) = fs::remove_dir_all(&created_root)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                log::warn!("failed to clean up {}: {}", created_root.display(), cleanup);
            }
            return Err(e);
        }

        let warnings = create_shared_symlinks(&path, self.container());
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        Ok(CreatedWorktree { path, warnings })
    }

    /// Remove the worktree of `branch`; `force` discards local changes.
    pub fn delete_worktree(&self, branch: &str, force: bool) -> Result<()> {
        self.ensure_valid()?;
        let worktrees = self.worktrees()?;
        let Some(position) = worktrees.iter().position(|w| w.branch_or_ref == branch) else {
            return Err(WorktreeError::NoWorktree {
                branch: branch.to_string(),
            });
        };
        if position == 0 {
            return Err(WorktreeError::MainCheckout {
                branch: branch.to_string(),
            });
        }

        let _lock = self.lock()?;
        log::info!("removing worktree {}", worktrees[position].path.display());
        self.vcs
            .remove_worktree(&self.root, &worktrees[position].path, force)
    }

    pub fn status(&self, branch: &str) -> Result<BranchStatus> {
        let path = self.worktree_path(branch)?;
        status::resolve(self.vcs.as_ref(), &self.root, branch, path.as_deref())
    }

    /// Status of every branch, in the order given. A branch whose status
    /// cannot be read gets its own error without failing the others.
    pub fn status_all(&self, branches: &[String]) -> Result<Vec<Result<BranchStatus>>> {
        let map = self.worktree_map()?;
        let requests: Vec<(String, Option<&Path>)> = branches
            .iter()
            .map(|b| (b.clone(), map.get(b).map(PathBuf::as_path)))
            .collect();
        Ok(status::resolve_all(self.vcs.as_ref(), &self.root, &requests))
    }

    pub fn recent_commits(&self, branch: &str, count: usize) -> Result<Vec<CommitSummary>> {
        self.vcs.recent_commits(&self.root, branch, count)
    }

    /// Uncommitted files in the branch's worktree; empty without one
    pub fn uncommitted_files(&self, branch: &str) -> Result<Vec<String>> {
        let path = self.worktree_path(branch)?;
        status::uncommitted_files(self.vcs.as_ref(), path.as_deref())
    }

    pub fn find_stale(&self) -> Result<Vec<StaleWorktree>> {
        self.ensure_valid()?;
        prune::find_stale(
            self.vcs.as_ref(),
            &self.root,
            &self.main_branch()?,
            self.launch_branch.as_deref(),
        )
    }

    pub fn prune(&self, branches: &[String]) -> Result<PruneReport> {
        self.ensure_valid()?;
        let _lock = self.lock()?;
        prune::prune(self.vcs.as_ref(), &self.root, branches)
    }

    fn lock(&self) -> Result<RepoLock> {
        RepoLock::acquire(&self.vcs.common_dir(&self.root)?)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let relative_only = path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if name.is_empty() || !relative_only || name.starts_with('-') {
        return Err(WorktreeError::Parse(format!(
            "invalid worktree name '{}'",
            name
        )));
    }
    Ok(())
}

/// Topmost directory that `path` would create below `stop`
fn first_missing_ancestor(path: &Path, stop: &Path) -> PathBuf {
    let mut missing = path.to_path_buf();
    while let Some(parent) = missing.parent() {
        if parent == stop || parent.exists() {
            break;
        }
        missing = parent.to_path_buf();
    }
    missing
}
