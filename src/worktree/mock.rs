//! In-memory [`Vcs`] for deterministic engine tests
//!
//! State is configured with builder methods and kept behind a mutex so the
//! mock can be shared with parallel status resolution. Removals are recorded
//! for verification.

use super::error::{Result, WorktreeError};
use super::vcs::Vcs;
use super::{CommitSummary, InProgress, WorktreeEntry};
use chrono::{DateTime, Local, TimeZone};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MockVcs {
    inner: Mutex<MockVcsInner>,
}

#[derive(Debug, Default)]
struct MockVcsInner {
    worktrees: Vec<WorktreeEntry>,
    branches: Vec<String>,
    tags: Vec<String>,
    remote_default: Option<String>,
    merged: HashSet<String>,
    upstreams: HashMap<String, (String, u32, u32)>,
    dirty: HashMap<PathBuf, Vec<String>>,
    untracked: HashMap<PathBuf, Vec<String>>,
    stashes: HashMap<PathBuf, u32>,
    in_progress: HashMap<PathBuf, InProgress>,
    fail_remove: HashSet<PathBuf>,
    fail_log: HashSet<String>,
    removed: Vec<PathBuf>,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(self, f: impl FnOnce(&mut MockVcsInner)) -> Self {
        f(&mut self.inner.lock().unwrap());
        self
    }

    pub fn with_branch(self, name: &str) -> Self {
        self.edit(|s| s.branches.push(name.to_string()))
    }

    /// Branch plus a worktree checking it out. The first one added is the
    /// main checkout.
    pub fn with_worktree(self, branch: &str, path: &Path) -> Self {
        self.edit(|s| {
            if !s.branches.iter().any(|b| b == branch) {
                s.branches.push(branch.to_string());
            }
            s.worktrees.push(WorktreeEntry {
                branch_or_ref: branch.to_string(),
                path: path.to_path_buf(),
                is_detached: false,
                head: "0".repeat(40),
                locked: false,
            });
        })
    }

    /// Worktree whose branch ref is gone
    pub fn with_orphan_worktree(self, branch: &str, path: &Path) -> Self {
        self.edit(|s| {
            s.worktrees.push(WorktreeEntry {
                branch_or_ref: branch.to_string(),
                path: path.to_path_buf(),
                is_detached: false,
                head: "0".repeat(40),
                locked: false,
            })
        })
    }

    pub fn with_detached(self, name: &str, path: &Path) -> Self {
        self.edit(|s| {
            s.worktrees.push(WorktreeEntry {
                branch_or_ref: name.to_string(),
                path: path.to_path_buf(),
                is_detached: true,
                head: "1".repeat(40),
                locked: false,
            })
        })
    }

    pub fn with_tag(self, name: &str) -> Self {
        self.edit(|s| s.tags.push(name.to_string()))
    }

    pub fn remote_default(self, branch: &str) -> Self {
        self.edit(|s| s.remote_default = Some(branch.to_string()))
    }

    pub fn merged(self, branch: &str) -> Self {
        self.edit(|s| {
            s.merged.insert(branch.to_string());
        })
    }

    pub fn upstream(self, branch: &str, upstream: &str, ahead: u32, behind: u32) -> Self {
        self.edit(|s| {
            s.upstreams
                .insert(branch.to_string(), (upstream.to_string(), ahead, behind));
        })
    }

    pub fn dirty(self, path: &Path, files: &[&str]) -> Self {
        self.edit(|s| {
            s.dirty
                .insert(path.to_path_buf(), files.iter().map(|f| f.to_string()).collect());
        })
    }

    pub fn untracked(self, path: &Path, files: &[&str]) -> Self {
        self.edit(|s| {
            s.untracked
                .insert(path.to_path_buf(), files.iter().map(|f| f.to_string()).collect());
        })
    }

    pub fn stash(self, path: &Path, count: u32) -> Self {
        self.edit(|s| {
            s.stashes.insert(path.to_path_buf(), count);
        })
    }

    pub fn in_progress(self, path: &Path, state: InProgress) -> Self {
        self.edit(|s| {
            s.in_progress.insert(path.to_path_buf(), state);
        })
    }

    pub fn fail_remove(self, path: &Path) -> Self {
        self.edit(|s| {
            s.fail_remove.insert(path.to_path_buf());
        })
    }

    /// History queries on `reference` fail as if git had errored
    pub fn fail_log(self, reference: &str) -> Self {
        self.edit(|s| {
            s.fail_log.insert(reference.to_string());
        })
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().removed.clone()
    }
}

fn fixed_time() -> DateTime<Local> {
    Local.timestamp_opt(1_700_000_000, 0).unwrap()
}

impl Vcs for MockVcs {
    fn list_worktrees(&self, _dir: &Path) -> Result<Vec<WorktreeEntry>> {
        Ok(self.inner.lock().unwrap().worktrees.clone())
    }

    fn list_local_branches(&self, _dir: &Path) -> Result<Vec<String>> {
        let mut branches = self.inner.lock().unwrap().branches.clone();
        branches.sort();
        Ok(branches)
    }

    fn list_tags(&self, _dir: &Path) -> Result<Vec<String>> {
        Ok(self.inner.lock().unwrap().tags.clone())
    }

    fn branch_exists(&self, _dir: &Path, name: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().branches.iter().any(|b| b == name))
    }

    fn current_branch(&self, dir: &Path) -> Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .worktrees
            .iter()
            .find(|w| w.path == dir)
            .filter(|w| !w.is_detached)
            .map(|w| w.branch_or_ref.clone()))
    }

    fn resolve_ref(&self, _dir: &Path, spec: &str) -> Result<Option<String>> {
        let s = self.inner.lock().unwrap();
        let known = s.branches.iter().chain(s.tags.iter()).any(|r| r == spec);
        Ok(known.then(|| "a".repeat(40)))
    }

    fn add_worktree(
        &self,
        _dir: &Path,
        path: &Path,
        reference: &str,
        new_branch: Option<&str>,
        detach: bool,
    ) -> Result<()> {
        let mut s = self.inner.lock().unwrap();
        let name = new_branch.unwrap_or(reference).to_string();
        if let Some(branch) = new_branch {
            s.branches.push(branch.to_string());
        }
        s.worktrees.push(WorktreeEntry {
            branch_or_ref: name,
            path: path.to_path_buf(),
            is_detached: detach,
            head: "a".repeat(40),
            locked: false,
        });
        Ok(())
    }

    fn remove_worktree(&self, _dir: &Path, path: &Path, _force: bool) -> Result<()> {
        let mut s = self.inner.lock().unwrap();
        if s.fail_remove.contains(path) {
            return Err(WorktreeError::VcsCommandFailed {
                command: format!("git worktree remove {}", path.display()),
                exit_code: Some(128),
                stderr: "fatal: cannot remove a locked working tree".to_string(),
            });
        }
        s.worktrees.retain(|w| w.path != path);
        s.removed.push(path.to_path_buf());
        Ok(())
    }

    fn repair_worktrees(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn is_merged(&self, _dir: &Path, branch: &str, _target: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().merged.contains(branch))
    }

    fn ahead_behind(&self, _dir: &Path, branch: &str, _remote_ref: &str) -> Result<(u32, u32)> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .upstreams
            .get(branch)
            .map(|(_, a, b)| (*a, *b))
            .unwrap_or((0, 0)))
    }

    fn dirty_files(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self.inner.lock().unwrap().dirty.get(path).cloned().unwrap_or_default())
    }

    fn untracked_files(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .untracked
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    fn stash_count(&self, path: &Path) -> Result<u32> {
        Ok(self.inner.lock().unwrap().stashes.get(path).copied().unwrap_or(0))
    }

    fn in_progress_state(&self, path: &Path) -> Result<InProgress> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .in_progress
            .get(path)
            .copied()
            .unwrap_or(InProgress::None))
    }

    fn remote_default_branch(&self, _dir: &Path) -> Result<Option<String>> {
        Ok(self.inner.lock().unwrap().remote_default.clone())
    }

    fn upstream_of(&self, _dir: &Path, branch: &str) -> Result<Option<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .upstreams
            .get(branch)
            .map(|(u, _, _)| u.clone()))
    }

    fn last_commit_time(&self, _dir: &Path, reference: &str) -> Result<Option<DateTime<Local>>> {
        if self.inner.lock().unwrap().fail_log.contains(reference) {
            return Err(WorktreeError::VcsCommandFailed {
                command: format!("git log -1 {}", reference),
                exit_code: Some(128),
                stderr: "fatal: bad object".to_string(),
            });
        }
        Ok(Some(fixed_time()))
    }

    fn recent_commits(
        &self,
        _dir: &Path,
        reference: &str,
        count: usize,
    ) -> Result<Vec<CommitSummary>> {
        Ok((0..count.min(3))
            .map(|i| CommitSummary {
                sha: format!("{:07}", i),
                subject: format!("{} commit {}", reference, i),
                time: fixed_time(),
            })
            .collect())
    }

    fn toplevel(&self, dir: &Path) -> Result<PathBuf> {
        Ok(dir.to_path_buf())
    }

    fn common_dir(&self, dir: &Path) -> Result<PathBuf> {
        Ok(dir.join(".git"))
    }
}
