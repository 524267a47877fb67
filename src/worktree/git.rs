//! [`Vcs`] implementation that shells out to the `git` executable
//!
//! Control decisions are made from exit codes and stdout only. stderr is
//! captured for error reporting and never inspected.

use super::error::{Result, WorktreeError};
use super::vcs::Vcs;
use super::{CommitSummary, InProgress, WorktreeEntry};
use crate::cd_request::CD_FILE_ENV_VAR;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

/// Field separator used in `--format` strings
const FIELD_SEP: char = '\u{1f}';

/// Handle to a located git executable
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    /// Locate `git` on PATH and check that it runs.
    pub fn locate() -> Result<Self> {
        let program = which::which("git").map_err(|e| WorktreeError::VcsUnavailable {
            reason: format!("git executable not found on PATH ({})", e),
        })?;
        let git = Self { program };
        let version = git.run_checked(&["--version"], None)?;
        log::debug!("using {}", version.trim());
        Ok(git)
    }

    /// Use a specific executable without probing it.
    ///
    /// Every call fails with `VcsUnavailable` if the path cannot be executed.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run git and return the raw output, whatever the exit status.
    fn run(&self, args: &[&str], dir: Option<&Path>) -> Result<Output> {
        let cmd_str = format!("git {}", args.join(" "));
        match dir {
            Some(dir) => log::debug!("$ {} [{}]", cmd_str, dir.display()),
            None => log::debug!("$ {}", cmd_str),
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        // Child processes must not write to the caller's cd request
        cmd.env_remove(CD_FILE_ENV_VAR);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let t0 = Instant::now();
        let output = cmd.output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                WorktreeError::VcsUnavailable {
                    reason: format!("cannot execute {}: {}", self.program.display(), e),
                }
            }
            _ => WorktreeError::io(format!("failed to spawn {}", cmd_str), e),
        })?;
        log::debug!(
            "[git] cmd=\"{}\" dur_us={} ok={}",
            cmd_str,
            t0.elapsed().as_micros(),
            output.status.success()
        );

        Ok(output)
    }

    /// Run git, require success, and return stdout.
    fn run_checked(&self, args: &[&str], dir: Option<&Path>) -> Result<String> {
        let output = self.run(args, dir)?;
        if !output.status.success() {
            return Err(command_failed(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a git command whose exit code is the answer (0 = yes, 1 = no).
    ///
    /// Any other exit code is a failure.
    fn run_predicate(&self, args: &[&str], dir: &Path) -> Result<bool> {
        let output = self.run(args, Some(dir))?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_failed(args, &output)),
        }
    }

    fn lines(&self, args: &[&str], dir: &Path) -> Result<Vec<String>> {
        let stdout = self.run_checked(args, Some(dir))?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn git_dir(&self, path: &Path) -> Result<PathBuf> {
        let stdout = self.run_checked(&["rev-parse", "--absolute-git-dir"], Some(path))?;
        Ok(PathBuf::from(stdout.trim()))
    }
}

fn command_failed(args: &[&str], output: &Output) -> WorktreeError {
    WorktreeError::VcsCommandFailed {
        command: format!("git {}", args.join(" ")),
        exit_code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Local>> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|e| WorktreeError::Parse(format!("bad commit timestamp '{}': {}", raw, e)))?;
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.with_timezone(&Local))
        .ok_or_else(|| WorktreeError::Parse(format!("timestamp out of range: {}", secs)))
}

impl Vcs for GitCli {
    fn list_worktrees(&self, dir: &Path) -> Result<Vec<WorktreeEntry>> {
        let stdout = self.run_checked(&["worktree", "list", "--porcelain"], Some(dir))?;
        parse_worktree_list(&stdout)
    }

    fn list_local_branches(&self, dir: &Path) -> Result<Vec<String>> {
        let mut branches = self.lines(
            &["for-each-ref", "--format=%(refname:short)", "refs/heads/"],
            dir,
        )?;
        branches.sort();
        Ok(branches)
    }

    fn list_tags(&self, dir: &Path) -> Result<Vec<String>> {
        let mut tags = self.lines(
            &["for-each-ref", "--format=%(refname:short)", "refs/tags/"],
            dir,
        )?;
        tags.sort();
        Ok(tags)
    }

    fn branch_exists(&self, dir: &Path, name: &str) -> Result<bool> {
        let refname = format!("refs/heads/{}", name);
        let output = self.run(&["show-ref", "--verify", "--quiet", &refname], Some(dir))?;
        Ok(output.status.success())
    }

    fn current_branch(&self, dir: &Path) -> Result<Option<String>> {
        let stdout = self.run_checked(&["branch", "--show-current"], Some(dir))?;
        let branch = stdout.trim();
        if branch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(branch.to_string()))
        }
    }

    fn resolve_ref(&self, dir: &Path, spec: &str) -> Result<Option<String>> {
        let peeled = format!("{}^{{commit}}", spec);
        let output = self.run(&["rev-parse", "--verify", "--quiet", &peeled], Some(dir))?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!sha.is_empty()).then_some(sha))
    }

    fn add_worktree(
        &self,
        dir: &Path,
        path: &Path,
        reference: &str,
        new_branch: Option<&str>,
        detach: bool,
    ) -> Result<()> {
        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "add"];
        if detach {
            args.push("--detach");
        }
        if let Some(branch) = new_branch {
            args.extend(["-b", branch]);
        }
        args.push(&path_str);
        args.push(reference);
        self.run_checked(&args, Some(dir)).map(|_| ())
    }

    fn remove_worktree(&self, dir: &Path, path: &Path, force: bool) -> Result<()> {
        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        self.run_checked(&args, Some(dir)).map(|_| ())
    }

    fn repair_worktrees(&self, dir: &Path) -> Result<()> {
        // linked worktrees still point at the old main checkout; naming them
        // lets git rewrite their `.git` files
        let linked: Vec<String> = self
            .list_worktrees(dir)?
            .into_iter()
            .skip(1)
            .filter(|w| w.path.exists())
            .map(|w| w.path.to_string_lossy().into_owned())
            .collect();
        let mut args = vec!["worktree", "repair"];
        args.extend(linked.iter().map(String::as_str));
        self.run_checked(&args, Some(dir)).map(|_| ())
    }

    fn is_merged(&self, dir: &Path, branch: &str, target: &str) -> Result<bool> {
        self.run_predicate(&["merge-base", "--is-ancestor", branch, target], dir)
    }

    fn ahead_behind(&self, dir: &Path, branch: &str, remote_ref: &str) -> Result<(u32, u32)> {
        let range = format!("{}...{}", branch, remote_ref);
        let stdout = self.run_checked(
            &["rev-list", "--left-right", "--count", &range, "--"],
            Some(dir),
        )?;
        parse_ahead_behind(&stdout)
    }

    fn dirty_files(&self, path: &Path) -> Result<Vec<String>> {
        let stdout = self.run_checked(
            &["status", "--porcelain=v1", "-z", "--untracked-files=no"],
            Some(path),
        )?;
        Ok(parse_status_z(&stdout))
    }

    fn untracked_files(&self, path: &Path) -> Result<Vec<String>> {
        let stdout = self.run_checked(
            &["ls-files", "--others", "--exclude-standard", "-z"],
            Some(path),
        )?;
        Ok(stdout
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn stash_count(&self, path: &Path) -> Result<u32> {
        // The stash is shared by every worktree; count the entries made on
        // the branch checked out here.
        let label = self
            .current_branch(path)?
            .unwrap_or_else(|| "(no branch)".to_string());
        let stdout = self.run_checked(&["stash", "list", "--format=%gs"], Some(path))?;
        Ok(count_stashes_on(&stdout, &label))
    }

    fn in_progress_state(&self, path: &Path) -> Result<InProgress> {
        let git_dir = self.git_dir(path)?;
        if git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists() {
            Ok(InProgress::Rebase)
        } else if git_dir.join("MERGE_HEAD").exists() {
            Ok(InProgress::Merge)
        } else {
            Ok(InProgress::None)
        }
    }

    fn remote_default_branch(&self, dir: &Path) -> Result<Option<String>> {
        let output = self.run(
            &[
                "symbolic-ref",
                "--quiet",
                "--short",
                "refs/remotes/origin/HEAD",
            ],
            Some(dir),
        )?;
        if !output.status.success() {
            return Ok(None);
        }
        let short = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(short
            .strip_prefix("origin/")
            .filter(|b| !b.is_empty())
            .map(str::to_string))
    }

    fn upstream_of(&self, dir: &Path, branch: &str) -> Result<Option<String>> {
        let refname = format!("refs/heads/{}", branch);
        let stdout = self.run_checked(
            &[
                "for-each-ref",
                "--format=%(upstream:short)%09%(upstream:track)",
                &refname,
            ],
            Some(dir),
        )?;
        Ok(parse_upstream(&stdout))
    }

    fn last_commit_time(&self, dir: &Path, reference: &str) -> Result<Option<DateTime<Local>>> {
        let stdout = self.run_checked(&["log", "-1", "--format=%ct", reference, "--"], Some(dir))?;
        let raw = stdout.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_timestamp(raw).map(Some)
    }

    fn recent_commits(
        &self,
        dir: &Path,
        reference: &str,
        count: usize,
    ) -> Result<Vec<CommitSummary>> {
        let max = format!("--max-count={}", count);
        let format = format!("--format=%h{sep}%s{sep}%ct", sep = FIELD_SEP);
        let stdout = self.run_checked(&["log", &max, &format, reference, "--"], Some(dir))?;
        stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(parse_commit_line)
            .collect()
    }

    fn toplevel(&self, dir: &Path) -> Result<PathBuf> {
        let output = self.run(&["rev-parse", "--show-toplevel"], Some(dir))?;
        if !output.status.success() {
            return Err(WorktreeError::NotARepository {
                path: dir.to_path_buf(),
            });
        }
        Ok(PathBuf::from(
            String::from_utf8_lossy(&output.stdout).trim(),
        ))
    }

    fn common_dir(&self, dir: &Path) -> Result<PathBuf> {
        let stdout = self.run_checked(&["rev-parse", "--git-common-dir"], Some(dir))?;
        let path = PathBuf::from(stdout.trim());
        Ok(if path.is_absolute() {
            path
        } else {
            dir.join(path)
        })
    }
}

/// Parse `git worktree list --porcelain` output.
///
/// Bare entries are skipped. Detached entries are keyed by directory name.
pub fn parse_worktree_list(output: &str) -> Result<Vec<WorktreeEntry>> {
    let mut entries = Vec::new();

    for block in output.split("\n\n") {
        let mut path: Option<PathBuf> = None;
        let mut head = String::new();
        let mut branch: Option<String> = None;
        let mut detached = false;
        let mut bare = false;
        let mut locked = false;

        for line in block.lines() {
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "worktree" => path = Some(PathBuf::from(value)),
                "HEAD" => head = value.to_string(),
                "branch" => {
                    branch = Some(value.strip_prefix("refs/heads/").unwrap_or(value).to_string())
                }
                "detached" => detached = true,
                "bare" => bare = true,
                "locked" => locked = true,
                _ => {}
            }
        }

        let Some(path) = path else {
            if block.trim().is_empty() {
                continue;
            }
            return Err(WorktreeError::Parse(format!(
                "worktree entry without path: {:?}",
                block
            )));
        };
        if bare {
            continue;
        }

        let branch_or_ref = match branch {
            Some(b) if !detached => b,
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| head.clone()),
        };

        entries.push(WorktreeEntry {
            branch_or_ref,
            path,
            is_detached: detached,
            head,
            locked,
        });
    }

    Ok(entries)
}

/// `<upstream>\t<track>` from for-each-ref; a `[gone]` upstream counts as none
fn parse_upstream(output: &str) -> Option<String> {
    let line = output.lines().next()?;
    let (upstream, track) = line.split_once('\t').unwrap_or((line, ""));
    let upstream = upstream.trim();
    if upstream.is_empty() || track.trim() == "[gone]" {
        return None;
    }
    Some(upstream.to_string())
}

fn parse_ahead_behind(output: &str) -> Result<(u32, u32)> {
    let mut parts = output.split_whitespace().map(str::parse::<u32>);
    match (parts.next(), parts.next()) {
        (Some(Ok(ahead)), Some(Ok(behind))) => Ok((ahead, behind)),
        _ => Err(WorktreeError::Parse(format!(
            "unexpected rev-list --count output: {:?}",
            output
        ))),
    }
}

/// Paths from `git status --porcelain=v1 -z`.
///
/// Rename and copy entries carry the original path as an extra field, which
/// is skipped.
fn parse_status_z(output: &str) -> Vec<String> {
    let mut files = Vec::new();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    while let Some(entry) = fields.next() {
        if entry.len() < 4 {
            continue;
        }
        let (code, path) = entry.split_at(3);
        files.push(path.to_string());
        if code.starts_with('R') || code.starts_with('C') {
            fields.next();
        }
    }
    files
}

fn count_stashes_on(stash_list: &str, branch: &str) -> u32 {
    let wip = format!("WIP on {}:", branch);
    let on = format!("On {}:", branch);
    stash_list
        .lines()
        .filter(|l| l.starts_with(&wip) || l.starts_with(&on))
        .count() as u32
}

fn parse_commit_line(line: &str) -> Result<CommitSummary> {
    let mut fields = line.split(FIELD_SEP);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(sha), Some(subject), Some(ts)) => Ok(CommitSummary {
            sha: sha.chars().take(7).collect(),
            subject: subject.chars().take(60).collect(),
            time: parse_timestamp(ts)?,
        }),
        _ => Err(WorktreeError::Parse(format!("bad log line: {:?}", line))),
    }
}
