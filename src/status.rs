use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use wtr::{BranchStatus, Probe, WorktreeError, WorktreeManager, WorktreeResult};

/// JSON output structure for status command
#[derive(Debug, Serialize)]
struct StatusOutput {
    main_branch: String,
    branches: Vec<BranchInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<StatusFailure>,
}

/// A branch whose status could not be read
#[derive(Debug, Serialize)]
struct StatusFailure {
    branch: String,
    error: String,
}

/// Branch status plus where it is checked out
#[derive(Debug, Serialize)]
struct BranchInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    worktree: Option<PathBuf>,
    #[serde(flatten)]
    status: BranchStatus,
}

/// Handles the display of branch status as a table
pub struct StatusDisplay<'a> {
    statuses: &'a [BranchStatus],
    worktrees: &'a BTreeMap<String, PathBuf>,
    main_branch: &'a str,
}

impl<'a> StatusDisplay<'a> {
    pub fn new(
        statuses: &'a [BranchStatus],
        worktrees: &'a BTreeMap<String, PathBuf>,
        main_branch: &'a str,
    ) -> Self {
        Self {
            statuses,
            worktrees,
            main_branch,
        }
    }

    pub fn show(&self) {
        println!("{}", "Branches:".bright_cyan().bold());
        let branch_width = self
            .statuses
            .iter()
            .map(|s| s.branch.len())
            .max()
            .unwrap_or(10)
            .clamp(10, 40);

        for status in self.statuses {
            let name = truncate_branch(&status.branch, branch_width);
            let branch_colored = if status.branch == self.main_branch {
                name.bright_white().bold()
            } else if self.worktrees.contains_key(&status.branch) {
                name.bright_magenta()
            } else {
                name.white()
            };
            let marker = if self.worktrees.contains_key(&status.branch) {
                "●".green()
            } else {
                " ".normal()
            };

            println!(
                "  {} {:<width$}  {:<18} {:<10} {}",
                marker,
                branch_colored,
                state_label(status),
                tracking_label(status),
                age_label(status).bright_black(),
                width = branch_width
            );
        }
        self.show_summary();
    }

    fn show_summary(&self) {
        let with_worktree = self
            .statuses
            .iter()
            .filter(|s| self.worktrees.contains_key(&s.branch))
            .count();
        let dirty = self.statuses.iter().filter(|s| s.dirty.is_set()).count();

        print!("\n{}: ", "Summary".bright_cyan().bold());
        print!(
            "{} branch{}, {} with worktree",
            self.statuses.len().to_string().bright_blue().bold(),
            if self.statuses.len() == 1 { "" } else { "es" },
            with_worktree.to_string().bright_blue().bold()
        );
        if dirty > 0 {
            println!(", {} dirty", dirty.to_string().yellow().bold());
        } else {
            println!();
        }
    }
}

/// Indicator column: `clean`, `?`, or e.g. `* [+2] [S]`
fn state_label(status: &BranchStatus) -> ColoredString {
    let indicators = status.indicators();
    match status.dirty {
        Probe::Unknown => indicators.bright_black(),
        _ if indicators.is_empty() => "clean".green(),
        Probe::Known(true) => indicators.yellow().bold(),
        Probe::Known(false) => indicators.yellow(),
    }
}

fn tracking_label(status: &BranchStatus) -> ColoredString {
    match (status.ahead, status.behind) {
        (0, 0) => "".normal(),
        (a, 0) => format!("↑{}", a).green(),
        (0, b) => format!("↓{}", b).red(),
        (a, b) => format!("↑{} ↓{}", a, b).bright_red(),
    }
}

fn age_label(status: &BranchStatus) -> String {
    status
        .last_commit_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Truncate branch name to fit in column
fn truncate_branch(branch: &str, max_len: usize) -> String {
    if branch.chars().count() <= max_len {
        return branch.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }

    // keep the last path segment of slashed names when it fits
    if let Some(pos) = branch.rfind('/') {
        let suffix = &branch[pos + 1..];
        if suffix.chars().count() + 4 <= max_len {
            return format!(".../{}", suffix);
        }
    }

    let kept: String = branch.chars().take(max_len - 3).collect();
    format!("{}...", kept)
}

/// Run the status command for the given branches, or all local branches.
///
/// Returns false when some branch could not be read; the others are still
/// shown.
pub fn run_status(
    manager: &WorktreeManager,
    branches: &[String],
    json: bool,
) -> WorktreeResult<bool> {
    let branches = if branches.is_empty() {
        manager.list_local_branches()?
    } else {
        branches.to_vec()
    };
    let results = manager.status_all(&branches)?;
    let mut statuses = Vec::new();
    let mut failures = Vec::new();
    for (branch, result) in branches.into_iter().zip(results) {
        match result {
            Ok(status) => statuses.push(status),
            Err(e) => failures.push(StatusFailure {
                branch,
                error: e.to_string(),
            }),
        }
    }
    let worktrees = manager.worktree_map()?;
    let main_branch = manager.main_branch()?;
    let complete = failures.is_empty();

    if json {
        let output = StatusOutput {
            main_branch,
            branches: statuses
                .into_iter()
                .map(|status| BranchInfo {
                    worktree: worktrees.get(&status.branch).cloned(),
                    status,
                })
                .collect(),
            errors: failures,
        };
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| WorktreeError::Parse(e.to_string()))?;
        println!("{}", json_str);
    } else {
        StatusDisplay::new(&statuses, &worktrees, &main_branch).show();
        for failure in &failures {
            eprintln!(
                "{} status of {}: {}",
                "Error:".red().bold(),
                failure.branch,
                failure.error
            );
        }
    }
    Ok(complete)
}
