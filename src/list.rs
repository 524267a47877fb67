//! `wtr list`: one `branch<TAB>path` line per worktree

use serde::Serialize;
use std::path::PathBuf;
use wtr::{WorktreeManager, WorktreeResult};

/// JSON output row for list command
#[derive(Debug, Serialize)]
struct ListEntry {
    branch: String,
    path: PathBuf,
    detached: bool,
    locked: bool,
}

pub fn run_list(manager: &WorktreeManager, json: bool) -> WorktreeResult<()> {
    let mut entries: Vec<ListEntry> = manager
        .worktrees()?
        .into_iter()
        .map(|w| ListEntry {
            branch: w.branch_or_ref,
            path: w.path,
            detached: w.is_detached,
            locked: w.locked,
        })
        .collect();
    entries.sort_by(|a, b| a.branch.cmp(&b.branch));

    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| wtr::WorktreeError::Parse(e.to_string()))?;
        println!("{}", out);
    } else {
        for entry in &entries {
            println!("{}", format_line(&entry.branch, &entry.path));
        }
    }
    Ok(())
}

fn format_line(branch: &str, path: &std::path::Path) -> String {
    format!("{}\t{}", branch, path.display())
}
