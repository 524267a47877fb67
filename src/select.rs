//! Interactive worktree picker

mod app;
mod state;
mod ui;
mod watcher;

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::PathBuf;
use wtr::config::Config;
use wtr::{WorktreeError, WorktreeManager, WorktreeResult};

/// Run the picker. Returns the chosen worktree, or `None` when cancelled.
///
/// The TUI draws on stderr so stdout stays free for the chosen path.
pub fn run_picker(manager: &WorktreeManager, config: &Config) -> WorktreeResult<Option<PathBuf>> {
    let branches = manager.list_local_branches()?;
    let tags = manager.list_tags()?;
    let worktrees = manager.worktree_map()?;
    let base_branch = match manager.current_branch() {
        Some(b) => b.to_string(),
        None => manager.main_branch()?,
    };
    let state = state::SelectState::new(
        branches,
        tags,
        worktrees,
        manager.current_branch().map(str::to_string),
        base_branch,
        manager.options().fuzzy_threshold,
    );
    let mut app = app::App {
        manager,
        state,
        view: ui::View {
            show_status: config.ui.show_status,
            show_preview: config.ui.show_preview,
        },
        preview_count: config.ui.preview_count,
    };
    app.suggest_prune();

    let terminal_err = |e: io::Error| WorktreeError::io("terminal error", e);

    enable_raw_mode().map_err(terminal_err)?;
    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen).map_err(terminal_err)?;
    let backend = CrosstermBackend::new(stderr);
    let mut terminal = Terminal::new(backend).map_err(terminal_err)?;

    let res = app.run(&mut terminal);

    // Restore terminal (always runs, even if the loop failed)
    disable_raw_mode().map_err(terminal_err)?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).map_err(terminal_err)?;
    terminal.show_cursor().map_err(terminal_err)?;

    res.map_err(terminal_err)
}
