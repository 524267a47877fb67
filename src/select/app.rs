//! Event loop and application orchestration

use super::state::{Action, Pending, SelectState};
use super::ui::{self, View};
use super::watcher;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Terminal;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use wtr::{CreateRequest, CreateSource, WorktreeManager};

/// Settle time after the last file system event before statuses reload
const DEBOUNCE: Duration = Duration::from_secs(1);

pub struct App<'a> {
    pub manager: &'a WorktreeManager,
    pub state: SelectState,
    pub view: View,
    pub preview_count: usize,
}

impl App<'_> {
    /// Run until the user picks a worktree (`Some`) or quits (`None`)
    pub fn run<B>(&mut self, terminal: &mut Terminal<B>) -> io::Result<Option<PathBuf>>
    where
        B: ratatui::backend::Backend,
        B::Error: Into<io::Error>,
    {
        let (tx, rx) = mpsc::channel();
        let paths: Vec<PathBuf> = self.state.worktrees.values().cloned().collect();
        let _watcher = match watcher::setup_watcher(paths.iter().map(PathBuf::as_path), tx) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("live status updates disabled: {}", e);
                None
            }
        };
        let mut last_event: Option<Instant> = None;

        loop {
            self.load_missing();
            terminal
                .draw(|f| ui::ui(f, &self.state, self.view))
                .map_err(Into::<io::Error>::into)?;

            while rx.try_recv().is_ok() {
                last_event = Some(Instant::now());
            }
            if let Some(at) = last_event
                && at.elapsed() > DEBOUNCE
            {
                log::debug!("files changed, dropping status cache");
                self.state.invalidate_statuses();
                last_event = None;
            }

            if !event::poll(Duration::from_millis(100))? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            self.state.message.clear();
            match self.state.handle_key(key) {
                Action::None => {}
                Action::Quit => return Ok(None),
                Action::Switch(path) => return Ok(Some(path)),
                Action::Refresh => {
                    self.reload();
                    self.state.message = "Refreshed".to_string();
                }
                Action::FindStale => match self.manager.find_stale() {
                    Ok(stale) => self.state.offer_prune(&stale),
                    Err(e) => self.state.message = format!("Error: {}", e),
                },
                Action::Create(request) => {
                    if let Some(path) = self.request_create(request) {
                        return Ok(Some(path));
                    }
                }
                Action::Execute(Pending::Create(request)) => {
                    if let Some(path) = self.create(request) {
                        return Ok(Some(path));
                    }
                }
                Action::Execute(Pending::Delete(branches)) => self.prune(&branches, "Deleted"),
                Action::Execute(Pending::Prune(branches)) => self.prune(&branches, "Pruned"),
            }
        }
    }

    /// Startup hint when stale worktrees exist
    pub fn suggest_prune(&mut self) {
        if !self.manager.options().prune_auto_suggest {
            return;
        }
        match self.manager.find_stale() {
            Ok(stale) if !stale.is_empty() => {
                self.state.message = format!(
                    "{} stale worktree(s), press Ctrl-P to prune",
                    stale.len()
                );
            }
            Ok(_) => {}
            Err(e) => log::debug!("stale check failed: {}", e),
        }
    }

    fn load_missing(&mut self) {
        if self.view.show_status {
            let missing = self.state.missing_statuses();
            if !missing.is_empty() {
                match self.manager.status_all(&missing) {
                    Ok(results) => {
                        for (branch, result) in missing.into_iter().zip(results) {
                            match result {
                                Ok(status) => self.state.set_status(status),
                                Err(e) => self.state.set_status_error(branch, e.to_string()),
                            }
                        }
                    }
                    Err(e) => {
                        for branch in missing {
                            self.state.set_status_error(branch, e.to_string());
                        }
                    }
                }
            }
        }

        if self.view.show_preview
            && let Some(branch) = self.state.preview_needed().map(str::to_string)
        {
            let commits = self
                .manager
                .recent_commits(&branch, self.preview_count)
                .unwrap_or_else(|e| {
                    log::debug!("preview for {} failed: {}", branch, e);
                    Vec::new()
                });
            self.state.preview = Some((branch, commits));
        }
    }

    fn reload(&mut self) {
        let lists = self.manager.list_local_branches().and_then(|b| {
            Ok((b, self.manager.list_tags()?, self.manager.worktree_map()?))
        });
        match lists {
            Ok((branches, tags, worktrees)) => self.state.reload(branches, tags, worktrees),
            Err(e) => self.state.message = format!("Refresh error: {}", e),
        }
    }

    /// Create right away, unless a new branch would silently leave the
    /// base's uncommitted changes behind
    fn request_create(&mut self, request: CreateRequest) -> Option<PathBuf> {
        let new_branch_base = match &request.source {
            CreateSource::Branch { base: Some(base) }
                if !self.state.branches.contains(&request.name) =>
            {
                Some(base.clone())
            }
            _ => None,
        };
        if let Some(base) = new_branch_base {
            match self.manager.uncommitted_files(&base) {
                Ok(files) if !files.is_empty() => {
                    self.state.confirm_dirty_base(request, &base, &files);
                    return None;
                }
                Ok(_) => {}
                Err(e) => log::debug!("uncommitted check on {} failed: {}", base, e),
            }
        }
        self.create(request)
    }

    fn create(&mut self, request: CreateRequest) -> Option<PathBuf> {
        let name = request.name.clone();
        match self.manager.create_worktree(request) {
            Ok(created) => {
                log::info!("created worktree {}", created.path.display());
                for warning in &created.warnings {
                    log::warn!("{}", warning);
                }
                Some(created.path)
            }
            Err(e) => {
                self.state.message = format!("Error creating {}: {}", name, e);
                None
            }
        }
    }

    fn prune(&mut self, branches: &[String], verb: &str) {
        let result = self.manager.prune(branches);
        self.reload();
        self.state.message = match result {
            Ok(report) if report.is_partial_failure() => {
                let errors: Vec<String> = report
                    .failed()
                    .filter_map(|o| o.result.as_ref().err().map(|e| format!("{}: {}", o.branch, e)))
                    .collect();
                format!(
                    "{} {}, errors: {}",
                    verb,
                    report.succeeded().count(),
                    errors.join("; ")
                )
            }
            Ok(report) => format!("{} {} worktree(s)", verb, report.succeeded().count()),
            Err(e) => format!("Error: {}", e),
        };
    }
}
