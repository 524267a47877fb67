//! Application state for the picker
//!
//! Key handling is pure: [`SelectState::handle_key`] updates the filter,
//! cursor, marks and create form, and returns an [`Action`] for the event
//! loop to carry out against the engine.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use wtr::fuzzy::{self, FuzzyMatch};
use wtr::{BranchStatus, CommitSummary, CreateRequest, CreateSource, StaleWorktree};

/// Suggestions shown under the create form input
const MAX_SUGGESTIONS: usize = 10;

/// Something that needs a yes/no before it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Delete(Vec<String>),
    Prune(Vec<String>),
    Create(CreateRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Filter,
    Confirm { prompt: String, pending: Pending },
    Create(CreateForm),
}

/// What a worktree created from the form starts at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Branch,
    Commit,
    Tag,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Branch, SourceKind::Commit, SourceKind::Tag];

    fn next(self) -> Self {
        match self {
            SourceKind::Branch => SourceKind::Commit,
            SourceKind::Commit => SourceKind::Tag,
            SourceKind::Tag => SourceKind::Branch,
        }
    }

    fn prev(self) -> Self {
        self.next().next()
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Branch => "Branch",
            SourceKind::Commit => "Commit",
            SourceKind::Tag => "Tag",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Branch => "Base branch",
            SourceKind::Commit => "Commit SHA",
            SourceKind::Tag => "Tag",
        }
    }
}

/// Create-worktree form opened with Ctrl-N
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateForm {
    pub name: String,
    pub kind: SourceKind,
    pub input: String,
    /// Branch off the commit or tag instead of a detached checkout
    pub new_branch: bool,
    pub suggestions: Vec<String>,
    pub selected: Option<usize>,
}

impl CreateForm {
    /// The request for the current input, or `None` while it is empty
    pub fn request(&self) -> Option<CreateRequest> {
        let value = match self.selected {
            Some(i) => self.suggestions.get(i)?.clone(),
            None => self.input.trim().to_string(),
        };
        if value.is_empty() {
            return None;
        }
        let source = match self.kind {
            SourceKind::Branch => CreateSource::Branch { base: Some(value) },
            SourceKind::Commit | SourceKind::Tag => CreateSource::Commit {
                commit: value,
                new_branch: self.new_branch,
            },
        };
        Some(CreateRequest {
            name: self.name.clone(),
            source,
        })
    }
}

/// What the event loop should do after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Switch(PathBuf),
    /// Create a worktree, checking the base for uncommitted changes first
    Create(CreateRequest),
    Refresh,
    FindStale,
    Execute(Pending),
}

pub struct SelectState {
    pub branches: Vec<String>,
    pub tags: Vec<String>,
    pub worktrees: BTreeMap<String, PathBuf>,
    pub current_branch: Option<String>,
    /// Base for branches created from the picker
    pub base_branch: String,
    pub query: String,
    pub matches: Vec<FuzzyMatch>,
    pub cursor: usize,
    pub marked: BTreeSet<String>,
    pub statuses: HashMap<String, BranchStatus>,
    /// Branches whose status failed to resolve, with the error
    pub status_errors: HashMap<String, String>,
    pub preview: Option<(String, Vec<CommitSummary>)>,
    pub message: String,
    pub mode: Mode,
    threshold: u8,
}

impl SelectState {
    pub fn new(
        branches: Vec<String>,
        tags: Vec<String>,
        worktrees: BTreeMap<String, PathBuf>,
        current_branch: Option<String>,
        base_branch: String,
        threshold: u8,
    ) -> Self {
        let mut state = Self {
            branches,
            tags,
            worktrees,
            current_branch,
            base_branch,
            query: String::new(),
            matches: Vec::new(),
            cursor: 0,
            marked: BTreeSet::new(),
            statuses: HashMap::new(),
            status_errors: HashMap::new(),
            preview: None,
            message: String::new(),
            mode: Mode::Filter,
            threshold,
        };
        state.refilter();
        state
    }

    /// Replace branch and worktree lists after a change, keeping the filter
    pub fn reload(
        &mut self,
        branches: Vec<String>,
        tags: Vec<String>,
        worktrees: BTreeMap<String, PathBuf>,
    ) {
        self.branches = branches;
        self.tags = tags;
        self.worktrees = worktrees;
        self.marked.retain(|b| self.worktrees.contains_key(b));
        self.invalidate_statuses();
        let keep = self.highlighted().map(str::to_string);
        self.refilter();
        if let Some(pos) = keep.and_then(|b| self.matches.iter().position(|m| m.candidate == b)) {
            self.cursor = pos;
        }
    }

    pub fn invalidate_statuses(&mut self) {
        self.statuses.clear();
        self.status_errors.clear();
        self.preview = None;
    }

    /// Visible branches with neither a cached status nor a cached failure
    pub fn missing_statuses(&self) -> Vec<String> {
        self.matches
            .iter()
            .filter(|m| {
                !self.statuses.contains_key(&m.candidate)
                    && !self.status_errors.contains_key(&m.candidate)
            })
            .map(|m| m.candidate.clone())
            .collect()
    }

    pub fn set_status(&mut self, status: BranchStatus) {
        self.status_errors.remove(&status.branch);
        self.statuses.insert(status.branch.clone(), status);
    }

    /// Remember a failure until the next invalidation so it is not retried
    /// on every redraw
    pub fn set_status_error(&mut self, branch: String, error: String) {
        self.message = format!("Status error for {}: {}", branch, error);
        self.status_errors.insert(branch, error);
    }

    /// Branch whose preview should be shown but is not loaded
    pub fn preview_needed(&self) -> Option<&str> {
        let branch = self.highlighted()?;
        match &self.preview {
            Some((loaded, _)) if loaded == branch => None,
            _ => Some(branch),
        }
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.matches.get(self.cursor).map(|m| m.candidate.as_str())
    }

    pub fn has_worktree(&self, branch: &str) -> bool {
        self.worktrees.contains_key(branch)
    }

    /// Ask for confirmation before pruning stale worktrees
    pub fn offer_prune(&mut self, stale: &[StaleWorktree]) {
        if stale.is_empty() {
            self.message = "No stale worktrees found".to_string();
            return;
        }
        let names: Vec<String> = stale.iter().map(|s| s.branch.clone()).collect();
        let labels: Vec<String> = stale
            .iter()
            .map(|s| format!("{} ({})", s.branch, s.reason))
            .collect();
        self.mode = Mode::Confirm {
            prompt: format!("Prune {}? [y/N]", describe(&labels)),
            pending: Pending::Prune(names),
        };
    }

    /// Ask before branching off a base with uncommitted changes
    pub fn confirm_dirty_base(
        &mut self,
        request: CreateRequest,
        base: &str,
        uncommitted: &[String],
    ) {
        self.mode = Mode::Confirm {
            prompt: format!(
                "{} has {} uncommitted file(s) that will not be carried over. \
                 Create {} anyway? [y/N]",
                base,
                uncommitted.len(),
                request.name
            ),
            pending: Pending::Create(request),
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match self.mode {
            Mode::Confirm { .. } => return self.handle_confirm_key(key),
            Mode::Create(_) => return self.handle_create_key(key),
            Mode::Filter => {}
        }

        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('r') if ctrl => Action::Refresh,
            KeyCode::Char('p') if ctrl => Action::FindStale,
            KeyCode::Char('d') if ctrl => {
                self.request_delete();
                Action::None
            }
            KeyCode::Char('n') if ctrl => {
                self.open_create();
                Action::None
            }
            KeyCode::Char(c) if !ctrl => {
                self.query.push(c);
                self.refilter();
                Action::None
            }
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.refilter();
                }
                Action::None
            }
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                Action::None
            }
            KeyCode::Down => {
                if self.cursor + 1 < self.matches.len() {
                    self.cursor += 1;
                }
                Action::None
            }
            KeyCode::Tab => {
                self.toggle_mark();
                Action::None
            }
            KeyCode::Enter => self.enter(),
            _ => Action::None,
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Action {
        let mode = std::mem::replace(&mut self.mode, Mode::Filter);
        let Mode::Confirm { pending, .. } = mode else {
            return Action::None;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Action::Execute(pending),
            _ => {
                self.message = "Cancelled".to_string();
                Action::None
            }
        }
    }

    fn handle_create_key(&mut self, key: KeyEvent) -> Action {
        let mode = std::mem::replace(&mut self.mode, Mode::Filter);
        let Mode::Create(mut form) = mode else {
            return Action::None;
        };
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => {
                self.message = "Cancelled".to_string();
                return Action::None;
            }
            KeyCode::Enter => match form.request() {
                Some(request) => return Action::Create(request),
                None => self.message = format!("{} is empty", form.kind.label()),
            },
            KeyCode::Left => {
                let kind = form.kind.prev();
                self.switch_kind(&mut form, kind);
            }
            KeyCode::Right => {
                let kind = form.kind.next();
                self.switch_kind(&mut form, kind);
            }
            KeyCode::Tab if form.kind != SourceKind::Branch => {
                form.new_branch = !form.new_branch;
            }
            KeyCode::Up => form.selected = form.selected.and_then(|i| i.checked_sub(1)),
            KeyCode::Down => {
                let next = form.selected.map_or(0, |i| i + 1);
                if next < form.suggestions.len() {
                    form.selected = Some(next);
                }
            }
            KeyCode::Char(c) if !ctrl => {
                form.input.push(c);
                self.suggest(&mut form);
            }
            KeyCode::Backspace => {
                if form.input.pop().is_some() {
                    self.suggest(&mut form);
                }
            }
            _ => {}
        }
        self.mode = Mode::Create(form);
        Action::None
    }

    /// Open the create form for the highlighted branch without a worktree,
    /// or for the typed name
    fn open_create(&mut self) {
        let name = match self.highlighted() {
            Some(branch) if !self.has_worktree(branch) => branch.to_string(),
            _ => self.query.trim().to_string(),
        };
        if name.is_empty() {
            self.message = "Type a name for the new worktree".to_string();
            return;
        }
        let mut form = CreateForm {
            name,
            kind: SourceKind::Branch,
            input: String::new(),
            new_branch: false,
            suggestions: Vec::new(),
            selected: None,
        };
        self.switch_kind(&mut form, SourceKind::Branch);
        self.mode = Mode::Create(form);
    }

    fn switch_kind(&self, form: &mut CreateForm, kind: SourceKind) {
        form.kind = kind;
        form.input = match kind {
            SourceKind::Branch => self.base_branch.clone(),
            SourceKind::Commit | SourceKind::Tag => String::new(),
        };
        form.new_branch = false;
        self.suggest(form);
    }

    /// Fuzzy-filtered branches or tags for the form input; none for commits
    fn suggest(&self, form: &mut CreateForm) {
        let pool: &[String] = match form.kind {
            SourceKind::Branch => &self.branches,
            SourceKind::Tag => &self.tags,
            SourceKind::Commit => &[],
        };
        form.suggestions = fuzzy::fuzzy_match(pool, &form.input, self.threshold);
        form.suggestions.truncate(MAX_SUGGESTIONS);
        form.selected = None;
    }

    /// New worktree for `name` based on the launch branch
    fn quick_create(&self, name: &str) -> Action {
        Action::Create(CreateRequest {
            name: name.to_string(),
            source: CreateSource::Branch {
                base: Some(self.base_branch.clone()),
            },
        })
    }

    fn enter(&mut self) -> Action {
        if let Some(branch) = self.highlighted() {
            return match self.worktrees.get(branch) {
                Some(path) => Action::Switch(path.clone()),
                None => self.quick_create(branch),
            };
        }
        let name = self.query.trim();
        if name.is_empty() {
            Action::None
        } else {
            self.quick_create(name)
        }
    }

    fn toggle_mark(&mut self) {
        let Some(branch) = self.highlighted().map(str::to_string) else {
            return;
        };
        if !self.marked.remove(&branch) {
            self.marked.insert(branch);
        }
        if self.cursor + 1 < self.matches.len() {
            self.cursor += 1;
        }
    }

    /// Marked worktrees, or the highlighted one when nothing is marked
    pub fn delete_targets(&self) -> Vec<String> {
        if self.marked.is_empty() {
            return self
                .highlighted()
                .filter(|b| self.has_worktree(b))
                .map(|b| vec![b.to_string()])
                .unwrap_or_default();
        }
        self.marked
            .iter()
            .filter(|b| self.has_worktree(b))
            .cloned()
            .collect()
    }

    fn request_delete(&mut self) {
        let targets = self.delete_targets();
        if targets.is_empty() {
            self.message = "No worktree to delete".to_string();
            return;
        }
        self.mode = Mode::Confirm {
            prompt: format!("Delete worktree {}? [y/N]", describe(&targets)),
            pending: Pending::Delete(targets),
        };
    }

    fn refilter(&mut self) {
        self.matches = fuzzy::filter(&self.branches, &self.query, self.threshold);
        if self.cursor >= self.matches.len() {
            self.cursor = self.matches.len().saturating_sub(1);
        }
        if !self.query.is_empty() {
            self.cursor = 0;
        }
    }
}

fn describe(items: &[String]) -> String {
    match items {
        [one] => format!("'{}'", one),
        many => format!("{} worktrees: {}", many.len(), many.join(", ")),
    }
}

/// Relative age: `now`, `5m`, `3h`, `2d`
pub fn format_age(now: DateTime<Local>, then: DateTime<Local>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    match seconds {
        s if s < 60 => "now".to_string(),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn state() -> SelectState {
        let branches = ["ENS-325", "feature-a", "feature-b", "main"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let worktrees = BTreeMap::from([
            ("main".to_string(), PathBuf::from("/w/main")),
            ("feature-b".to_string(), PathBuf::from("/w/feature-b")),
        ]);
        let tags = vec!["v1.0.0".to_string(), "v1.1.0".to_string(), "v2.0.0".to_string()];
        SelectState::new(
            branches,
            tags,
            worktrees,
            Some("main".into()),
            "main".into(),
            95,
        )
    }

    fn from_main(name: &str) -> Action {
        Action::Create(CreateRequest {
            name: name.into(),
            source: CreateSource::Branch {
                base: Some("main".into()),
            },
        })
    }

    fn form(s: &SelectState) -> &CreateForm {
        match &s.mode {
            Mode::Create(form) => form,
            other => panic!("expected create form, got {other:?}"),
        }
    }

    fn type_str(state: &mut SelectState, text: &str) {
        for c in text.chars() {
            state.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn typing_filters_and_backspace_restores() {
        let mut s = state();
        assert_eq!(s.matches.len(), 4);

        type_str(&mut s, "325");
        assert_eq!(s.matches.len(), 1);
        assert_eq!(s.highlighted(), Some("ENS-325"));

        for _ in 0..3 {
            s.handle_key(key(KeyCode::Backspace));
        }
        assert_eq!(s.matches.len(), 4);
    }

    #[test]
    fn enter_switches_to_existing_worktree() {
        let mut s = state();
        type_str(&mut s, "feature-b");
        assert_eq!(
            s.handle_key(key(KeyCode::Enter)),
            Action::Switch(PathBuf::from("/w/feature-b"))
        );
    }

    #[test]
    fn enter_creates_for_branch_without_worktree() {
        let mut s = state();
        type_str(&mut s, "feature-a");
        assert_eq!(s.handle_key(key(KeyCode::Enter)), from_main("feature-a"));
    }

    #[test]
    fn enter_on_unmatched_query_creates_new_name() {
        let mut s = state();
        type_str(&mut s, "brand-new");
        assert!(s.matches.is_empty());
        assert_eq!(s.handle_key(key(KeyCode::Enter)), from_main("brand-new"));
    }

    #[test]
    fn cursor_is_clamped() {
        let mut s = state();
        s.handle_key(key(KeyCode::Up));
        assert_eq!(s.cursor, 0);
        for _ in 0..10 {
            s.handle_key(key(KeyCode::Down));
        }
        assert_eq!(s.cursor, 3);
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut s = state();
        type_str(&mut s, "feature-b");
        assert_eq!(s.handle_key(ctrl('d')), Action::None);
        assert!(matches!(s.mode, Mode::Confirm { .. }));

        assert_eq!(
            s.handle_key(key(KeyCode::Char('y'))),
            Action::Execute(Pending::Delete(vec!["feature-b".into()]))
        );
        assert_eq!(s.mode, Mode::Filter);
    }

    #[test]
    fn declining_cancels() {
        let mut s = state();
        type_str(&mut s, "feature-b");
        s.handle_key(ctrl('d'));
        assert_eq!(s.handle_key(key(KeyCode::Char('n'))), Action::None);
        assert_eq!(s.mode, Mode::Filter);
        assert_eq!(s.message, "Cancelled");
    }

    #[test]
    fn multi_select_deletes_only_marked_worktrees() {
        let mut s = state();
        // rows: ENS-325, feature-a, feature-b, main
        s.handle_key(key(KeyCode::Tab));
        s.handle_key(key(KeyCode::Tab));
        s.handle_key(key(KeyCode::Tab));
        assert_eq!(s.marked.len(), 3);
        assert_eq!(s.delete_targets(), ["feature-b"]);
    }

    #[test]
    fn delete_without_worktree_reports() {
        let mut s = state();
        type_str(&mut s, "325");
        s.handle_key(ctrl('d'));
        assert_eq!(s.mode, Mode::Filter);
        assert_eq!(s.message, "No worktree to delete");
    }

    #[test]
    fn control_keys_map_to_actions() {
        let mut s = state();
        assert_eq!(s.handle_key(ctrl('r')), Action::Refresh);
        assert_eq!(s.handle_key(ctrl('p')), Action::FindStale);
        assert_eq!(s.handle_key(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(s.handle_key(ctrl('c')), Action::Quit);
        assert!(s.query.is_empty());
    }

    #[test]
    fn reload_drops_cache_and_stale_marks() {
        let mut s = state();
        s.marked.insert("feature-b".into());
        s.statuses.insert(
            "main".into(),
            BranchStatus {
                branch: "main".into(),
                dirty: wtr::Probe::Known(false),
                untracked_count: wtr::Probe::Known(0),
                ahead: 0,
                behind: 0,
                last_commit_time: None,
                has_stash: wtr::Probe::Known(false),
                rebase_in_progress: wtr::Probe::Known(false),
                merge_in_progress: wtr::Probe::Known(false),
            },
        );

        let worktrees = BTreeMap::from([("main".to_string(), PathBuf::from("/w/main"))]);
        s.reload(s.branches.clone(), s.tags.clone(), worktrees);

        assert!(s.statuses.is_empty());
        assert!(s.marked.is_empty());
        assert_eq!(s.missing_statuses().len(), 4);
    }

    #[test]
    fn failed_status_is_not_retried_until_invalidated() {
        let mut s = state();
        s.set_status_error("ENS-325".into(), "bad revision".into());

        assert!(!s.missing_statuses().contains(&"ENS-325".to_string()));
        assert_eq!(s.missing_statuses().len(), 3);
        assert!(s.message.contains("ENS-325"));

        s.invalidate_statuses();
        assert_eq!(s.missing_statuses().len(), 4);
    }

    #[test]
    fn create_form_defaults_to_launch_branch() {
        let mut s = state();
        type_str(&mut s, "brand-new");
        s.handle_key(ctrl('n'));

        let f = form(&s);
        assert_eq!(f.name, "brand-new");
        assert_eq!(f.kind, SourceKind::Branch);
        assert_eq!(f.input, "main");
        assert_eq!(f.suggestions, ["main"]);
        assert_eq!(s.handle_key(key(KeyCode::Enter)), from_main("brand-new"));
        assert_eq!(s.mode, Mode::Filter);
    }

    #[test]
    fn create_form_picks_another_base_branch() {
        let mut s = state();
        type_str(&mut s, "feature-a");
        s.handle_key(ctrl('n'));
        assert_eq!(form(&s).name, "feature-a");

        for _ in 0..4 {
            s.handle_key(key(KeyCode::Backspace));
        }
        type_str(&mut s, "fb");
        assert_eq!(form(&s).suggestions, ["feature-b"]);
        s.handle_key(key(KeyCode::Down));

        assert_eq!(
            s.handle_key(key(KeyCode::Enter)),
            Action::Create(CreateRequest {
                name: "feature-a".into(),
                source: CreateSource::Branch {
                    base: Some("feature-b".into())
                },
            })
        );
    }

    #[test]
    fn create_form_filters_tags() {
        let mut s = state();
        type_str(&mut s, "release");
        s.handle_key(ctrl('n'));
        s.handle_key(key(KeyCode::Right));
        s.handle_key(key(KeyCode::Right));

        let f = form(&s);
        assert_eq!(f.kind, SourceKind::Tag);
        assert!(f.input.is_empty());
        assert_eq!(f.suggestions.len(), 3);

        type_str(&mut s, "v1.");
        assert_eq!(form(&s).suggestions, ["v1.0.0", "v1.1.0"]);
        s.handle_key(key(KeyCode::Down));
        s.handle_key(key(KeyCode::Down));
        s.handle_key(key(KeyCode::Tab));

        assert_eq!(
            s.handle_key(key(KeyCode::Enter)),
            Action::Create(CreateRequest {
                name: "release".into(),
                source: CreateSource::Commit {
                    commit: "v1.1.0".into(),
                    new_branch: true,
                },
            })
        );
    }

    #[test]
    fn create_form_commit_mode_takes_typed_sha() {
        let mut s = state();
        type_str(&mut s, "hotfix");
        s.handle_key(ctrl('n'));
        s.handle_key(key(KeyCode::Left));
        s.handle_key(key(KeyCode::Left));
        assert_eq!(form(&s).kind, SourceKind::Commit);

        assert_eq!(s.handle_key(key(KeyCode::Enter)), Action::None);
        assert_eq!(s.message, "Commit SHA is empty");
        assert!(matches!(s.mode, Mode::Create(_)));

        type_str(&mut s, "abc1234");
        assert!(form(&s).suggestions.is_empty());
        assert_eq!(
            s.handle_key(key(KeyCode::Enter)),
            Action::Create(CreateRequest {
                name: "hotfix".into(),
                source: CreateSource::Commit {
                    commit: "abc1234".into(),
                    new_branch: false,
                },
            })
        );
    }

    #[test]
    fn create_form_needs_a_name_and_escape_cancels() {
        let mut s = state();
        // highlighted row is ENS-325, which has no worktree
        s.handle_key(ctrl('n'));
        assert_eq!(form(&s).name, "ENS-325");
        assert_eq!(s.handle_key(key(KeyCode::Esc)), Action::None);
        assert_eq!(s.mode, Mode::Filter);
        assert_eq!(s.message, "Cancelled");

        // main already has a worktree and nothing is typed
        s.cursor = 3;
        s.handle_key(ctrl('n'));
        assert_eq!(s.mode, Mode::Filter);
        assert_eq!(s.message, "Type a name for the new worktree");
    }

    #[test]
    fn ages_are_compact() {
        let now = Local::now();
        assert_eq!(format_age(now, now - Duration::seconds(10)), "now");
        assert_eq!(format_age(now, now - Duration::minutes(5)), "5m");
        assert_eq!(format_age(now, now - Duration::hours(3)), "3h");
        assert_eq!(format_age(now, now - Duration::days(2)), "2d");
        assert_eq!(format_age(now, now + Duration::minutes(1)), "now");
    }
}
