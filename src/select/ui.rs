//! UI rendering for the picker

use super::state::{CreateForm, Mode, SelectState, SourceKind, format_age};
use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

/// Display switches taken from config
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub show_status: bool,
    pub show_preview: bool,
}

pub fn ui(f: &mut Frame, state: &SelectState, view: View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter
            Constraint::Min(5),    // Branches + preview
            Constraint::Length(3), // Status line
        ])
        .split(f.area());

    render_filter(f, chunks[0], state);

    if view.show_preview {
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);
        render_branches(f, main[0], state, view);
        render_preview(f, main[1], state);
    } else {
        render_branches(f, chunks[1], state, view);
    }

    render_status_line(f, chunks[2], state);

    if let Mode::Create(form) = &state.mode {
        render_create_form(f, chunks[1], form);
    }
}

fn render_filter(f: &mut Frame, area: Rect, state: &SelectState) {
    let title = format!("wtr - {} branches, {} shown", state.branches.len(), state.matches.len());
    let input = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(state.query.as_str()),
    ]))
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);
}

fn render_branches(f: &mut Frame, area: Rect, state: &SelectState, view: View) {
    let now = Local::now();
    let items: Vec<ListItem> = state
        .matches
        .iter()
        .map(|m| {
            let branch = m.candidate.as_str();
            let has_wt = state.has_worktree(branch);
            let is_current = state.current_branch.as_deref() == Some(branch);
            let marked = state.marked.contains(branch);

            let mut spans = vec![
                Span::styled(
                    if has_wt { "● " } else { "  " },
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    if marked {
                        "✓ "
                    } else if is_current {
                        "* "
                    } else {
                        "  "
                    },
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    branch.to_string(),
                    if is_current {
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                    } else if has_wt {
                        Style::default().fg(Color::Magenta)
                    } else {
                        Style::default().fg(Color::Gray)
                    },
                ),
            ];

            if view.show_status && state.status_errors.contains_key(branch) {
                spans.push(Span::styled(" !", Style::default().fg(Color::Red)));
            }
            if view.show_status
                && let Some(status) = state.statuses.get(branch)
            {
                let indicators = status.indicators();
                if !indicators.is_empty() {
                    spans.push(Span::styled(
                        format!(" {}", indicators),
                        Style::default().fg(Color::Yellow),
                    ));
                }
                if status.ahead > 0 {
                    spans.push(Span::styled(
                        format!(" ↑{}", status.ahead),
                        Style::default().fg(Color::Green),
                    ));
                }
                if status.behind > 0 {
                    spans.push(Span::styled(
                        format!(" ↓{}", status.behind),
                        Style::default().fg(Color::Red),
                    ));
                }
                if let Some(time) = status.last_commit_time {
                    spans.push(Span::styled(
                        format!(" {}", format_age(now, time)),
                        Style::default().fg(Color::Rgb(128, 128, 128)),
                    ));
                }
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Branches"))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    let mut list_state = ListState::default();
    if !state.matches.is_empty() {
        list_state.select(Some(state.cursor));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_preview(f: &mut Frame, area: Rect, state: &SelectState) {
    let now = Local::now();
    let lines: Vec<Line> = match &state.preview {
        Some((_, commits)) if commits.is_empty() => vec![Line::from("No commits")],
        Some((_, commits)) => commits
            .iter()
            .map(|c| {
                Line::from(vec![
                    Span::styled(format!("{} ", c.sha), Style::default().fg(Color::Yellow)),
                    Span::raw(c.subject.as_str()),
                    Span::styled(
                        format!(" ({})", format_age(now, c.time)),
                        Style::default().fg(Color::Rgb(128, 128, 128)),
                    ),
                ])
            })
            .collect(),
        None => Vec::new(),
    };

    let title = state
        .preview
        .as_ref()
        .map(|(branch, _)| format!("Recent commits: {}", branch))
        .unwrap_or_else(|| "Recent commits".to_string());
    let preview = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(preview, area);
}

/// Create form drawn over the branch list
fn render_create_form(f: &mut Frame, area: Rect, form: &CreateForm) {
    let area = centered(area, 60, 16);
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut tabs = Vec::new();
    for kind in SourceKind::ALL {
        let style = if kind == form.kind {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        tabs.push(Span::styled(format!(" {} ", kind.name()), style));
        tabs.push(Span::raw(" "));
    }

    let mut lines = vec![
        Line::from(vec![Span::styled("Name: ", label), Span::raw(form.name.as_str())]),
        Line::from(tabs),
        Line::from(vec![
            Span::styled(format!("{}: ", form.kind.label()), label),
            Span::raw(form.input.as_str()),
        ]),
    ];
    if form.kind != SourceKind::Branch {
        let check = if form.new_branch { "[x]" } else { "[ ]" };
        lines.push(Line::from(format!("{} Create new branch", check)));
    }
    lines.push(Line::from(""));
    for (i, suggestion) in form.suggestions.iter().enumerate() {
        let style = if form.selected == Some(i) {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(suggestion.as_str(), style)));
    }

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Create worktree"),
    );
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

/// `width` percent of `area`, at most `height` rows, centered
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = area.width * width / 100;
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn render_status_line(f: &mut Frame, area: Rect, state: &SelectState) {
    let key = |k: &'static str| {
        Span::styled(k, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    };

    let line = match &state.mode {
        Mode::Confirm { prompt, .. } => Line::from(Span::styled(
            prompt.as_str(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Mode::Create(_) if !state.message.is_empty() => Line::from(state.message.as_str()),
        Mode::Create(form) => {
            let mut spans = vec![
                key("←/→"),
                Span::raw(" source  "),
                key("↑/↓"),
                Span::raw(" suggestion  "),
            ];
            if form.kind != SourceKind::Branch {
                spans.extend([key("tab"), Span::raw(" new branch  ")]);
            }
            spans.extend([
                key("enter"),
                Span::raw(" create  "),
                key("esc"),
                Span::raw(" cancel"),
            ]);
            Line::from(spans)
        }
        Mode::Filter if !state.message.is_empty() => Line::from(state.message.as_str()),
        Mode::Filter => Line::from(vec![
            key("enter"),
            Span::raw(" select  "),
            key("tab"),
            Span::raw(" mark  "),
            key("^N"),
            Span::raw(" new  "),
            key("^D"),
            Span::raw(" delete  "),
            key("^P"),
            Span::raw(" prune  "),
            key("^R"),
            Span::raw(" refresh  "),
            key("esc"),
            Span::raw(" quit"),
        ]),
    };

    let status = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}
