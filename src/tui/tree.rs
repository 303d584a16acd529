use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use super::app::{App, FormField, Mode, TaskForm, TreeRow};
use crate::model::Status;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(frame.area());
    render_tree(frame, app, chunks[0]);
    render_status_line(frame, app, chunks[1]);

    if let Some(form) = &app.form {
        render_form(frame, form);
    } else if app.mode == Mode::Help {
        render_help(frame);
    }
}

fn status_style(status: Status) -> Style {
    match status {
        Status::InProgress => Style::default().fg(Color::Yellow),
        Status::Done => Style::default().fg(Color::Cyan),
        Status::Complete => Style::default().fg(Color::Green),
    }
}

/// Box-drawing connectors in front of a row.
pub fn tree_prefix(row: &TreeRow) -> String {
    let mut prefix = String::new();
    for d in 1..=row.depth {
        let last = row.is_last_at_depth[d];
        prefix.push_str(match (d == row.depth, last) {
            (true, true) => "└── ",
            (true, false) => "├── ",
            (false, true) => "    ",
            (false, false) => "│   ",
        });
    }
    prefix
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn row_item(app: &App, row: &TreeRow) -> ListItem<'static> {
    let collapse_indicator = match (row.has_children, app.collapsed.contains(&row.id)) {
        (false, _) => "  ",
        (true, true) => "> ",
        (true, false) => "v ",
    };
    let stats = if row.stats.total > 0 {
        format!("  [{}/{}]", row.stats.complete, row.stats.total)
    } else {
        String::new()
    };
    ListItem::new(Line::from(vec![
        Span::raw(tree_prefix(row)),
        Span::raw(collapse_indicator),
        Span::styled(format!("{} ", row.status.icon()), status_style(row.status)),
        Span::styled(format!("{} ", row.code), Style::default().fg(Color::DarkGray)),
        Span::styled(row.name.clone(), Style::default().bold()),
        Span::styled(stats, Style::default().fg(Color::DarkGray)),
    ]))
}

fn render_tree(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app.rows.iter().map(|row| row_item(app, row)).collect();
    let title = format!(" Tasks [{}] ", app.filter.label());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = ListState::default().with_selected((!app.rows.is_empty()).then_some(app.cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.error {
        Some(e) => Line::styled(format!(" {e}"), Style::default().fg(Color::Red)),
        None => Line::styled(
            " j/k:move  space:collapse  x:toggle  a/A:add  e:edit  f:filter  ?:help  q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_field(frame: &mut Frame, label: &str, value: &str, focused: bool, area: Rect) {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if focused { "_" } else { "" };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{label:<8}"), style.bold()),
            Span::styled(format!("{value}{cursor}"), style),
        ])),
        area,
    );
}

fn render_form(frame: &mut Frame, form: &TaskForm) {
    let term = frame.area();
    let width = 60.min(term.width.saturating_sub(4));
    let content_rows: u16 = 4 + u16::from(form.error.is_some());
    let height = (content_rows + 2).min(term.height.saturating_sub(2));
    let area = centered_rect(width, height, term);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(form.title())
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut constraints = vec![Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)];
    if form.error.is_some() {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Length(1));
    let chunks = Layout::vertical(constraints).split(inner);

    render_field(frame, "Name:", &form.name, form.focused == FormField::Name, chunks[0]);
    render_field(frame, "Parent:", &form.parent, form.focused == FormField::Parent, chunks[1]);

    let mut idx = 3;
    if let Some(err) = &form.error {
        frame.render_widget(
            Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red)),
            chunks[idx],
        );
        idx += 1;
    }
    frame.render_widget(
        Paragraph::new("tab:switch field  enter:save  esc:cancel  (blank parent = top level)")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[idx],
    );
}

fn render_help(frame: &mut Frame) {
    let keys = [
        ("j/k", "move down/up"),
        ("space", "expand/collapse"),
        ("x/enter", "toggle done"),
        ("a", "add child task"),
        ("A", "add top-level task"),
        ("e", "edit name/parent"),
        ("f", "cycle status filter"),
        ("?", "this help"),
        ("q/esc", "quit"),
    ];
    let term = frame.area();
    let area = centered_rect(40, keys.len() as u16 + 2, term);
    frame.render_widget(Clear, area);
    let lines: Vec<Line> = keys
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!(" {key:<9}"), Style::default().bold()),
                Span::raw(*desc),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Help ")),
        area,
    );
}
