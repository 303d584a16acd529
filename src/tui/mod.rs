mod app;
mod event;
mod tree;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use rusqlite::Connection;
use tracing::debug;

use crate::model::{StatusFilter, TaskId};
use crate::session;
use crate::watch;
use app::{App, FormKind};
use event::KeyAction;

pub fn run(
    db_path: &str,
    conn: &Connection,
    root: Option<&str>,
    filter: StatusFilter,
    poll_interval: u64,
) -> Result<()> {
    let mut app = App::new(root, filter);
    app.refresh(&session::snapshot(conn)?)?;

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, db_path, conn, poll_interval);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

/// Rebuild the view from the database. Failures (e.g. the subtree root was
/// removed by another process) are shown on the status line.
fn reload(app: &mut App, conn: &Connection) {
    let result = session::snapshot(conn).and_then(|engine| app.refresh(&engine));
    if let Err(e) = result {
        app.error = Some(format!("{e:#}"));
    }
}

fn toggle(app: &mut App, conn: &Connection, id: TaskId) {
    match session::transact(conn, |s| s.toggle_status(id).map(|_| ())) {
        Ok(()) => reload(app, conn),
        Err(e) => app.error = Some(format!("{e:#}")),
    }
}

fn submit_form(app: &mut App, conn: &Connection) {
    let Some(form) = &app.form else {
        return;
    };
    let result = match form.kind {
        FormKind::Add => {
            let name = form.name.clone();
            let parent = form.parent_code().map(str::to_string);
            session::transact(conn, |s| s.create_task(&name, parent.as_deref()).map(|_| ()))
        }
        FormKind::Edit(id) => {
            let edit = form.to_edit();
            session::transact(conn, |s| s.edit_task(id, edit).map(|_| ()))
        }
    };
    match result {
        Ok(()) => {
            app.form = None;
            reload(app, conn);
        }
        Err(e) => {
            if let Some(form) = &mut app.form {
                form.error = Some(format!("{e:#}"));
            }
        }
    }
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db_path: &str,
    conn: &Connection,
    poll_interval: u64,
) -> Result<()> {
    let poll_duration = Duration::from_millis(poll_interval);
    let (_watcher, rx) = watch::watch_db(db_path)?;

    loop {
        terminal.draw(|frame| tree::render(frame, app))?;

        if ct_event::poll(poll_duration)? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press {
                    match event::handle_key(app, key) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Refresh => reload(app, conn),
                        KeyAction::Toggle(id) => toggle(app, conn, id),
                        KeyAction::Submit => submit_form(app, conn),
                        KeyAction::Continue => {}
                    }
                }
            }
        }

        if watch::wait_for_change(&rx, Duration::ZERO) {
            watch::drain_events(&rx);
            debug!("database changed, reloading");
            reload(app, conn);
        }
    }
}
