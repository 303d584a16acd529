use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tasktree::cli::{Cli, Command};
use tasktree::config::Config;
use tasktree::model::{ParentEdit, StatusFilter, TaskEdit};
use tasktree::{db, output, paths, session, tui, Error};

/// Install the tracing subscriber. `TASKTREE_LOG` sets the filter (invalid
/// values fall back to the default); `TASKTREE_LOG_FILE` redirects output.
/// The tree view owns the terminal, so it only ever logs to a file.
fn init_logging(interactive: bool) -> Result<()> {
    let log_file = std::env::var_os("TASKTREE_LOG_FILE").filter(|p| !p.is_empty());
    let silent = interactive && log_file.is_none();
    let filter = std::env::var("TASKTREE_LOG")
        .ok()
        .filter(|_| !silent)
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(if silent { "off" } else { "warn" }));

    let (stderr_layer, file_layer) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.to_string_lossy()))?;
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => (Some(fmt::layer().with_writer(std::io::stderr)), None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

fn open_db(db_path: &str) -> Result<Connection> {
    let conn = db::open(db_path)?;
    db::init(&conn)?;
    Ok(conn)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(matches!(cli.command, Command::Tree { .. }))?;

    let config_path = match cli.config {
        Some(p) => PathBuf::from(p),
        None => paths::default_config_path()?,
    };
    let config = Config::load_from(&config_path)?;

    let db_path = paths::resolve_db_path(cli.db)?;
    paths::ensure_parent_dir(&db_path)?;
    let conn = open_db(&db_path)?;

    match cli.command {
        Command::Add { name, parent, json } => {
            let task = session::transact(&conn, |s| s.create_task(&name, parent.as_deref()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            }
            eprintln!("Added task {} '{}'", task.display_id, task.name);
        }

        Command::Toggle { code } => {
            let task = session::transact(&conn, |s| {
                let id = s.engine().resolve(&code)?.id;
                s.toggle_status(id)?;
                Ok(s.engine().resolve(&code)?.clone())
            })?;
            eprintln!("Task {} is now {}", task.display_id, task.status);
        }

        Command::Edit {
            code,
            name,
            parent,
            root,
        } => {
            let parent = match (root, parent) {
                (true, _) => ParentEdit::Root,
                (false, Some(p)) => ParentEdit::Under(p),
                (false, None) => ParentEdit::Keep,
            };
            let task = session::transact(&conn, |s| {
                let id = s.engine().resolve(&code)?.id;
                s.edit_task(id, TaskEdit { name, parent })?;
                s.engine()
                    .get(id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(code.clone()))
            })?;
            eprintln!("Updated task {} '{}'", task.display_id, task.name);
        }

        Command::Reparent { code, parent } => {
            let task = session::transact(&conn, |s| {
                let id = s.engine().resolve(&code)?.id;
                let parent_id = match &parent {
                    Some(p) => Some(
                        s.engine()
                            .resolve(p)
                            .map_err(|_| Error::InvalidParent(p.trim().to_string()))?
                            .id,
                    ),
                    None => None,
                };
                s.reparent(id, parent_id)?;
                s.engine()
                    .get(id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(code.clone()))
            })?;
            match parent.as_deref().map(str::trim) {
                Some(p) => eprintln!("Moved '{}' under {p}, now {}", task.name, task.display_id),
                None => eprintln!("Moved '{}' to top level, now {}", task.name, task.display_id),
            }
        }

        Command::Rm { code, recursive } => {
            let removed = session::transact(&conn, |s| {
                let id = s.engine().resolve(&code)?.id;
                s.remove_task(id, recursive)
            })?;
            eprintln!("Removed {} task(s) at {code}", removed.len());
        }

        Command::Show { code, json } => {
            let engine = session::snapshot(&conn)?;
            let task = engine.resolve(&code)?;
            let parent = task.parent_id.and_then(|p| engine.get(p));
            let stats = engine.child_stats(task.id);
            if json {
                let detail = output::TaskDetail {
                    task,
                    parent_display_id: parent.map(|p| p.display_id.as_str()),
                    children: stats,
                };
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print!("{}", output::format_task_detail(task, parent, stats));
            }
        }

        Command::List {
            status,
            tree,
            root,
            json,
        } => {
            let filter = match status {
                Some(s) => StatusFilter::parse(&s)?,
                None => config.list_filter(),
            };
            let engine = session::snapshot(&conn)?;
            let root = match root.as_deref() {
                Some(code) => Some(engine.resolve(code)?.id),
                None => None,
            };
            let tasks = engine.list_tasks(filter, root);
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tree || config.list_tree() {
                print!("{}", output::format_task_tree(&tasks));
            } else {
                print!("{}", output::format_task_list(&tasks));
            }
        }

        Command::Tree {
            root,
            poll_interval,
        } => {
            let poll_interval = poll_interval.unwrap_or_else(|| config.poll_interval_ms());
            tui::run(
                &db_path,
                &conn,
                root.as_deref(),
                config.list_filter(),
                poll_interval,
            )?;
        }
    }

    Ok(())
}
