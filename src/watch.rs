use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::trace;

/// True if `event` may have changed the database named `db_filename`.
///
/// SQLite writes through `-wal`/`-shm`/`-journal` siblings, so any path whose
/// file name starts with the database name counts. Reads (access events) are
/// dropped; every reader opening the file would otherwise wake the view.
fn touches_db(event: &Event, db_filename: &str) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|p| {
        p.file_name()
            .is_some_and(|f| f.to_string_lossy().starts_with(db_filename))
    })
}

fn watch_dir_of(db_path: &Path) -> PathBuf {
    match db_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Watch the database file for writes from other processes.
/// The returned watcher must be kept alive for events to arrive.
pub fn watch_db(db_path: &str) -> Result<(RecommendedWatcher, Receiver<()>)> {
    let (tx, rx) = mpsc::channel();
    let path = Path::new(db_path);
    let db_filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if touches_db(&event, &db_filename) {
                trace!(kind = ?event.kind, "database changed");
                let _ = tx.send(());
            }
        }
    })
    .context("failed to create file watcher")?;

    let dir = watch_dir_of(path);
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;

    Ok((watcher, rx))
}

/// Returns true if a change arrived before `timeout`.
pub fn wait_for_change(rx: &Receiver<()>, timeout: Duration) -> bool {
    rx.recv_timeout(timeout).is_ok()
}

/// Collapse a burst of change events into one refresh.
pub fn drain_events(rx: &Receiver<()>) {
    while rx.try_recv().is_ok() {}
}
