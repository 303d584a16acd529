//! Snapshot persistence for the task collection.
//!
//! The engine never talks to storage directly. A `Session` loads the whole
//! collection once and hands the whole collection back after every accepted
//! mutation.

use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;

use crate::model::{Status, Task, TaskId};

pub trait TaskRepository {
    fn load(&mut self) -> Result<Vec<Task>>;
    fn save(&mut self, tasks: &[Task]) -> Result<()>;
}

impl ToSql for TaskId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let id = i64::try_from(self.0)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(id))
    }
}

impl FromSql for TaskId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let id = i64::column_result(value)?;
        u64::try_from(id)
            .map(TaskId)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            "COMPLETE" => Ok(Status::Complete),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

const SELECT_TASKS: &str = "
SELECT id, display_id, name, status, parent_id
FROM tasks
ORDER BY id
";

const INSERT_TASK: &str = "
INSERT INTO tasks (id, display_id, name, status, parent_id)
VALUES (?1, ?2, ?3, ?4, ?5)
";

fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        display_id: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        parent_id: row.get(4)?,
    })
}

/// Tasks stored in the `tasks` table of a SQLite database (see `db`).
pub struct SqliteRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

fn write_snapshot(conn: &Connection, tasks: &[Task]) -> Result<()> {
    conn.execute("DELETE FROM tasks", [])?;
    let mut stmt = conn.prepare_cached(INSERT_TASK)?;
    for task in tasks {
        stmt.execute(rusqlite::params![
            task.id,
            task.display_id,
            task.name,
            task.status,
            task.parent_id
        ])?;
    }
    Ok(())
}

impl TaskRepository for SqliteRepository<'_> {
    fn load(&mut self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(SELECT_TASKS)?;
        let rows = stmt.query_map([], read_task_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read tasks")
    }

    /// Replace the stored snapshot. Runs inside a savepoint so it composes
    /// with an enclosing write transaction and never leaves half a snapshot.
    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        self.conn.execute_batch("SAVEPOINT save_tasks")?;
        let result = write_snapshot(self.conn, tasks)
            .and_then(|()| Ok(self.conn.execute_batch("RELEASE save_tasks")?));
        if result.is_err() {
            let _ = self
                .conn
                .execute_batch("ROLLBACK TO save_tasks; RELEASE save_tasks");
        }
        result.context("failed to write tasks")
    }
}

/// In-memory repository for embedding and tests. Saves can be made to fail
/// to exercise the write-through error path.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tasks: Vec<Task>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryRepository {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// The last successfully saved snapshot.
    pub fn stored(&self) -> &[Task] {
        &self.tasks
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl TaskRepository for MemoryRepository {
    fn load(&mut self) -> Result<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("storage unavailable");
        }
        self.tasks = tasks.to_vec();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn task(id: u64, code: &str, parent: Option<u64>, status: Status) -> Task {
        Task {
            id: TaskId(id),
            display_id: code.to_string(),
            name: format!("task {id}"),
            status,
            parent_id: parent.map(TaskId),
        }
    }

    #[test]
    fn empty_database_loads_nothing() {
        let conn = db::open_memory().unwrap();
        assert!(SqliteRepository::new(&conn).load().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let conn = db::open_memory().unwrap();
        let tasks = vec![
            task(1, "1", None, Status::Done),
            task(2, "1.1", Some(1), Status::Complete),
            task(3, "2", None, Status::InProgress),
        ];
        let mut repo = SqliteRepository::new(&conn);
        repo.save(&tasks).unwrap();
        assert_eq!(repo.load().unwrap(), tasks);
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let conn = db::open_memory().unwrap();
        let mut repo = SqliteRepository::new(&conn);
        repo.save(&[task(1, "1", None, Status::InProgress), task(2, "2", None, Status::InProgress)])
            .unwrap();
        repo.save(&[task(2, "1", None, Status::Done)]).unwrap();
        let loaded = repo.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, TaskId(2));
        assert_eq!(loaded[0].display_id, "1");
    }

    #[test]
    fn parent_created_after_child_is_accepted() {
        // Task 1 was moved under task 2, which has a larger id.
        let conn = db::open_memory().unwrap();
        let mut repo = SqliteRepository::new(&conn);
        let tasks = vec![
            task(1, "1.1", Some(2), Status::InProgress),
            task(2, "1", None, Status::InProgress),
        ];
        repo.save(&tasks).unwrap();
        assert_eq!(repo.load().unwrap().len(), 2);
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let conn = db::open_memory().unwrap();
        let mut repo = SqliteRepository::new(&conn);
        let good = vec![task(1, "1", None, Status::InProgress)];
        repo.save(&good).unwrap();
        // duplicate display ids violate the UNIQUE constraint
        let bad = vec![
            task(1, "1", None, Status::InProgress),
            task(2, "1", None, Status::InProgress),
        ];
        assert!(repo.save(&bad).is_err());
        assert_eq!(repo.load().unwrap(), good);
    }

    #[test]
    fn unknown_status_is_a_load_error() {
        let conn = db::open_memory().unwrap();
        conn.execute_batch("PRAGMA ignore_check_constraints = ON").unwrap();
        conn.execute(
            "INSERT INTO tasks (id, display_id, name, status) VALUES (1, '1', 'x', 'PAUSED')",
            [],
        )
        .unwrap();
        assert!(SqliteRepository::new(&conn).load().is_err());
    }

    #[test]
    fn memory_repository_can_fail() {
        let mut repo = MemoryRepository::default();
        repo.save(&[task(1, "1", None, Status::InProgress)]).unwrap();
        repo.fail_saves(true);
        assert!(repo.save(&[]).is_err());
        assert_eq!(repo.stored().len(), 1);
        assert_eq!(repo.save_count(), 1);
    }
}
