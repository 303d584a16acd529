//! One logical editing session: an engine loaded once from a repository and
//! written back after every accepted mutation.

use anyhow::Context;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, error};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::model::{StatusFilter, Task, TaskEdit, TaskId};
use crate::store::{SqliteRepository, TaskRepository};

pub struct Session<R> {
    engine: Engine,
    repo: R,
}

impl<R: TaskRepository> Session<R> {
    pub fn open(mut repo: R) -> Result<Self> {
        let tasks = repo.load().map_err(Error::Load)?;
        let engine = Engine::from_tasks(tasks)?;
        debug!(count = engine.tasks().len(), "session opened");
        Ok(Self { engine, repo })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Write-through save. A failure is reported, but the in-memory state
    /// stays as mutated: it is authoritative for the rest of the session.
    fn persist(&mut self) -> Result<()> {
        self.repo.save(self.engine.tasks()).map_err(|e| {
            error!("failed to save tasks: {e:#}");
            Error::Persist(e)
        })
    }

    pub fn create_task(&mut self, name: &str, parent: Option<&str>) -> Result<Task> {
        let task = self.engine.create_task(name, parent)?;
        self.persist()?;
        Ok(task)
    }

    pub fn toggle_status(&mut self, id: TaskId) -> Result<&[Task]> {
        self.engine.toggle_status(id)?;
        self.persist()?;
        Ok(self.engine.tasks())
    }

    pub fn edit_task(&mut self, id: TaskId, edit: TaskEdit) -> Result<&[Task]> {
        self.engine.edit_task(id, edit)?;
        self.persist()?;
        Ok(self.engine.tasks())
    }

    pub fn reparent(&mut self, id: TaskId, parent: Option<TaskId>) -> Result<&[Task]> {
        self.engine.reparent(id, parent)?;
        self.persist()?;
        Ok(self.engine.tasks())
    }

    pub fn remove_task(&mut self, id: TaskId, recursive: bool) -> Result<Vec<Task>> {
        let removed = self.engine.remove_task(id, recursive)?;
        self.persist()?;
        Ok(removed)
    }

    pub fn list_tasks(&self, filter: StatusFilter, root: Option<TaskId>) -> Vec<&Task> {
        self.engine.list_tasks(filter, root)
    }
}

/// Run one mutation against the database under an exclusive write lock.
///
/// The lock (`BEGIN IMMEDIATE`) spans load, mutation and save, so concurrent
/// writers are serialised and never see each other's half-applied changes.
/// Any error rolls the database back.
pub fn transact<T>(
    conn: &Connection,
    f: impl FnOnce(&mut Session<SqliteRepository<'_>>) -> Result<T>,
) -> anyhow::Result<T> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .context("failed to acquire write lock")?;
    let out = {
        let mut session = Session::open(SqliteRepository::new(&tx))?;
        f(&mut session)?
    };
    tx.commit()?;
    Ok(out)
}

/// Load a read-only view of the stored tasks.
pub fn snapshot(conn: &Connection) -> anyhow::Result<Engine> {
    let tasks = SqliteRepository::new(conn).load()?;
    Ok(Engine::from_tasks(tasks)?)
}
