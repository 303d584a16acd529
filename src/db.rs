use anyhow::Result;
use rusqlite::Connection;

// parent_id is deferred: a snapshot is rewritten in id order, and a task may
// have been moved under one created after it.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY,
    display_id  TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL CHECK(length(trim(name)) > 0),
    status      TEXT NOT NULL DEFAULT 'IN_PROGRESS'
                CHECK(status IN ('IN_PROGRESS', 'DONE', 'COMPLETE')),
    parent_id   INTEGER REFERENCES tasks(id) DEFERRABLE INITIALLY DEFERRED
);

CREATE INDEX IF NOT EXISTS tasks_parent ON tasks(parent_id);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}
