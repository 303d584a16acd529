//! Rejections reported by the task engine.
//!
//! Every variant refuses a single operation; none leaves a partial mutation
//! behind and none is fatal to the session. `Persist` is the one exception to
//! "nothing changed": the in-memory mutation stands, only the save failed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("task name must not be empty")]
    EmptyName,

    #[error("parent task '{0}' does not exist")]
    InvalidParent(String),

    #[error("a task cannot be its own parent")]
    SelfParent,

    #[error("setting this parent would create a circular dependency")]
    CircularDependency,

    #[error("task '{0}' not found")]
    NotFound(String),

    #[error("task '{0}' has children; use --recursive to remove")]
    HasChildren(String),

    #[error("corrupt task snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("failed to load tasks: {0:#}")]
    Load(anyhow::Error),

    #[error("failed to save tasks: {0:#}")]
    Persist(anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
