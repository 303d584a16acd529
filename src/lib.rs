//! Hierarchical task tracking with completion propagation.
//!
//! Tasks form a forest addressed by dotted display codes (`1`, `1.2`,
//! `1.2.3`). Marking a task done settles it to `COMPLETE` once every child is
//! complete, and that completion ripples up through ancestors that are
//! themselves done. Reopening a task pulls completed ancestors back to `DONE`.
//!
//! [`engine::Engine`] owns the in-memory tree and enforces the rules;
//! [`session::Session`] pairs it with a [`store::TaskRepository`] and saves
//! after every accepted change.

pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod ids;
pub mod index;
pub mod model;
pub mod output;
pub mod paths;
pub mod session;
pub mod store;
pub mod tui;
pub mod validate;
pub mod watch;

pub use engine::Engine;
pub use error::{Error, Result};
pub use model::{ChildStats, ParentEdit, Status, StatusFilter, Task, TaskEdit, TaskId};
pub use session::Session;
pub use store::{MemoryRepository, SqliteRepository, TaskRepository};
