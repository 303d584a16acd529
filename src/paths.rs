//! Default locations of the database and config file.
//!
//! Both live under `$TASKTREE_HOME` (default `$HOME/.tasktree`). CLI flags and
//! the `TASKTREE_DB` / `TASKTREE_CONFIG` variables override them; clap reads
//! those variables, so only the fallbacks are resolved here.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn home_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("TASKTREE_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".tasktree"))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(home_dir()?.join("tasktree.db"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join("config.toml"))
}

/// Resolve the database path: explicit value first, then the default.
pub fn resolve_db_path(cli_db: Option<String>) -> Result<String> {
    match cli_db {
        Some(p) => Ok(p),
        None => {
            let path = default_db_path()?;
            Ok(path
                .to_str()
                .context("default DB path is not valid UTF-8")?
                .to_string())
        }
    }
}

pub fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}
