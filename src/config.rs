use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::StatusFilter;

/// Defaults for the CLI and the tree view, read from `config.toml`.
/// Command-line flags override every value here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub tree: TreeConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListConfig {
    /// Default status filter: all, in-progress, done, or complete.
    pub status: Option<String>,
    /// Render `list` as a tree by default.
    pub tree: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    pub poll_interval_ms: Option<u64>,
}

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

impl Config {
    /// Load config from `path`. Returns default config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(status) = &self.list.status {
            StatusFilter::parse(status)
                .with_context(|| format!("failed to parse {}: list.status", path.display()))?;
        }
        Ok(())
    }

    pub fn list_filter(&self) -> StatusFilter {
        self.list
            .status
            .as_deref()
            .and_then(|s| StatusFilter::parse(s).ok())
            .unwrap_or_default()
    }

    pub fn list_tree(&self) -> bool {
        self.list.tree.unwrap_or(false)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.tree.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.list_filter(), StatusFilter::All);
        assert!(!config.list_tree());
        assert_eq!(config.poll_interval_ms(), 1000);
    }

    #[test]
    fn parse_full_config() {
        let f = write_config(
            r#"
[list]
status = "in-progress"
tree = true

[tree]
poll_interval_ms = 250
"#,
        );
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.list_filter(), StatusFilter::InProgress);
        assert!(config.list_tree());
        assert_eq!(config.poll_interval_ms(), 250);
    }

    #[test]
    fn unknown_keys_rejected() {
        let f = write_config("[list]\ncolour = \"red\"\n");
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn bad_status_rejected() {
        let f = write_config("[list]\nstatus = \"paused\"\n");
        let err = Config::load_from(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("list.status"));
    }
}
