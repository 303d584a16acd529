use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tasktree", about = "Hierarchical task tracker with status propagation")]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.tasktree/tasktree.db]
    #[arg(long, env = "TASKTREE_DB", global = true)]
    pub db: Option<String>,

    /// Path to the config file [default: ~/.tasktree/config.toml]
    #[arg(long, env = "TASKTREE_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a task
    Add {
        /// Task name
        name: String,
        /// Display code of the parent task (e.g. 1.2)
        #[arg(short, long)]
        parent: Option<String>,
        /// Print the created task as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle a task between in progress and done
    Toggle {
        /// Display code
        code: String,
    },

    /// Rename a task and/or move it
    Edit {
        /// Display code
        code: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// Display code of the new parent
        #[arg(short, long, conflicts_with = "root")]
        parent: Option<String>,
        /// Move the task to the top level
        #[arg(long)]
        root: bool,
    },

    /// Move a task under another task (omit --parent for top level)
    Reparent {
        /// Display code
        code: String,
        /// Display code of the new parent
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Remove a task
    Rm {
        /// Display code
        code: String,
        /// Remove children recursively
        #[arg(long)]
        recursive: bool,
    },

    /// Show task details
    Show {
        /// Display code
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tasks in hierarchical order
    List {
        /// Filter by status (all, in-progress, done, complete)
        #[arg(long)]
        status: Option<String>,
        /// Display as tree
        #[arg(long)]
        tree: bool,
        /// Display code of a subtree root
        #[arg(long)]
        root: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Launch interactive tree view
    Tree {
        /// Display code of a subtree root
        #[arg(long)]
        root: Option<String>,
        /// Poll interval in milliseconds [default: from config, else 1000]
        #[arg(long)]
        poll_interval: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edit_with_root() {
        let cli = Cli::try_parse_from(["tasktree", "edit", "1.2", "--root"]).unwrap();
        match cli.command {
            Command::Edit { code, root, parent, name } => {
                assert_eq!(code, "1.2");
                assert!(root);
                assert!(parent.is_none());
                assert!(name.is_none());
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn edit_parent_conflicts_with_root() {
        assert!(Cli::try_parse_from(["tasktree", "edit", "1", "-p", "2", "--root"]).is_err());
    }

    #[test]
    fn global_db_after_subcommand() {
        let cli = Cli::try_parse_from(["tasktree", "list", "--db", "/tmp/t.db"]).unwrap();
        assert_eq!(cli.db.as_deref(), Some("/tmp/t.db"));
    }
}
