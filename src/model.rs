use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal task identifier. Assigned once, never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion state, ordered `InProgress < Done < Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    InProgress,
    Done,
    Complete,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Complete => "COMPLETE",
        }
    }

    /// Returns display icon: .=in progress, ~=done (waiting on children), x=complete
    pub fn icon(self) -> &'static str {
        match self {
            Self::InProgress => ".",
            Self::Done => "~",
            Self::Complete => "x",
        }
    }

    /// True once the task itself has been marked done, regardless of children.
    pub fn is_done_ward(self) -> bool {
        self != Self::InProgress
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub display_id: String,
    pub name: String,
    pub status: Status,
    pub parent_id: Option<TaskId>,
}

impl Task {
    pub fn icon(&self) -> &'static str {
        self.status.icon()
    }
}

/// Counts over a task's direct children, as shown next to parent tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChildStats {
    pub total: usize,
    pub done: usize,
    pub complete: usize,
}

/// Status filter for `list_tasks`. Applied after hierarchical ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    InProgress,
    Done,
    Complete,
}

impl StatusFilter {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "complete" => Ok(Self::Complete),
            _ => anyhow::bail!(
                "invalid status '{s}': must be all, in-progress, done, or complete"
            ),
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::InProgress => task.status == Status::InProgress,
            Self::Done => task.status == Status::Done,
            Self::Complete => task.status == Status::Complete,
        }
    }

    /// Cycles ALL -> IN_PROGRESS -> DONE -> COMPLETE -> ALL.
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::Complete,
            Self::Complete => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Complete => "COMPLETE",
        }
    }
}

/// Requested change to a task's parent in `edit_task`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParentEdit {
    #[default]
    Keep,
    Root,
    Under(String),
}

impl ParentEdit {
    /// Maps an edit-form parent field: blank means top level.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if code.is_empty() {
            Self::Root
        } else {
            Self::Under(code.to_string())
        }
    }
}

/// Fields of an `edit_task` request. A blank name keeps the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub name: Option<String>,
    pub parent: ParentEdit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order() {
        assert!(Status::InProgress < Status::Done);
        assert!(Status::Done < Status::Complete);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn task_json_shape() {
        let task = Task {
            id: TaskId(3),
            display_id: "1.2".into(),
            name: "write docs".into(),
            status: Status::Done,
            parent_id: Some(TaskId(1)),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["displayId"], "1.2");
        assert_eq!(value["parentId"], 1);
        assert_eq!(value["status"], "DONE");
    }

    #[test]
    fn filter_parse_and_cycle() {
        assert_eq!(StatusFilter::parse("DONE").unwrap(), StatusFilter::Done);
        assert_eq!(
            StatusFilter::parse("in-progress").unwrap(),
            StatusFilter::InProgress
        );
        assert!(StatusFilter::parse("open").is_err());
        assert_eq!(StatusFilter::Complete.next(), StatusFilter::All);
    }

    #[test]
    fn parent_edit_from_blank_is_root() {
        assert_eq!(ParentEdit::from_code("  "), ParentEdit::Root);
        assert_eq!(ParentEdit::from_code("1.2"), ParentEdit::Under("1.2".into()));
    }
}
