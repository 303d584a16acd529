use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{ChildStats, Task, TaskId};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub parent_display_id: Option<&'a str>,
    pub children: ChildStats,
}

pub fn format_task_detail(task: &Task, parent: Option<&Task>, stats: ChildStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Code:        {}\n", task.display_id));
    out.push_str(&format!("Name:        {}\n", task.name));
    out.push_str(&format!("Status:      {}\n", task.status));
    if let Some(p) = parent {
        out.push_str(&format!("Parent:      {} {}\n", p.display_id, p.name));
    }
    if stats.total > 0 {
        out.push_str(&format!(
            "Children:    {} ({} done, {} complete)\n",
            stats.total, stats.done, stats.complete
        ));
    }
    out
}

pub fn format_task_line(task: &Task) -> String {
    format!("{} {}  {}", task.icon(), task.display_id, task.name)
}

pub fn format_task_list(tasks: &[&Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format_task_line(task));
        out.push('\n');
    }
    out
}

/// Render `tasks` (already in hierarchical order) with box-drawing
/// connectors. A task whose parent was filtered out is drawn as a root.
pub fn format_task_tree(tasks: &[&Task]) -> String {
    let present: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
    let mut children: HashMap<Option<TaskId>, Vec<&Task>> = HashMap::new();
    for &task in tasks {
        let key = task.parent_id.filter(|p| present.contains(p));
        children.entry(key).or_default().push(task);
    }

    let mut out = String::new();
    for root in children.get(&None).into_iter().flatten() {
        write_subtree(&mut out, root, &children, "", "");
    }
    out
}

fn write_subtree(
    out: &mut String,
    task: &Task,
    children: &HashMap<Option<TaskId>, Vec<&Task>>,
    line_prefix: &str,
    child_prefix: &str,
) {
    out.push_str(line_prefix);
    out.push_str(&format_task_line(task));
    out.push('\n');

    let kids = children.get(&Some(task.id)).map(Vec::as_slice).unwrap_or_default();
    for (i, child) in kids.iter().enumerate() {
        let (connector, extension) = if i + 1 == kids.len() {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        write_subtree(
            out,
            child,
            children,
            &format!("{child_prefix}{connector}"),
            &format!("{child_prefix}{extension}"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn make_task(id: u64, code: &str, name: &str, parent: Option<u64>, status: Status) -> Task {
        Task {
            id: TaskId(id),
            display_id: code.to_string(),
            name: name.to_string(),
            status,
            parent_id: parent.map(TaskId),
        }
    }

    #[test]
    fn flat_list_shows_icon_and_code() {
        let a = make_task(1, "1", "plan", None, Status::Done);
        let b = make_task(2, "1.1", "draft", Some(1), Status::Complete);
        let out = format_task_list(&[&a, &b]);
        assert_eq!(out, "~ 1  plan\nx 1.1  draft\n");
    }

    #[test]
    fn tree_with_children() {
        let root = make_task(1, "1", "root", None, Status::InProgress);
        let c1 = make_task(2, "1.1", "first", Some(1), Status::InProgress);
        let c2 = make_task(3, "1.2", "second", Some(1), Status::InProgress);
        let g = make_task(4, "1.1.1", "deep", Some(2), Status::InProgress);
        let out = format_task_tree(&[&root, &c1, &g, &c2]);
        assert_eq!(
            out,
            ". 1  root\n\
             ├── . 1.1  first\n\
             │   └── . 1.1.1  deep\n\
             └── . 1.2  second\n"
        );
    }

    #[test]
    fn filtered_parent_promotes_child_to_root() {
        let c = make_task(2, "1.1", "orphan", Some(1), Status::Done);
        assert_eq!(format_task_tree(&[&c]), "~ 1.1  orphan\n");
    }

    #[test]
    fn detail_includes_parent_and_stats() {
        let parent = make_task(1, "1", "release", None, Status::Done);
        let task = make_task(2, "1.1", "docs", Some(1), Status::Done);
        let stats = ChildStats {
            total: 3,
            done: 1,
            complete: 2,
        };
        let out = format_task_detail(&task, Some(&parent), stats);
        assert!(out.contains("Code:        1.1\n"));
        assert!(out.contains("Status:      DONE\n"));
        assert!(out.contains("Parent:      1 release\n"));
        assert!(out.contains("Children:    3 (1 done, 2 complete)\n"));
    }

    #[test]
    fn detail_json_flattens_task() {
        let task = make_task(1, "1", "solo", None, Status::InProgress);
        let detail = TaskDetail {
            task: &task,
            parent_display_id: None,
            children: ChildStats::default(),
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["displayId"], "1");
        assert_eq!(value["children"]["total"], 0);
        assert!(value["parentDisplayId"].is_null());
    }
}
