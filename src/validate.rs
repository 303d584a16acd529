use std::collections::HashSet;

use tracing::warn;

use crate::error::{Error, Result};
use crate::index::TreeIndex;
use crate::model::TaskId;

/// Validate a task name: must contain something other than whitespace.
/// Returns the trimmed name.
pub fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyName);
    }
    Ok(trimmed)
}

/// Detect if attaching `child` under `parent` would create a cycle.
/// A cycle exists if `parent` is `child` itself or one of its descendants,
/// i.e. `child` appears on the walk from `parent` up to its root.
///
/// A walk that revisits a task also counts as a cycle, so a corrupt tree can
/// never be extended.
pub fn would_create_cycle(index: &TreeIndex, child: TaskId, parent: TaskId) -> bool {
    let mut visited = HashSet::new();
    for task in index.lineage(parent) {
        if task.id == child {
            return true;
        }
        if !visited.insert(task.id) {
            warn!(task = %task.display_id, "parent chain loops back on itself");
            return true;
        }
    }
    false
}

/// Check that every parent chain ends at a root.
pub fn check_forest(index: &TreeIndex) -> Result<()> {
    let mut settled: HashSet<TaskId> = HashSet::new();
    for task in index.tasks() {
        let mut path = HashSet::new();
        for step in index.lineage(task.id) {
            if settled.contains(&step.id) {
                break;
            }
            if !path.insert(step.id) {
                return Err(Error::CorruptSnapshot(format!(
                    "parent chain of '{}' contains a cycle",
                    task.display_id
                )));
            }
        }
        settled.extend(path);
    }
    Ok(())
}

/// Check that every display code extends its parent's code by one numeric
/// segment (roots have a single segment), so codes track position in the tree.
pub fn check_display_ids(index: &TreeIndex) -> Result<()> {
    for task in index.tasks() {
        let last = match task.parent_id.and_then(|p| index.get(p)) {
            Some(parent) => task
                .display_id
                .strip_prefix(parent.display_id.as_str())
                .and_then(|rest| rest.strip_prefix('.')),
            None => Some(task.display_id.as_str()),
        };
        let well_formed = last.is_some_and(|seg| seg.parse::<u64>().is_ok_and(|n| n > 0));
        if !well_formed {
            return Err(Error::CorruptSnapshot(format!(
                "display id '{}' does not match the task's position in the tree",
                task.display_id
            )));
        }
    }
    Ok(())
}
