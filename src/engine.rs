//! The task hierarchy state engine.
//!
//! Owns the tree index and the id allocator. Every public operation either
//! fails before touching anything or runs to completion, including the status
//! chains it triggers.
//!
//! Status rules: a task is `COMPLETE` iff it was marked done and all of its
//! direct children are `COMPLETE`. Marking a task done runs the upgrade
//! chain (promote it, then its ancestors, while the rule holds). Anything that
//! can break the rule for a parent (reopening a child, adding one, moving one
//! in or out) runs the downgrade chain (demote `COMPLETE` ancestors to `DONE`
//! until one is already below `COMPLETE`).

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ids::{rebase, IdAllocator};
use crate::index::TreeIndex;
use crate::model::{ChildStats, ParentEdit, Status, StatusFilter, Task, TaskEdit, TaskId};
use crate::validate::{check_display_ids, check_forest, validate_name, would_create_cycle};

#[derive(Debug, Clone, Default)]
pub struct Engine {
    index: TreeIndex,
    ids: IdAllocator,
}

fn not_found(id: TaskId) -> Error {
    Error::NotFound(format!("#{id}"))
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from a stored snapshot.
    ///
    /// Rejects snapshots that break the forest or display-code invariants.
    /// Statuses that disagree with the completion rule are repaired.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self> {
        let index = TreeIndex::from_tasks(tasks)?;
        check_forest(&index)?;
        check_display_ids(&index)?;
        let ids = IdAllocator::after(index.max_id());
        let mut engine = Self { index, ids };
        engine.normalize_statuses();
        Ok(engine)
    }

    fn normalize_statuses(&mut self) {
        // Reverse pre-order visits every child before its parent.
        let order: Vec<TaskId> = self.index.preorder(None).iter().rev().map(|t| t.id).collect();
        for id in order {
            let Some(task) = self.index.get(id) else {
                continue;
            };
            if !task.status.is_done_ward() {
                continue;
            }
            let settled = if self.index.all_children_complete(id) {
                Status::Complete
            } else {
                Status::Done
            };
            if settled != task.status {
                warn!(
                    task = %task.display_id,
                    from = %task.status,
                    to = %settled,
                    "repairing inconsistent status"
                );
                self.index.set_status(id, settled);
            }
        }
    }

    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    /// The task collection in creation order.
    pub fn tasks(&self) -> &[Task] {
        self.index.tasks()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.index.get(id)
    }

    /// Look up a task by display code.
    pub fn resolve(&self, code: &str) -> Result<&Task> {
        self.index
            .find_by_display_id(code.trim())
            .ok_or_else(|| Error::NotFound(code.trim().to_string()))
    }

    pub fn child_stats(&self, id: TaskId) -> ChildStats {
        self.index.child_stats(id)
    }

    pub fn depth(&self, id: TaskId) -> usize {
        self.index.depth(id)
    }

    /// Tasks in hierarchical pre-order, filtered after ordering so that each
    /// surviving task keeps its place relative to the hierarchy.
    /// With `root`, only that task's subtree is listed.
    pub fn list_tasks(&self, filter: StatusFilter, root: Option<TaskId>) -> Vec<&Task> {
        self.index
            .preorder(root)
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect()
    }

    pub fn create_task(&mut self, name: &str, parent: Option<&str>) -> Result<Task> {
        let name = validate_name(name)?.to_string();
        let parent = parent.map(str::trim);
        let parent_id = match parent {
            Some(code) => Some(
                self.index
                    .find_by_display_id(code)
                    .ok_or_else(|| Error::InvalidParent(code.to_string()))?
                    .id,
            ),
            None => None,
        };
        let display_id = self.ids.next_display_id(&self.index, parent)?;
        // The new id is in no chain yet, so this only trips on a looping parent chain.
        if let Some(p) = parent_id {
            if would_create_cycle(&self.index, self.ids.peek(), p) {
                return Err(Error::CircularDependency);
            }
        }

        let task = Task {
            id: self.ids.next_id(),
            display_id,
            name,
            status: Status::InProgress,
            parent_id,
        };
        info!(id = %task.id, task = %task.display_id, "created task");
        self.index.insert(task.clone());
        // A fresh child is never COMPLETE, so a COMPLETE parent no longer is.
        self.downgrade_chain(parent_id);
        Ok(task)
    }

    /// Flip a task between `IN_PROGRESS` and done. Returns its new status,
    /// which is `COMPLETE` when marking done finds every child complete.
    pub fn toggle_status(&mut self, id: TaskId) -> Result<Status> {
        let task = self.index.get(id).ok_or_else(|| not_found(id))?;
        let parent = task.parent_id;
        if task.status == Status::InProgress {
            debug!(task = %task.display_id, "marking done");
            self.index.set_status(id, Status::Done);
            self.upgrade_chain(id);
        } else {
            debug!(task = %task.display_id, "reopening");
            self.index.set_status(id, Status::InProgress);
            self.downgrade_chain(parent);
        }
        self.index.get(id).map(|t| t.status).ok_or_else(|| not_found(id))
    }

    /// Apply an edit form. Every check runs before anything changes.
    pub fn edit_task(&mut self, id: TaskId, edit: TaskEdit) -> Result<()> {
        let task = self.index.get(id).ok_or_else(|| not_found(id))?;
        let new_parent = match &edit.parent {
            ParentEdit::Keep => task.parent_id,
            ParentEdit::Root => None,
            ParentEdit::Under(code) => {
                let parent = self
                    .index
                    .find_by_display_id(code.trim())
                    .ok_or_else(|| Error::InvalidParent(code.trim().to_string()))?;
                if parent.id == id {
                    return Err(Error::SelfParent);
                }
                if would_create_cycle(&self.index, id, parent.id) {
                    return Err(Error::CircularDependency);
                }
                Some(parent.id)
            }
        };
        let name = edit
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        if new_parent != task.parent_id {
            self.reparent(id, new_parent)?;
        }
        if let Some(name) = name {
            self.index.rename(id, name);
        }
        Ok(())
    }

    /// Move a task (with its subtree) under `new_parent`, or to the root level.
    ///
    /// The moved task gets a fresh code under its new parent and every
    /// descendant code is rewritten to match, so codes always reflect the
    /// current tree.
    pub fn reparent(&mut self, id: TaskId, new_parent: Option<TaskId>) -> Result<()> {
        let task = self.index.get(id).ok_or_else(|| not_found(id))?;
        let old_parent = task.parent_id;
        let old_code = task.display_id.clone();
        let parent_code = match new_parent {
            Some(p) if p == id => return Err(Error::CircularDependency),
            Some(p) => {
                let parent = self
                    .index
                    .get(p)
                    .ok_or_else(|| Error::InvalidParent(format!("#{p}")))?;
                if would_create_cycle(&self.index, id, p) {
                    return Err(Error::CircularDependency);
                }
                Some(parent.display_id.clone())
            }
            None => None,
        };
        if old_parent == new_parent {
            return Ok(());
        }

        let new_code = self.ids.next_display_id(&self.index, parent_code.as_deref())?;
        let subtree = self.index.descendants(id);
        self.index.set_parent(id, new_parent);
        self.index.set_display_id(id, new_code.clone());
        for member in subtree {
            let code = self
                .index
                .get(member)
                .and_then(|t| rebase(&t.display_id, &old_code, &new_code));
            if let Some(code) = code {
                self.index.set_display_id(member, code);
            }
        }
        info!(id = %id, from = %old_code, to = %new_code, "moved task");

        // The old parent lost a child, the new one gained one.
        self.downgrade_chain(old_parent);
        self.downgrade_chain(new_parent);
        // Either may now satisfy the completion rule again.
        for parent in [old_parent, new_parent].into_iter().flatten() {
            self.upgrade_chain(parent);
        }
        Ok(())
    }

    /// Remove a task. With `recursive`, its whole subtree goes too; without it
    /// a task that has children is refused. Returns the removed tasks in
    /// pre-order.
    pub fn remove_task(&mut self, id: TaskId, recursive: bool) -> Result<Vec<Task>> {
        let task = self.index.get(id).ok_or_else(|| not_found(id))?;
        let parent = task.parent_id;
        let subtree = self.index.descendants(id);
        if !subtree.is_empty() && !recursive {
            return Err(Error::HasChildren(task.display_id.clone()));
        }

        let mut removed: Vec<Task> = subtree
            .iter()
            .rev()
            .filter_map(|&member| self.index.remove(member))
            .collect();
        removed.extend(self.index.remove(id));
        removed.reverse();
        info!(id = %id, count = removed.len(), "removed tasks");

        self.downgrade_chain(parent);
        if let Some(parent) = parent {
            self.upgrade_chain(parent);
        }
        Ok(removed)
    }

    /// Promote `start` and then its ancestors to `COMPLETE` for as long as
    /// each is `DONE` with only complete children.
    fn upgrade_chain(&mut self, start: TaskId) {
        let mut current = Some(start);
        while let Some(id) = current {
            let Some(task) = self.index.get(id) else {
                break;
            };
            if task.status != Status::Done || !self.index.all_children_complete(id) {
                break;
            }
            current = task.parent_id;
            debug!(task = %task.display_id, "promoting to COMPLETE");
            self.index.set_status(id, Status::Complete);
        }
    }

    /// Demote `start` and then its ancestors from `COMPLETE` to `DONE`,
    /// stopping at the first one that is not `COMPLETE`.
    fn downgrade_chain(&mut self, start: Option<TaskId>) {
        let mut current = start;
        while let Some(id) = current {
            let Some(task) = self.index.get(id) else {
                break;
            };
            if task.status != Status::Complete {
                break;
            }
            current = task.parent_id;
            debug!(task = %task.display_id, "demoting to DONE");
            self.index.set_status(id, Status::Done);
        }
    }
}
