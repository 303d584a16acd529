//! Arena + index over the task collection.
//!
//! Tasks live in a `Vec` in creation order. Lookups by id and display code and
//! the parent -> children lists are kept in maps that every structural setter
//! updates, so walks never rescan the whole collection.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ids::compare_display_ids;
use crate::model::{ChildStats, Status, Task, TaskId};

#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    tasks: Vec<Task>,
    slots: HashMap<TaskId, usize>,
    by_code: HashMap<String, TaskId>,
    /// Keyed by parent id (`None` = roots); each list ordered by display code.
    children: HashMap<Option<TaskId>, Vec<TaskId>>,
}

impl TreeIndex {
    /// Index a snapshot. Rejects duplicate ids, duplicate display codes and
    /// parent references to tasks that are not in the snapshot. Cycles are not
    /// checked here; see `validate::check_forest`.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self> {
        let mut index = Self::default();
        for task in tasks {
            if index.slots.contains_key(&task.id) {
                return Err(Error::CorruptSnapshot(format!("duplicate task id {}", task.id)));
            }
            if index.by_code.contains_key(&task.display_id) {
                return Err(Error::CorruptSnapshot(format!(
                    "duplicate display id '{}'",
                    task.display_id
                )));
            }
            index.slots.insert(task.id, index.tasks.len());
            index.by_code.insert(task.display_id.clone(), task.id);
            index.tasks.push(task);
        }
        for task in &index.tasks {
            if let Some(parent) = task.parent_id {
                if !index.slots.contains_key(&parent) {
                    return Err(Error::CorruptSnapshot(format!(
                        "task '{}' references missing parent {parent}",
                        task.display_id
                    )));
                }
            }
        }
        index.rebuild_children();
        Ok(index)
    }

    fn rebuild_children(&mut self) {
        self.children.clear();
        for task in &self.tasks {
            self.children.entry(task.parent_id).or_default().push(task.id);
        }
        let tasks = &self.tasks;
        let slots = &self.slots;
        for ids in self.children.values_mut() {
            ids.sort_by(|a, b| {
                compare_display_ids(&tasks[slots[a]].display_id, &tasks[slots[b]].display_id)
            });
        }
    }

    /// All tasks in creation order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn max_id(&self) -> Option<TaskId> {
        self.tasks.iter().map(|t| t.id).max()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.slots.get(&id).map(|&slot| &self.tasks[slot])
    }

    pub fn find_by_display_id(&self, code: &str) -> Option<&Task> {
        self.by_code.get(code).and_then(|&id| self.get(id))
    }

    /// Ids of the direct children of `parent` (`None` for roots), in display order.
    pub fn child_ids(&self, parent: Option<TaskId>) -> &[TaskId] {
        self.children.get(&parent).map_or(&[], Vec::as_slice)
    }

    pub fn children_of(&self, id: TaskId) -> impl Iterator<Item = &Task> + '_ {
        self.child_ids(Some(id))
            .iter()
            .filter_map(move |&child| self.get(child))
    }

    pub fn roots(&self) -> impl Iterator<Item = &Task> + '_ {
        self.child_ids(None)
            .iter()
            .filter_map(move |&root| self.get(root))
    }

    /// Ancestors of `id`, nearest first, ending at its root. Excludes `id`.
    pub fn ancestors(&self, id: TaskId) -> Ancestors<'_> {
        Ancestors {
            index: self,
            next: self.get(id).and_then(|t| t.parent_id),
        }
    }

    /// `id` followed by its ancestors.
    pub fn lineage(&self, id: TaskId) -> Ancestors<'_> {
        Ancestors {
            index: self,
            next: Some(id),
        }
    }

    pub fn depth(&self, id: TaskId) -> usize {
        self.ancestors(id).count()
    }

    /// Hierarchical pre-order: each task followed by its subtree, siblings in
    /// display order. Starts at `root` if given, otherwise covers every root.
    pub fn preorder(&self, root: Option<TaskId>) -> Vec<&Task> {
        let mut stack: Vec<TaskId> = match root {
            Some(id) => vec![id],
            None => self.child_ids(None).iter().rev().copied().collect(),
        };
        let mut out = Vec::with_capacity(self.tasks.len());
        while let Some(id) = stack.pop() {
            let Some(task) = self.get(id) else {
                continue;
            };
            out.push(task);
            stack.extend(self.child_ids(Some(id)).iter().rev());
        }
        out
    }

    /// Every task below `id`, in pre-order.
    pub fn descendants(&self, id: TaskId) -> Vec<TaskId> {
        self.preorder(Some(id))
            .into_iter()
            .skip(1)
            .map(|t| t.id)
            .collect()
    }

    pub fn child_stats(&self, id: TaskId) -> ChildStats {
        self.children_of(id).fold(ChildStats::default(), |mut stats, child| {
            stats.total += 1;
            if child.status.is_done_ward() {
                stats.done += 1;
            }
            if child.status == Status::Complete {
                stats.complete += 1;
            }
            stats
        })
    }

    pub fn all_children_complete(&self, id: TaskId) -> bool {
        self.children_of(id).all(|c| c.status == Status::Complete)
    }

    // ── Mutation ─────────────────────────────────────────────────────────
    //
    // Callers validate first: the parent must exist and the code must be free.

    pub(crate) fn insert(&mut self, task: Task) {
        let id = task.id;
        self.slots.insert(id, self.tasks.len());
        self.by_code.insert(task.display_id.clone(), id);
        self.tasks.push(task);
        self.link(id);
    }

    pub(crate) fn set_status(&mut self, id: TaskId, status: Status) {
        if let Some(&slot) = self.slots.get(&id) {
            self.tasks[slot].status = status;
        }
    }

    pub(crate) fn rename(&mut self, id: TaskId, name: String) {
        if let Some(&slot) = self.slots.get(&id) {
            self.tasks[slot].name = name;
        }
    }

    pub(crate) fn set_parent(&mut self, id: TaskId, parent: Option<TaskId>) {
        let Some(&slot) = self.slots.get(&id) else {
            return;
        };
        self.unlink(id);
        self.tasks[slot].parent_id = parent;
        self.link(id);
    }

    pub(crate) fn set_display_id(&mut self, id: TaskId, code: String) {
        let Some(&slot) = self.slots.get(&id) else {
            return;
        };
        self.unlink(id);
        self.by_code.remove(&self.tasks[slot].display_id);
        self.by_code.insert(code.clone(), id);
        self.tasks[slot].display_id = code;
        self.link(id);
    }

    /// Remove a childless task. Creation order of the rest is preserved.
    pub(crate) fn remove(&mut self, id: TaskId) -> Option<Task> {
        let slot = *self.slots.get(&id)?;
        self.unlink(id);
        self.children.remove(&Some(id));
        let task = self.tasks.remove(slot);
        self.by_code.remove(&task.display_id);
        self.slots.remove(&id);
        for (i, t) in self.tasks.iter().enumerate().skip(slot) {
            self.slots.insert(t.id, i);
        }
        Some(task)
    }

    fn link(&mut self, id: TaskId) {
        let task = &self.tasks[self.slots[&id]];
        let parent = task.parent_id;
        let pos = self.child_ids(parent).partition_point(|sibling| {
            let sibling = &self.tasks[self.slots[sibling]];
            compare_display_ids(&sibling.display_id, &task.display_id).is_lt()
        });
        self.children.entry(parent).or_default().insert(pos, id);
    }

    fn unlink(&mut self, id: TaskId) {
        let parent = self.tasks[self.slots[&id]].parent_id;
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|&s| s != id);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
    }
}

/// Lazy root-ward walk produced by `TreeIndex::ancestors` and `lineage`.
///
/// Terminates at the first task without a parent. On a corrupt snapshot
/// containing a cycle it would not terminate; callers that may see such data
/// guard with a visited set (see `validate`).
pub struct Ancestors<'a> {
    index: &'a TreeIndex,
    next: Option<TaskId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<&'a Task> {
        let task = self.index.get(self.next?)?;
        self.next = task.parent_id;
        Some(task)
    }
}
