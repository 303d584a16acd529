//! Identifier allocation: internal ids and dotted display codes.
//!
//! Display codes look like `1`, `1.2`, `1.2.1`. A code's segment count is the
//! task's depth plus one, and a child's code always extends its parent's.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::index::TreeIndex;
use crate::model::TaskId;

/// Monotonic id counter owned by one engine instance.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Seed the counter past the largest id in a loaded snapshot.
    pub fn after(max: Option<TaskId>) -> Self {
        Self {
            next: max.map_or(1, |id| id.0 + 1),
        }
    }

    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to `next_id` will return.
    pub fn peek(&self) -> TaskId {
        TaskId(self.next)
    }

    /// Code for a new task under `parent` (by display code), or a new root.
    ///
    /// The ordinal is the sibling count plus one. If that code is occupied,
    /// which happens only after a removal or a move left a gap, the ordinal is
    /// advanced to the next free one.
    pub fn next_display_id(&self, index: &TreeIndex, parent: Option<&str>) -> Result<String> {
        match parent {
            None => Ok(free_code(index, None, index.child_ids(None).len() + 1)),
            Some(code) => {
                let parent = index
                    .find_by_display_id(code)
                    .ok_or_else(|| Error::InvalidParent(code.to_string()))?;
                let siblings = index.child_ids(Some(parent.id)).len();
                Ok(free_code(index, Some(&parent.display_id), siblings + 1))
            }
        }
    }
}

fn free_code(index: &TreeIndex, prefix: Option<&str>, mut ordinal: usize) -> String {
    loop {
        let code = match prefix {
            Some(p) => format!("{p}.{ordinal}"),
            None => ordinal.to_string(),
        };
        if index.find_by_display_id(&code).is_none() {
            return code;
        }
        ordinal += 1;
    }
}

/// Compare display codes segment by segment, numerically, so `1.2` < `1.10`.
/// Non-numeric segments (only seen in hand-edited data) compare as strings
/// after all numeric ones.
pub fn compare_display_ids(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Depth encoded by a display code: `1` is 0, `1.2.3` is 2.
pub fn depth_of(code: &str) -> usize {
    code.matches('.').count()
}

/// Rewrite `code` so that its leading `old_prefix` becomes `new_prefix`.
/// Returns None if `code` is not `old_prefix` or a descendant code of it.
pub fn rebase(code: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if code == old_prefix {
        return Some(new_prefix.to_string());
    }
    let rest = code.strip_prefix(old_prefix)?.strip_prefix('.')?;
    Some(format!("{new_prefix}.{rest}"))
}
