use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::engine::Engine;
use crate::model::{ChildStats, ParentEdit, Status, StatusFilter, Task, TaskEdit, TaskId};

/// A flattened tree row for display.
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub id: TaskId,
    pub code: String,
    pub name: String,
    pub status: Status,
    pub depth: usize,
    pub has_children: bool,
    pub is_last_at_depth: Vec<bool>,
    pub stats: ChildStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Parent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Add,
    Edit(TaskId),
}

/// Add/edit dialog. The parent field holds a display code; blank means
/// top level.
pub struct TaskForm {
    pub kind: FormKind,
    pub name: String,
    pub parent: String,
    pub focused: FormField,
    pub error: Option<String>,
}

impl TaskForm {
    pub fn add(parent: Option<&str>) -> Self {
        Self {
            kind: FormKind::Add,
            name: String::new(),
            parent: parent.unwrap_or_default().to_string(),
            focused: FormField::Name,
            error: None,
        }
    }

    pub fn edit(row: &TreeRow, parent_code: Option<&str>) -> Self {
        Self {
            kind: FormKind::Edit(row.id),
            name: row.name.clone(),
            parent: parent_code.unwrap_or_default().to_string(),
            focused: FormField::Name,
            error: None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            FormKind::Add => " Add Task ",
            FormKind::Edit(_) => " Edit Task ",
        }
    }

    pub fn focused_buf_mut(&mut self) -> &mut String {
        match self.focused {
            FormField::Name => &mut self.name,
            FormField::Parent => &mut self.parent,
        }
    }

    pub fn switch_field(&mut self) {
        self.focused = match self.focused {
            FormField::Name => FormField::Parent,
            FormField::Parent => FormField::Name,
        };
    }

    pub fn parent_code(&self) -> Option<&str> {
        let code = self.parent.trim();
        (!code.is_empty()).then_some(code)
    }

    pub fn to_edit(&self) -> TaskEdit {
        TaskEdit {
            name: Some(self.name.clone()),
            parent: ParentEdit::from_code(&self.parent),
        }
    }
}

/// Subtree root of the view. The code given on the command line is resolved
/// once; after that the view follows the task, since moves rewrite codes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RootSel {
    Code(String),
    Id(TaskId),
}

/// View state. Nothing here is written back to the engine.
pub struct App {
    pub rows: Vec<TreeRow>,
    pub cursor: usize,
    pub collapsed: HashSet<TaskId>,
    pub filter: StatusFilter,
    pub mode: Mode,
    pub form: Option<TaskForm>,
    pub error: Option<String>,
    root: Option<RootSel>,
    parents: HashMap<TaskId, String>,
}

impl App {
    pub fn new(root: Option<&str>, filter: StatusFilter) -> Self {
        App {
            rows: Vec::new(),
            cursor: 0,
            collapsed: HashSet::new(),
            filter,
            mode: Mode::Normal,
            form: None,
            error: None,
            root: root.map(|code| RootSel::Code(code.to_string())),
            parents: HashMap::new(),
        }
    }

    /// Rebuild the rows from a fresh engine snapshot, keeping the cursor on
    /// the same task when it is still visible.
    pub fn refresh(&mut self, engine: &Engine) -> Result<()> {
        let root = match &self.root {
            Some(RootSel::Code(code)) => {
                let id = engine.resolve(code)?.id;
                self.root = Some(RootSel::Id(id));
                Some(id)
            }
            Some(RootSel::Id(id)) => match engine.get(*id) {
                Some(task) => Some(task.id),
                None => anyhow::bail!("root task #{id} no longer exists"),
            },
            None => None,
        };
        let selected = self.selected().map(|r| r.id);
        let tasks = engine.list_tasks(self.filter, root);
        self.rows = flatten_tree(engine, &tasks, &self.collapsed);
        // Parents may be hidden by the filter, so keep their codes aside.
        self.parents = tasks
            .iter()
            .filter_map(|t| {
                let parent = engine.get(t.parent_id?)?;
                Some((t.id, parent.display_id.clone()))
            })
            .collect();
        if let Some(pos) = selected.and_then(|id| self.rows.iter().position(|r| r.id == id)) {
            self.cursor = pos;
        }
        self.clamp_cursor();
        Ok(())
    }

    pub fn clamp_cursor(&mut self) {
        if self.rows.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len() - 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.rows.len() {
            self.cursor += 1;
        }
    }

    pub fn toggle_collapse(&mut self) {
        if let Some(row) = self.rows.get(self.cursor) {
            if row.has_children && !self.collapsed.remove(&row.id) {
                self.collapsed.insert(row.id);
            }
        }
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
    }

    pub fn selected(&self) -> Option<&TreeRow> {
        self.rows.get(self.cursor)
    }

    pub fn enter_add_mode(&mut self, as_child: bool) {
        let parent = if as_child {
            self.selected().map(|r| r.code.clone())
        } else {
            None
        };
        self.form = Some(TaskForm::add(parent.as_deref()));
    }

    pub fn enter_edit_mode(&mut self) {
        if let Some(row) = self.selected() {
            let parent = self.parent_code_of(row);
            self.form = Some(TaskForm::edit(row, parent));
        }
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            Mode::Help => Mode::Normal,
            Mode::Normal => Mode::Help,
        };
    }

    fn parent_code_of(&self, row: &TreeRow) -> Option<&str> {
        self.parents.get(&row.id).map(String::as_str)
    }
}

/// Flatten `tasks` (hierarchical order, possibly filtered) into display
/// rows. A task whose parent is not in `tasks` is shown as a root.
pub fn flatten_tree(engine: &Engine, tasks: &[&Task], collapsed: &HashSet<TaskId>) -> Vec<TreeRow> {
    let present: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
    let mut children: HashMap<Option<TaskId>, Vec<&Task>> = HashMap::new();
    for &task in tasks {
        let key = task.parent_id.filter(|p| present.contains(p));
        children.entry(key).or_default().push(task);
    }

    let mut rows = Vec::new();
    let roots = children.get(&None).map(Vec::as_slice).unwrap_or_default();
    for (i, root) in roots.iter().enumerate() {
        let mut is_last = vec![i + 1 == roots.len()];
        flatten_node(&mut rows, engine, root, &children, collapsed, 0, &mut is_last);
    }
    rows
}

fn flatten_node(
    rows: &mut Vec<TreeRow>,
    engine: &Engine,
    task: &Task,
    children: &HashMap<Option<TaskId>, Vec<&Task>>,
    collapsed: &HashSet<TaskId>,
    depth: usize,
    is_last_at_depth: &mut Vec<bool>,
) {
    let kids = children.get(&Some(task.id)).map(Vec::as_slice).unwrap_or_default();
    rows.push(TreeRow {
        id: task.id,
        code: task.display_id.clone(),
        name: task.name.clone(),
        status: task.status,
        depth,
        has_children: !kids.is_empty(),
        is_last_at_depth: is_last_at_depth.clone(),
        stats: engine.child_stats(task.id),
    });

    if collapsed.contains(&task.id) {
        return;
    }
    for (i, child) in kids.iter().enumerate() {
        is_last_at_depth.push(i + 1 == kids.len());
        flatten_node(rows, engine, child, children, collapsed, depth + 1, is_last_at_depth);
        is_last_at_depth.pop();
    }
}
