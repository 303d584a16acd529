use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use proptest::sample::Index;

use tasktree::ids::depth_of;
use tasktree::{Engine, Error, Status, StatusFilter, TaskId};

#[derive(Debug, Clone)]
enum Op {
    Create(Option<Index>),
    Toggle(Index),
    Reparent(Index, Option<Index>),
    Remove(Index, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => proptest::option::of(any::<Index>()).prop_map(Op::Create),
        3 => any::<Index>().prop_map(Op::Toggle),
        2 => (any::<Index>(), proptest::option::of(any::<Index>()))
            .prop_map(|(t, p)| Op::Reparent(t, p)),
        1 => (any::<Index>(), any::<bool>()).prop_map(|(t, r)| Op::Remove(t, r)),
    ]
}

fn pick(engine: &Engine, idx: &Index) -> Option<TaskId> {
    let tasks = engine.tasks();
    if tasks.is_empty() {
        return None;
    }
    Some(tasks[idx.index(tasks.len())].id)
}

/// Parent links straight from the task records, independent of the index.
fn parent_map(engine: &Engine) -> HashMap<TaskId, Option<TaskId>> {
    engine.tasks().iter().map(|t| (t.id, t.parent_id)).collect()
}

/// True if `candidate` is `child` or one of its descendants.
fn in_subtree(engine: &Engine, child: TaskId, candidate: TaskId) -> bool {
    let parents = parent_map(engine);
    let mut current = Some(candidate);
    let mut steps = 0;
    while let Some(id) = current {
        if id == child {
            return true;
        }
        steps += 1;
        assert!(steps <= parents.len(), "parent chain does not terminate");
        current = parents[&id];
    }
    false
}

fn apply(engine: &mut Engine, op: &Op) {
    match op {
        Op::Create(parent) => {
            let parent_code = parent
                .as_ref()
                .and_then(|idx| pick(engine, idx))
                .and_then(|id| engine.get(id))
                .map(|t| t.display_id.clone());
            let task = engine
                .create_task("task", parent_code.as_deref())
                .expect("create under a live parent");
            // display codes stay unique
            let same_code = engine
                .tasks()
                .iter()
                .filter(|t| t.display_id == task.display_id)
                .count();
            assert_eq!(same_code, 1);
        }
        Op::Toggle(idx) => {
            if let Some(id) = pick(engine, idx) {
                engine.toggle_status(id).expect("toggle a live task");
            }
        }
        Op::Reparent(child, parent) => {
            let Some(child) = pick(engine, child) else {
                return;
            };
            let parent = parent.as_ref().and_then(|idx| pick(engine, idx));
            let cycles = parent.is_some_and(|p| in_subtree(engine, child, p));
            let before = engine.tasks().to_vec();
            let result = engine.reparent(child, parent);
            if cycles {
                assert!(matches!(result, Err(Error::CircularDependency)));
                assert_eq!(engine.tasks(), before.as_slice());
            } else {
                result.expect("acyclic reparent is accepted");
            }
        }
        Op::Remove(idx, recursive) => {
            let Some(id) = pick(engine, idx) else {
                return;
            };
            let has_children = engine.tasks().iter().any(|t| t.parent_id == Some(id));
            let result = engine.remove_task(id, *recursive);
            if has_children && !recursive {
                assert!(matches!(result, Err(Error::HasChildren(_))));
            } else {
                result.expect("remove is accepted");
                assert!(engine.get(id).is_none());
            }
        }
    }
}

fn check_invariants(engine: &Engine) {
    let parents = parent_map(engine);
    let by_id: HashMap<TaskId, _> = engine.tasks().iter().map(|t| (t.id, t)).collect();

    // forest: every parent chain ends at a root within len steps
    for task in engine.tasks() {
        let mut steps = 0;
        let mut current = task.parent_id;
        while let Some(p) = current {
            assert!(by_id.contains_key(&p), "dangling parent {p}");
            steps += 1;
            assert!(steps <= parents.len(), "cycle through {}", task.id);
            current = parents[&p];
        }
        assert_eq!(engine.depth(task.id), steps);
        assert_eq!(depth_of(&task.display_id), steps);
    }

    // COMPLETE iff marked done and every direct child COMPLETE
    for task in engine.tasks() {
        let children_complete = engine
            .tasks()
            .iter()
            .filter(|c| c.parent_id == Some(task.id))
            .all(|c| c.status == Status::Complete);
        let expected = task.status != Status::InProgress && children_complete;
        assert_eq!(
            task.status == Status::Complete,
            expected,
            "task {} is {}",
            task.display_id,
            task.status
        );
    }

    // display codes: unique, and each extends its parent's code by one segment
    let codes: HashSet<&str> = engine.tasks().iter().map(|t| t.display_id.as_str()).collect();
    assert_eq!(codes.len(), engine.tasks().len());
    for task in engine.tasks() {
        let (prefix, last) = match task.display_id.rsplit_once('.') {
            Some((prefix, last)) => (Some(prefix), last),
            None => (None, task.display_id.as_str()),
        };
        let n: u64 = last.parse().expect("numeric segment");
        assert!(n > 0);
        let parent_code = task.parent_id.map(|p| by_id[&p].display_id.as_str());
        assert_eq!(prefix, parent_code, "code {}", task.display_id);
    }

    assert_eq!(
        engine.list_tasks(StatusFilter::All, None).len(),
        engine.tasks().len()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_after_every_operation(ops in prop::collection::vec(op(), 1..40)) {
        let mut engine = Engine::new();
        for op in &ops {
            apply(&mut engine, op);
            check_invariants(&engine);
        }
    }

    #[test]
    fn double_toggle_restores_every_status(ops in prop::collection::vec(op(), 1..30)) {
        let mut engine = Engine::new();
        for op in &ops {
            apply(&mut engine, op);
        }
        for task in engine.tasks() {
            let mut probe = engine.clone();
            probe.toggle_status(task.id).unwrap();
            probe.toggle_status(task.id).unwrap();
            prop_assert_eq!(probe.tasks(), engine.tasks());
        }
    }

    #[test]
    fn rejected_operations_change_nothing(ops in prop::collection::vec(op(), 1..20), name in "[ \t]*") {
        let mut engine = Engine::new();
        for op in &ops {
            apply(&mut engine, op);
        }
        let before = engine.tasks().to_vec();
        prop_assert!(matches!(engine.create_task(&name, None), Err(Error::EmptyName)));
        prop_assert!(matches!(
            engine.create_task("x", Some("0.404")),
            Err(Error::InvalidParent(_))
        ));
        prop_assert_eq!(engine.tasks(), before.as_slice());
    }
}

#[test]
fn ripple_through_deep_chain_terminates() {
    const DEPTH: usize = 300;
    let mut engine = Engine::new();
    let mut code: Option<String> = None;
    let mut ids = Vec::new();
    for _ in 0..DEPTH {
        let task = engine.create_task("level", code.as_deref()).unwrap();
        code = Some(task.display_id.clone());
        ids.push(task.id);
    }
    for &id in &ids {
        engine.toggle_status(id).unwrap();
    }
    // The leaf was toggled last; its completion reaches the root.
    assert!(engine.tasks().iter().all(|t| t.status == Status::Complete));

    let leaf = ids[DEPTH - 1];
    assert_eq!(engine.toggle_status(leaf).unwrap(), Status::InProgress);
    assert!(ids[..DEPTH - 1]
        .iter()
        .all(|&id| engine.get(id).unwrap().status == Status::Done));
    assert_eq!(engine.depth(leaf), DEPTH - 1);
}
