use std::fs;

use tempfile::tempdir;
use tm2bd::graph::{self, GraphIssue};
use tm2bd::input;
use tm2bd::model::{Status, Task};
use tm2bd::store::mapping::MappingStore;
use tm2bd::sync::{Migrator, StatusAction, status_action};
use tm2bd::tracker::{PlanRecorder, PlannedOp};

fn task(id: u64, deps: &[u64]) -> Task {
    Task::new(id, format!("task {id}")).with_dependencies(deps.to_vec())
}

fn sorted_ids(tasks: &[Task]) -> Vec<(u32, u64)> {
    graph::tiered_order(tasks)
        .unwrap()
        .iter()
        .map(|entry| (entry.tier, entry.task.id))
        .collect()
}

#[test]
fn chain_sorts_into_increasing_tiers() {
    let tasks = vec![task(1, &[]), task(2, &[1]), task(3, &[1, 2])];
    assert_eq!(sorted_ids(&tasks), vec![(0, 1), (1, 2), (2, 3)]);
}

#[test]
fn three_cycle_is_reported_by_validator_and_sort() {
    let tasks = vec![task(1, &[3]), task(2, &[1]), task(3, &[2])];

    let report = graph::validate(&tasks);
    let cycles: Vec<&Vec<u64>> = report
        .issues
        .iter()
        .filter_map(|issue| match issue {
            GraphIssue::Cycle(path) => Some(path),
            GraphIssue::MissingDependency { .. } => None,
        })
        .collect();
    assert_eq!(cycles.len(), 1);
    for id in [1, 2, 3] {
        assert!(cycles[0].contains(&id));
    }

    let err = graph::tiered_order(&tasks).unwrap_err();
    assert!(err.is_cycle());
    assert!(!err.is_missing_reference());
}

#[test]
fn dangling_reference_is_reported_by_validator_and_sort() {
    let tasks = vec![task(1, &[99])];

    let report = graph::validate(&tasks);
    assert_eq!(
        report.messages(),
        vec!["task 1 depends on non-existent task 99".to_string()]
    );

    let err = graph::tiered_order(&tasks).unwrap_err();
    assert!(err.is_missing_reference());
    assert!(!err.is_cycle());
}

#[test]
fn mapping_survives_persist_and_restore() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".beads").join("mapping.json");

    let mut store = MappingStore::new();
    store.add_parent(1, "X-1");
    store.add_child(1, 1, "X-1.1").unwrap();
    store.persist(&path).unwrap();

    let restored = MappingStore::restore(&path).unwrap();
    assert_eq!(restored.lookup_parent(1), Some("X-1"));
    assert_eq!(restored.lookup_child(1, 1), Some("X-1.1"));
}

#[test]
fn done_closes_and_pending_does_nothing() {
    assert_eq!(status_action(Status::Done), Some(StatusAction::Close));
    assert_eq!(status_action(Status::Pending), None);

    let tasks = vec![
        task(1, &[]).with_status(Status::Done),
        task(2, &[]).with_status(Status::Pending),
    ];
    let mut store = MappingStore::new();
    let mut recorder = PlanRecorder::new();
    Migrator::new(&mut recorder, &mut store).run(&tasks).unwrap();

    let status_ops: Vec<&PlannedOp> = recorder
        .ops()
        .iter()
        .filter(|op| matches!(op, PlannedOp::Close { .. } | PlannedOp::SetStatus { .. }))
        .collect();
    assert_eq!(status_ops, vec![&PlannedOp::Close { id: "new-1".into() }]);
}

#[test]
fn sort_is_independent_of_input_order() {
    let forward = vec![
        task(1, &[]),
        task(2, &[1]),
        task(3, &[]),
        task(4, &[2, 3]),
        task(5, &[3]),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut shuffled = forward.clone();
    shuffled.swap(0, 3);
    shuffled.swap(1, 4);

    let expected = sorted_ids(&forward);
    assert_eq!(sorted_ids(&reversed), expected);
    assert_eq!(sorted_ids(&shuffled), expected);
    assert_eq!(expected, vec![(0, 1), (0, 3), (1, 2), (1, 5), (2, 4)]);
}

#[test]
fn tagged_document_migrates_end_to_end() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    fs::write(
        &path,
        r#"{
            "master": {
                "tasks": [
                    {"id": 2, "title": "Frontend", "status": "pending", "priority": "low",
                     "dependencies": [1]},
                    {"id": 1, "title": "Backend", "status": "in-progress", "priority": "high",
                     "details": "Axum service", "testStrategy": "HTTP tests",
                     "subtasks": [
                        {"id": 1, "title": "DB", "status": "done"},
                        {"id": 2, "title": "API", "status": "pending", "dependencies": [1]}
                     ]}
                ]
            }
        }"#,
    )
    .unwrap();

    let document = input::load_document(&path).unwrap();
    let mut store = MappingStore::new();
    let mut recorder = PlanRecorder::new();
    let report = Migrator::new(&mut recorder, &mut store)
        .run(&document.tasks)
        .unwrap();

    let summaries: Vec<String> = recorder.ops().iter().map(PlannedOp::summary).collect();
    assert_eq!(
        summaries,
        vec![
            "create epic new-1 \"Backend\" (priority 0)",
            "create epic new-2 \"Frontend\" (priority 2)",
            "create task new-1.1 \"DB\" under new-1",
            "create task new-1.2 \"API\" under new-1",
            "dep new-2 blocked by new-1",
            "dep new-1.2 blocked by new-1.1",
            "set new-1 status in_progress",
            "close new-1.1",
        ]
    );
    assert_eq!(report.tasks, 2);
    assert_eq!(report.subtasks, 2);
    assert_eq!(report.mapping.parent_count, 2);
    assert_eq!(report.mapping.child_count, 2);

    let PlannedOp::CreateParent { description, .. } = &recorder.ops()[0] else {
        panic!("first op should create the backend epic");
    };
    assert!(description.contains("## Implementation Details\n\nAxum service"));
    assert!(description.contains("## Test Strategy\n\nHTTP tests"));
}
