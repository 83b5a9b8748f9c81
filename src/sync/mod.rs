//! Phase-ordered migration of a task set into the tracker.
//!
//! A run walks `Validate -> Sort -> CreateParents -> CreateChildren ->
//! WireDependencies -> SyncStatuses -> Persist`. Every phase completes before
//! the next starts and the first error halts the run, leaving the mapping
//! store holding exactly what was created so far.
//!
//! Entities already present in the mapping store (a resumed run) are not
//! created again; their mapped id is reused.

pub mod compose;
pub mod status;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, SyncError};
use crate::graph::{self, SortedTask};
use crate::model::Task;
use crate::store::mapping::{MappingStats, MappingStore};
use crate::tracker::Tracker;

pub use status::{StatusAction, status_action};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Validate,
    Sort,
    CreateParents,
    CreateChildren,
    WireDependencies,
    SyncStatuses,
    Persist,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::Sort => "sort",
            Self::CreateParents => "create parents",
            Self::CreateChildren => "create children",
            Self::WireDependencies => "wire dependencies",
            Self::SyncStatuses => "sync statuses",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierBatch {
    pub tier: u32,
    pub task_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub tasks: usize,
    pub subtasks: usize,
    pub tiers: Vec<TierBatch>,
    pub parents_created: usize,
    pub parents_reused: usize,
    pub children_created: usize,
    pub children_reused: usize,
    pub task_dependencies: usize,
    pub subtask_dependencies: usize,
    pub closed: usize,
    pub status_updates: usize,
    pub mapping: MappingStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_path: Option<PathBuf>,
}

/// Drives one synchronization run against a tracker.
///
/// The migrator is the only writer of the mapping store for the duration of
/// the run. Without [`Migrator::persist_to`] the Persist phase is a no-op,
/// which is what dry runs use.
pub struct Migrator<'a, T: Tracker> {
    tracker: &'a mut T,
    store: &'a mut MappingStore,
    mapping_path: Option<&'a Path>,
    phase: Phase,
}

impl<'a, T: Tracker> Migrator<'a, T> {
    pub fn new(tracker: &'a mut T, store: &'a mut MappingStore) -> Self {
        Self {
            tracker,
            store,
            mapping_path: None,
            phase: Phase::Validate,
        }
    }

    pub fn persist_to(mut self, path: &'a Path) -> Self {
        self.mapping_path = Some(path);
        self
    }

    /// The phase the run is in, or halted in after an error.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run(&mut self, tasks: &[Task]) -> Result<SyncReport> {
        let mut report = SyncReport {
            tasks: tasks.len(),
            subtasks: tasks.iter().map(|task| task.subtasks.len()).sum(),
            ..SyncReport::default()
        };

        self.enter(Phase::Validate);
        validate_graph(tasks)?;

        self.enter(Phase::Sort);
        let sorted = graph::tiered_order(tasks)?;
        report.tiers = graph::tier_batches(&sorted)
            .into_iter()
            .map(|(tier, task_ids)| TierBatch { tier, task_ids })
            .collect();
        for batch in &report.tiers {
            tracing::debug!(tier = batch.tier, tasks = ?batch.task_ids, "creation batch");
        }

        self.enter(Phase::CreateParents);
        self.create_parents(&sorted, &mut report)?;

        self.enter(Phase::CreateChildren);
        self.create_children(&sorted, &mut report)?;

        self.enter(Phase::WireDependencies);
        let (task_edges, subtask_edges) = self.wire_dependencies(&sorted)?;
        report.task_dependencies = task_edges;
        report.subtask_dependencies = subtask_edges;

        self.enter(Phase::SyncStatuses);
        self.sync_statuses(&sorted, &mut report)?;

        self.enter(Phase::Persist);
        if let Some(path) = self.mapping_path {
            self.store.persist(path)?;
            tracing::info!(path = %path.display(), "mapping saved");
            report.mapping_path = Some(path.to_path_buf());
        }

        report.mapping = self.store.stats();
        Ok(report)
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        tracing::info!(phase = %phase, "phase started");
    }

    fn create_parents(&mut self, sorted: &[SortedTask<'_>], report: &mut SyncReport) -> Result<()> {
        for entry in sorted {
            let task = entry.task;
            if let Some(existing) = self.store.lookup_parent(task.id) {
                tracing::info!(task = task.id, issue = existing, "task already migrated, reusing");
                report.parents_reused += 1;
                continue;
            }

            let description = compose::parent_description(task);
            let created = self.tracker.create_parent(
                &task.title,
                &description,
                task.priority.tracker_level(),
            )?;
            tracing::debug!(task = task.id, tier = entry.tier, issue = %created.id, "created epic");
            self.store.add_parent(task.id, created.id);
            report.parents_created += 1;
        }
        Ok(())
    }

    fn create_children(
        &mut self,
        sorted: &[SortedTask<'_>],
        report: &mut SyncReport,
    ) -> Result<()> {
        for entry in sorted {
            let task = entry.task;
            if task.subtasks.is_empty() {
                continue;
            }
            let parent_id = self
                .store
                .lookup_parent(task.id)
                .ok_or(SyncError::ParentNotMapped(task.id))?
                .to_string();

            for subtask in task.subtasks_by_id() {
                if let Some(existing) = self.store.lookup_child(task.id, subtask.id) {
                    tracing::info!(
                        task = task.id,
                        subtask = subtask.id,
                        issue = existing,
                        "subtask already migrated, reusing"
                    );
                    report.children_reused += 1;
                    continue;
                }

                let description = compose::child_description(subtask);
                let created =
                    self.tracker
                        .create_child(&parent_id, &subtask.title, &description)?;
                tracing::debug!(
                    task = task.id,
                    subtask = subtask.id,
                    issue = %created.id,
                    "created child"
                );
                self.store.add_child(task.id, subtask.id, created.id)?;
                report.children_created += 1;
            }
        }
        Ok(())
    }

    /// Returns `(task edges, subtask edges)`.
    fn wire_dependencies(&mut self, sorted: &[SortedTask<'_>]) -> Result<(usize, usize)> {
        let mut task_edges = 0;
        for entry in sorted {
            let task = entry.task;
            if task.dependencies.is_empty() {
                continue;
            }
            let blocked = self
                .store
                .lookup_parent(task.id)
                .ok_or(SyncError::ParentNotMapped(task.id))?;
            for &dep in &task.dependencies {
                let blocking = self
                    .store
                    .lookup_parent(dep)
                    .ok_or(SyncError::ParentNotMapped(dep))?;
                self.tracker.add_dependency(blocked, blocking)?;
                tracing::debug!(blocked, blocking, "wired task dependency");
                task_edges += 1;
            }
        }

        let mut subtask_edges = 0;
        for entry in sorted {
            let task = entry.task;
            for subtask in task.subtasks_by_id() {
                if subtask.dependencies.is_empty() {
                    continue;
                }
                let blocked = self.store.lookup_child(task.id, subtask.id).ok_or(
                    SyncError::ChildNotMapped {
                        task: task.id,
                        subtask: subtask.id,
                    },
                )?;
                for &dep in &subtask.dependencies {
                    let blocking = self.store.lookup_child(task.id, dep).ok_or(
                        SyncError::ChildNotMapped {
                            task: task.id,
                            subtask: dep,
                        },
                    )?;
                    self.tracker.add_dependency(blocked, blocking)?;
                    tracing::debug!(blocked, blocking, "wired subtask dependency");
                    subtask_edges += 1;
                }
            }
        }

        tracing::info!(task_edges, subtask_edges, "dependencies wired");
        Ok((task_edges, subtask_edges))
    }

    fn sync_statuses(&mut self, sorted: &[SortedTask<'_>], report: &mut SyncReport) -> Result<()> {
        for entry in sorted {
            let task = entry.task;
            let id = self
                .store
                .lookup_parent(task.id)
                .ok_or(SyncError::ParentNotMapped(task.id))?;
            apply_status(self.tracker, id, status_action(task.status), report)?;

            for subtask in task.subtasks_by_id() {
                let id = self.store.lookup_child(task.id, subtask.id).ok_or(
                    SyncError::ChildNotMapped {
                        task: task.id,
                        subtask: subtask.id,
                    },
                )?;
                apply_status(self.tracker, id, status_action(subtask.status), report)?;
            }
        }
        Ok(())
    }
}

fn apply_status<T: Tracker>(
    tracker: &mut T,
    id: &str,
    action: Option<StatusAction>,
    report: &mut SyncReport,
) -> Result<()> {
    match action {
        Some(StatusAction::Close) => {
            tracker.close(id)?;
            tracing::debug!(issue = id, "closed");
            report.closed += 1;
        }
        Some(StatusAction::SetStatus(status)) => {
            tracker.set_status(id, status)?;
            tracing::debug!(issue = id, status, "status updated");
            report.status_updates += 1;
        }
        None => {}
    }
    Ok(())
}

/// Reject dangling references first; only a referentially complete graph is
/// checked for cycles.
fn validate_graph(tasks: &[Task]) -> Result<()> {
    let missing = graph::check_references(tasks);
    if !missing.is_valid() {
        return Err(SyncError::MissingDependencies(missing.messages()));
    }
    let cycles = graph::check_acyclic(tasks);
    if !cycles.is_valid() {
        return Err(SyncError::DependencyCycles(cycles.messages()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Status, Subtask};
    use crate::tracker::{PlanRecorder, PlannedOp};
    use tempfile::tempdir;

    fn task(id: u64, deps: &[u64]) -> Task {
        Task::new(id, format!("task {id}")).with_dependencies(deps.to_vec())
    }

    fn run(tasks: &[Task], store: &mut MappingStore) -> (Result<SyncReport>, Vec<PlannedOp>, Phase) {
        let mut recorder = PlanRecorder::new();
        let (result, phase) = {
            let mut migrator = Migrator::new(&mut recorder, store);
            let result = migrator.run(tasks);
            (result, migrator.phase())
        };
        (result, recorder.into_ops(), phase)
    }

    fn created_titles(ops: &[PlannedOp]) -> Vec<String> {
        ops.iter()
            .filter_map(|op| match op {
                PlannedOp::CreateParent { title, .. } | PlannedOp::CreateChild { title, .. } => {
                    Some(title.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parents_are_created_in_tier_order() {
        let tasks = vec![task(3, &[1, 2]), task(2, &[1]), task(1, &[])];
        let mut store = MappingStore::new();
        let (result, ops, _) = run(&tasks, &mut store);
        let report = result.unwrap();

        assert_eq!(created_titles(&ops), vec!["task 1", "task 2", "task 3"]);
        assert_eq!(store.lookup_parent(1), Some("new-1"));
        assert_eq!(store.lookup_parent(3), Some("new-3"));
        assert_eq!(report.parents_created, 3);
        assert_eq!(
            report.tiers,
            vec![
                TierBatch { tier: 0, task_ids: vec![1] },
                TierBatch { tier: 1, task_ids: vec![2] },
                TierBatch { tier: 2, task_ids: vec![3] },
            ]
        );
    }

    #[test]
    fn priority_and_description_reach_the_tracker() {
        let mut high = task(1, &[]);
        high.priority = Priority::High;
        high.description = "Top".into();
        let mut low = task(2, &[]);
        low.priority = Priority::Low;

        let mut store = MappingStore::new();
        let (result, ops, _) = run(&[high, low], &mut store);
        result.unwrap();

        let PlannedOp::CreateParent {
            priority,
            description,
            ..
        } = &ops[0]
        else {
            panic!("expected parent creation first");
        };
        assert_eq!(*priority, 0);
        assert!(description.starts_with("Top\n\n---"));
        assert!(description.contains("- Task Master ID: 1"));
        assert!(matches!(&ops[1], PlannedOp::CreateParent { priority: 2, .. }));
    }

    #[test]
    fn children_follow_all_parents_in_ascending_id_order() {
        let tasks = vec![
            task(1, &[]).with_subtasks(vec![Subtask::new(2, "b"), Subtask::new(1, "a")]),
            task(2, &[]),
        ];
        let mut store = MappingStore::new();
        let (result, ops, _) = run(&tasks, &mut store);
        let report = result.unwrap();

        assert_eq!(created_titles(&ops), vec!["task 1", "task 2", "a", "b"]);
        assert_eq!(store.lookup_child(1, 1), Some("new-1.1"));
        assert_eq!(store.lookup_child(1, 2), Some("new-1.2"));
        assert_eq!(report.children_created, 2);
        assert_eq!(report.mapping.child_count, 2);
    }

    #[test]
    fn dependencies_are_wired_in_source_order_within_parent_scope() {
        let tasks = vec![
            task(1, &[]).with_subtasks(vec![
                Subtask::new(1, "a"),
                Subtask::new(2, "b").with_dependencies(vec![1]),
            ]),
            task(2, &[]).with_subtasks(vec![Subtask::new(1, "c")]),
            task(3, &[2, 1]),
        ];
        let mut store = MappingStore::new();
        let (result, ops, _) = run(&tasks, &mut store);
        let report = result.unwrap();

        let edges: Vec<(String, String)> = ops
            .iter()
            .filter_map(|op| match op {
                PlannedOp::AddDependency {
                    blocked_id,
                    blocking_id,
                } => Some((blocked_id.clone(), blocking_id.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            edges,
            vec![
                ("new-3".to_string(), "new-2".to_string()),
                ("new-3".to_string(), "new-1".to_string()),
                ("new-1.2".to_string(), "new-1.1".to_string()),
            ]
        );
        assert_eq!(report.task_dependencies, 2);
        assert_eq!(report.subtask_dependencies, 1);
    }

    #[test]
    fn unresolved_subtask_dependency_is_fatal() {
        let tasks = vec![
            task(1, &[]).with_subtasks(vec![Subtask::new(1, "a").with_dependencies(vec![9])]),
        ];
        let mut store = MappingStore::new();
        let (result, _, phase) = run(&tasks, &mut store);
        let err = result.unwrap_err();
        assert!(matches!(err, SyncError::ChildNotMapped { task: 1, subtask: 9 }));
        assert_eq!(phase, Phase::WireDependencies);
    }

    #[test]
    fn statuses_map_to_single_actions() {
        let tasks = vec![
            task(1, &[]).with_status(Status::Done),
            task(2, &[]).with_status(Status::Pending),
            task(3, &[]).with_status(Status::InProgress).with_subtasks(vec![
                Subtask::new(1, "x").with_status(Status::Cancelled),
                Subtask::new(2, "y").with_status(Status::Blocked),
                Subtask::new(3, "z"),
            ]),
            task(4, &[]).with_status(Status::Deferred),
        ];
        let mut store = MappingStore::new();
        let (result, ops, _) = run(&tasks, &mut store);
        let report = result.unwrap();

        let status_ops: Vec<&PlannedOp> = ops
            .iter()
            .filter(|op| matches!(op, PlannedOp::Close { .. } | PlannedOp::SetStatus { .. }))
            .collect();
        assert_eq!(
            status_ops,
            vec![
                &PlannedOp::Close { id: "new-1".into() },
                &PlannedOp::SetStatus {
                    id: "new-3".into(),
                    status: "in_progress".into()
                },
                &PlannedOp::Close {
                    id: "new-3.1".into()
                },
                &PlannedOp::SetStatus {
                    id: "new-3.2".into(),
                    status: "blocked".into()
                },
                &PlannedOp::SetStatus {
                    id: "new-4".into(),
                    status: "deferred".into()
                },
            ]
        );
        assert_eq!(report.closed, 2);
        assert_eq!(report.status_updates, 3);
    }

    #[test]
    fn validation_failures_stop_before_any_tracker_call() {
        let mut store = MappingStore::new();
        let (result, ops, phase) = run(&[task(1, &[99])], &mut store);
        let err = result.unwrap_err();
        assert!(matches!(err, SyncError::MissingDependencies(ref lines) if lines.len() == 1));
        assert!(ops.is_empty());
        assert_eq!(phase, Phase::Validate);

        let (result, ops, _) = run(&[task(1, &[2]), task(2, &[1])], &mut store);
        let err = result.unwrap_err();
        assert!(err.is_cycle());
        assert!(ops.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn resume_skips_already_mapped_entities() {
        let tasks = vec![
            task(1, &[]).with_subtasks(vec![Subtask::new(1, "a"), Subtask::new(2, "b")]),
            task(2, &[1]),
        ];
        let mut store = MappingStore::new();
        store.add_parent(1, "bd-1");
        store.add_child(1, 1, "bd-1.1").unwrap();

        let (result, ops, _) = run(&tasks, &mut store);
        let report = result.unwrap();

        assert_eq!(created_titles(&ops), vec!["task 2", "b"]);
        assert!(ops.contains(&PlannedOp::CreateChild {
            id: "new-bd-1.1".into(),
            parent_id: "bd-1".into(),
            title: "b".into(),
            description: String::new(),
        }));
        assert!(ops.contains(&PlannedOp::AddDependency {
            blocked_id: "new-1".into(),
            blocking_id: "bd-1".into(),
        }));
        assert_eq!(report.parents_reused, 1);
        assert_eq!(report.children_reused, 1);
        assert_eq!(report.parents_created, 1);
        assert_eq!(report.children_created, 1);
        assert_eq!(store.lookup_parent(1), Some("bd-1"));
    }

    #[test]
    fn planned_children_never_reuse_restored_ids() {
        let tasks = vec![task(1, &[]).with_subtasks(vec![
            Subtask::new(1, "a"),
            Subtask::new(2, "b").with_dependencies(vec![1]),
        ])];
        let mut store = MappingStore::new();
        store.add_parent(1, "bd-1");
        store.add_child(1, 1, "bd-1.1").unwrap();

        let (result, ops, _) = run(&tasks, &mut store);
        result.unwrap();

        assert_eq!(store.lookup_child(1, 1), Some("bd-1.1"));
        assert_eq!(store.lookup_child(1, 2), Some("new-bd-1.1"));
        let edges: Vec<&PlannedOp> = ops
            .iter()
            .filter(|op| matches!(op, PlannedOp::AddDependency { .. }))
            .collect();
        assert_eq!(
            edges,
            vec![&PlannedOp::AddDependency {
                blocked_id: "new-bd-1.1".into(),
                blocking_id: "bd-1.1".into(),
            }]
        );
    }

    #[test]
    fn tracker_failure_halts_with_partial_mapping() {
        let tasks = vec![task(1, &[]), task(2, &[]), task(3, &[])];
        let mut store = MappingStore::new();
        let mut recorder = PlanRecorder::new().failing_after(2);
        let mut migrator = Migrator::new(&mut recorder, &mut store);
        let err = migrator.run(&tasks).unwrap_err();
        assert!(matches!(err, SyncError::TrackerFailed { .. }));
        assert_eq!(migrator.phase(), Phase::CreateParents);

        assert_eq!(store.stats().parent_count, 2);
        assert_eq!(store.lookup_parent(3), None);
    }

    #[test]
    fn persist_phase_writes_mapping_only_on_success() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let tasks = vec![task(1, &[])];

        let mut store = MappingStore::new();
        let mut failing = PlanRecorder::new().failing_after(0);
        let result = Migrator::new(&mut failing, &mut store)
            .persist_to(&path)
            .run(&tasks);
        assert!(result.is_err());
        assert!(!MappingStore::exists(&path));

        let mut recorder = PlanRecorder::new();
        let report = Migrator::new(&mut recorder, &mut store)
            .persist_to(&path)
            .run(&tasks)
            .unwrap();
        assert_eq!(report.mapping_path.as_deref(), Some(path.as_path()));
        let restored = MappingStore::restore(&path).unwrap();
        assert_eq!(restored.lookup_parent(1), Some("new-1"));
    }

    #[test]
    fn second_run_over_restored_mapping_creates_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let tasks = vec![
            task(1, &[]).with_subtasks(vec![Subtask::new(1, "a")]),
            task(2, &[1]),
        ];

        let mut store = MappingStore::new();
        let mut first = PlanRecorder::new();
        Migrator::new(&mut first, &mut store)
            .persist_to(&path)
            .run(&tasks)
            .unwrap();

        let mut restored = MappingStore::restore(&path).unwrap();
        let mut second = PlanRecorder::new();
        let report = Migrator::new(&mut second, &mut restored)
            .persist_to(&path)
            .run(&tasks)
            .unwrap();

        assert!(created_titles(second.ops()).is_empty());
        assert_eq!(report.parents_reused, 2);
        assert_eq!(report.children_reused, 1);
    }
}
