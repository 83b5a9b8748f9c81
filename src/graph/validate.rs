use std::collections::{HashMap, HashSet};

use super::Mark;
use crate::model::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    MissingDependency { task: u64, missing: u64 },
    /// Traversal-order path that starts and ends on the repeated task.
    Cycle(Vec<u64>),
}

impl GraphIssue {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }
}

impl std::fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDependency { task, missing } => {
                write!(f, "task {task} depends on non-existent task {missing}")
            }
            Self::Cycle(path) => {
                let rendered = path
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                write!(f, "cycle: {rendered}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphReport {
    pub issues: Vec<GraphIssue>,
}

impl GraphReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub fn missing(&self) -> impl Iterator<Item = &GraphIssue> {
        self.issues.iter().filter(|issue| !issue.is_cycle())
    }

    pub fn cycles(&self) -> impl Iterator<Item = &GraphIssue> {
        self.issues.iter().filter(|issue| issue.is_cycle())
    }
}

/// Every dependency must name a task in the set. Reports all misses.
pub fn check_references(tasks: &[Task]) -> GraphReport {
    let ids: HashSet<u64> = tasks.iter().map(|task| task.id).collect();
    let mut issues = Vec::new();
    for task in tasks {
        for &dep in &task.dependencies {
            if !ids.contains(&dep) {
                issues.push(GraphIssue::MissingDependency {
                    task: task.id,
                    missing: dep,
                });
            }
        }
    }
    GraphReport { issues }
}

/// Find cycles with an iterative three-color DFS. Dependencies on unknown ids
/// are ignored here; [`check_references`] reports them.
pub fn check_acyclic(tasks: &[Task]) -> GraphReport {
    let deps: HashMap<u64, &[u64]> = tasks
        .iter()
        .map(|task| (task.id, task.dependencies.as_slice()))
        .collect();
    let mut marks: HashMap<u64, Mark> = HashMap::with_capacity(tasks.len());
    let mut issues = Vec::new();

    for task in tasks {
        if marks.contains_key(&task.id) {
            continue;
        }

        // (task id, index of the next dependency to inspect)
        let mut stack: Vec<(u64, usize)> = vec![(task.id, 0)];
        marks.insert(task.id, Mark::Visiting);

        while let Some((current, next)) = stack.last().copied() {
            let edges = deps.get(&current).copied().unwrap_or(&[]);
            let Some(&dep) = edges.get(next) else {
                marks.insert(current, Mark::Visited);
                stack.pop();
                continue;
            };
            if let Some(frame) = stack.last_mut() {
                frame.1 += 1;
            }
            if !deps.contains_key(&dep) {
                continue;
            }

            match marks.get(&dep) {
                Some(Mark::Visited) => {}
                Some(Mark::Visiting) => {
                    let start = stack
                        .iter()
                        .position(|(id, _)| *id == dep)
                        .unwrap_or_default();
                    let mut path: Vec<u64> = stack[start..].iter().map(|(id, _)| *id).collect();
                    path.push(dep);
                    issues.push(GraphIssue::Cycle(path));
                }
                None => {
                    marks.insert(dep, Mark::Visiting);
                    stack.push((dep, 0));
                }
            }
        }
    }

    GraphReport { issues }
}

/// Both checks, missing references first.
pub fn validate(tasks: &[Task]) -> GraphReport {
    let mut report = check_references(tasks);
    report.issues.extend(check_acyclic(tasks).issues);
    report
}
