use std::collections::HashMap;

use super::Mark;
use crate::error::{Result, SyncError};
use crate::model::Task;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortedTask<'a> {
    pub task: &'a Task,
    pub tier: u32,
}

/// Order tasks so every dependency precedes its dependents.
///
/// Each task gets `tier = 1 + max(tier of its dependencies)`, or `0` with no
/// dependencies. The result is ordered by `(tier, id)`, so the output does
/// not depend on input order. Does not trust prior validation: an unknown
/// dependency fails with [`SyncError::UnresolvedDependency`] and a cycle with
/// [`SyncError::DependencyCycle`].
pub fn tiered_order(tasks: &[Task]) -> Result<Vec<SortedTask<'_>>> {
    let by_id: HashMap<u64, &Task> = tasks.iter().map(|task| (task.id, task)).collect();
    let mut roots: Vec<u64> = by_id.keys().copied().collect();
    roots.sort_unstable();

    let mut marks: HashMap<u64, Mark> = HashMap::with_capacity(by_id.len());
    let mut tiers: HashMap<u64, u32> = HashMap::with_capacity(by_id.len());

    for root in roots {
        if marks.contains_key(&root) {
            continue;
        }

        let mut stack: Vec<(u64, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Visiting);

        while let Some((current, next)) = stack.last().copied() {
            let deps = by_id
                .get(&current)
                .map(|task| task.dependencies.as_slice())
                .unwrap_or_default();

            if let Some(&dep) = deps.get(next) {
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                if !by_id.contains_key(&dep) {
                    return Err(SyncError::UnresolvedDependency {
                        task: current,
                        missing: dep,
                    });
                }
                match marks.get(&dep) {
                    Some(Mark::Visited) => {}
                    Some(Mark::Visiting) => {
                        let start = stack
                            .iter()
                            .position(|(id, _)| *id == dep)
                            .unwrap_or_default();
                        let mut path: Vec<u64> =
                            stack[start..].iter().map(|(id, _)| *id).collect();
                        path.push(dep);
                        return Err(SyncError::DependencyCycle(path));
                    }
                    None => {
                        marks.insert(dep, Mark::Visiting);
                        stack.push((dep, 0));
                    }
                }
                continue;
            }

            let tier = deps
                .iter()
                .filter_map(|dep| tiers.get(dep))
                .map(|tier| tier + 1)
                .max()
                .unwrap_or(0);
            tiers.insert(current, tier);
            marks.insert(current, Mark::Visited);
            stack.pop();
        }
    }

    let mut sorted: Vec<SortedTask<'_>> = tasks
        .iter()
        .map(|task| SortedTask {
            task,
            tier: tiers.get(&task.id).copied().unwrap_or_default(),
        })
        .collect();
    sorted.sort_by_key(|entry| (entry.tier, entry.task.id));
    Ok(sorted)
}

/// Group a sorted list into `(tier, task ids)` batches for reporting.
pub fn tier_batches(sorted: &[SortedTask<'_>]) -> Vec<(u32, Vec<u64>)> {
    let mut batches: Vec<(u32, Vec<u64>)> = Vec::new();
    for entry in sorted {
        match batches.last_mut() {
            Some((tier, ids)) if *tier == entry.tier => ids.push(entry.task.id),
            _ => batches.push((entry.tier, vec![entry.task.id])),
        }
    }
    batches
}
