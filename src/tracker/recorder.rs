use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{CreatedIssue, Tracker};
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlannedOp {
    CreateParent {
        id: String,
        title: String,
        priority: u8,
        description: String,
    },
    CreateChild {
        id: String,
        parent_id: String,
        title: String,
        description: String,
    },
    AddDependency {
        blocked_id: String,
        blocking_id: String,
    },
    SetStatus {
        id: String,
        status: String,
    },
    Close {
        id: String,
    },
}

impl PlannedOp {
    /// One-line human rendering used by dry-run output.
    pub fn summary(&self) -> String {
        match self {
            Self::CreateParent {
                id,
                title,
                priority,
                ..
            } => format!("create epic {id} \"{title}\" (priority {priority})"),
            Self::CreateChild {
                id,
                parent_id,
                title,
                ..
            } => format!("create task {id} \"{title}\" under {parent_id}"),
            Self::AddDependency {
                blocked_id,
                blocking_id,
            } => format!("dep {blocked_id} blocked by {blocking_id}"),
            Self::SetStatus { id, status } => format!("set {id} status {status}"),
            Self::Close { id } => format!("close {id}"),
        }
    }
}

/// A tracker that performs nothing. It hands out placeholder ids
/// (`new-1`, `new-1.1`, ...) and records every requested operation in order.
///
/// Every issued id starts with `new-`. Children of a parent the recorder did
/// not issue itself (one restored from a mapping) get `new-<parent>.<n>`, so
/// they never shadow the tracker's own `<parent>.<n>` ids.
#[derive(Debug, Default)]
pub struct PlanRecorder {
    ops: Vec<PlannedOp>,
    parents_issued: usize,
    issued_parent_ids: HashSet<String>,
    children_issued: HashMap<String, usize>,
    fail_after: Option<usize>,
    not_ready: bool,
}

impl PlanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed for the first `count` operations, then fail every call.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.not_ready = true;
        self
    }

    pub fn ops(&self) -> &[PlannedOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<PlannedOp> {
        self.ops
    }

    fn record(&mut self, op: PlannedOp) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.ops.len() >= limit) {
            return Err(SyncError::TrackerFailed {
                command: "recorder".to_string(),
                status: "exit code 1".to_string(),
                stderr: format!("refusing {}", op.summary()),
            });
        }
        self.ops.push(op);
        Ok(())
    }
}

impl Tracker for PlanRecorder {
    fn create_parent(
        &mut self,
        title: &str,
        description: &str,
        priority: u8,
    ) -> Result<CreatedIssue> {
        let id = format!("new-{}", self.parents_issued + 1);
        self.record(PlannedOp::CreateParent {
            id: id.clone(),
            title: title.to_string(),
            priority,
            description: description.to_string(),
        })?;
        self.parents_issued += 1;
        self.issued_parent_ids.insert(id.clone());
        Ok(CreatedIssue {
            id,
            title: title.to_string(),
        })
    }

    fn create_child(
        &mut self,
        parent_id: &str,
        title: &str,
        description: &str,
    ) -> Result<CreatedIssue> {
        let issued = self.children_issued.get(parent_id).copied().unwrap_or(0);
        let id = if self.issued_parent_ids.contains(parent_id) {
            format!("{parent_id}.{}", issued + 1)
        } else {
            format!("new-{parent_id}.{}", issued + 1)
        };
        self.record(PlannedOp::CreateChild {
            id: id.clone(),
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        })?;
        self.children_issued
            .insert(parent_id.to_string(), issued + 1);
        Ok(CreatedIssue {
            id,
            title: title.to_string(),
        })
    }

    fn add_dependency(&mut self, blocked_id: &str, blocking_id: &str) -> Result<()> {
        self.record(PlannedOp::AddDependency {
            blocked_id: blocked_id.to_string(),
            blocking_id: blocking_id.to_string(),
        })
    }

    fn set_status(&mut self, id: &str, status: &str) -> Result<()> {
        self.record(PlannedOp::SetStatus {
            id: id.to_string(),
            status: status.to_string(),
        })
    }

    fn close(&mut self, id: &str) -> Result<()> {
        self.record(PlannedOp::Close { id: id.to_string() })
    }

    fn check_ready(&mut self) -> bool {
        !self.not_ready
    }
}
