//! Capability boundary to the destination issue tracker.
//!
//! The orchestrator only talks to [`Tracker`]; [`BdCli`] drives the real
//! `bd` binary and [`PlanRecorder`] records operations without performing
//! them (dry runs and tests).

pub mod bd;
pub mod recorder;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use bd::BdCli;
pub use recorder::{PlanRecorder, PlannedOp};

/// Identity of an issue the tracker just created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// One method per logical tracker operation. Calls are issued sequentially
/// and each must finish before the next one starts.
pub trait Tracker {
    fn create_parent(
        &mut self,
        title: &str,
        description: &str,
        priority: u8,
    ) -> Result<CreatedIssue>;

    fn create_child(
        &mut self,
        parent_id: &str,
        title: &str,
        description: &str,
    ) -> Result<CreatedIssue>;

    /// `blocked_id` cannot start until `blocking_id` is finished.
    fn add_dependency(&mut self, blocked_id: &str, blocking_id: &str) -> Result<()>;

    fn set_status(&mut self, id: &str, status: &str) -> Result<()>;

    fn close(&mut self, id: &str) -> Result<()>;

    fn check_ready(&mut self) -> bool;
}
