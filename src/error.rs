use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("input file '{}' not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to read input file '{}': {source}", .path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input file '{}' is not valid JSON: {message}", .path.display())]
    InputMalformed { path: PathBuf, message: String },

    #[error(
        "input file '{}' failed schema validation:\n  {}",
        .path.display(),
        .violations.join("\n  ")
    )]
    InputSchema {
        path: PathBuf,
        violations: Vec<String>,
    },

    #[error("missing dependency references:\n  {}", .0.join("\n  "))]
    MissingDependencies(Vec<String>),

    #[error("dependency cycles detected:\n  {}", .0.join("\n  "))]
    DependencyCycles(Vec<String>),

    #[error("task {task} depends on task {missing}, which is not in the task set")]
    UnresolvedDependency { task: u64, missing: u64 },

    #[error("dependency cycle: {}", render_path(.0))]
    DependencyCycle(Vec<u64>),

    #[error("no mapping for task {0} (parents must be created before children and dependencies)")]
    ParentNotMapped(u64),

    #[error("no mapping for subtask {task}.{subtask}")]
    ChildNotMapped { task: u64, subtask: u64 },

    #[error("mapping file '{}' is corrupt: {message}", .path.display())]
    MappingCorrupt { path: PathBuf, message: String },

    #[error(
        "mapping file '{}' already exists; pass --resume to continue the previous migration or --force to start over",
        .0.display()
    )]
    MappingExists(PathBuf),

    #[error("could not run `{command}`: {source}")]
    TrackerSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    TrackerFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}`: failed to parse output: {message}")]
    TrackerParse { command: String, message: String },

    #[error("`{command}`: missing id field in output")]
    TrackerMissingId { command: String },

    #[error("issue tracker is not ready in '{}' (is `bd` installed and the project initialized?)", .0.display())]
    TrackerNotReady(PathBuf),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn render_path(path: &[u64]) -> String {
    path.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputNotFound(_) => "input_not_found",
            Self::InputRead { .. } => "input_read",
            Self::InputMalformed { .. } => "input_malformed",
            Self::InputSchema { .. } => "input_schema",
            Self::MissingDependencies(_) => "missing_dependencies",
            Self::DependencyCycles(_) => "dependency_cycles",
            Self::UnresolvedDependency { .. } => "unresolved_dependency",
            Self::DependencyCycle(_) => "dependency_cycle",
            Self::ParentNotMapped(_) => "parent_not_mapped",
            Self::ChildNotMapped { .. } => "child_not_mapped",
            Self::MappingCorrupt { .. } => "mapping_corrupt",
            Self::MappingExists(_) => "mapping_exists",
            Self::TrackerSpawn { .. } => "tracker_spawn",
            Self::TrackerFailed { .. } => "tracker_failed",
            Self::TrackerParse { .. } => "tracker_parse",
            Self::TrackerMissingId { .. } => "tracker_missing_id",
            Self::TrackerNotReady(_) => "tracker_not_ready",
            Self::Locked(_) => "locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// True for both validator and sort cycle findings.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::DependencyCycles(_) | Self::DependencyCycle(_))
    }

    /// True for both validator and sort missing-reference findings.
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self,
            Self::MissingDependencies(_) | Self::UnresolvedDependency { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
