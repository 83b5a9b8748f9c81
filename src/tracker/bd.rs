use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use super::{CreatedIssue, Tracker};
use crate::error::{Result, SyncError};

/// Environment variable that overrides the `bd` executable.
pub const BD_BIN_ENV: &str = "TM2BD_BD_BIN";
pub const DEFAULT_BD_BIN: &str = "bd";

/// Runs one `bd` process per operation inside the destination project.
#[derive(Debug, Clone)]
pub struct BdCli {
    program: String,
    project: PathBuf,
}

impl BdCli {
    /// Use `$TM2BD_BD_BIN` when set, otherwise `bd` from `PATH`.
    pub fn from_env(project: impl Into<PathBuf>) -> Self {
        let program = std::env::var(BD_BIN_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BD_BIN.to_string());
        Self::with_program(program, project)
    }

    pub fn with_program(program: impl Into<String>, project: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            project: project.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn project(&self) -> &Path {
        &self.project
    }

    fn label(&self, operation: &str) -> String {
        format!("{} {operation}", self.program)
    }

    /// Run `bd` with `args`, returning stdout on success.
    fn run(&self, operation: &str, args: &[&str]) -> Result<String> {
        let command = self.label(operation);
        tracing::debug!(command = %command, ?args, "running tracker command");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.project)
            .output()
            .map_err(|source| SyncError::TrackerSpawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|code| format!("exit code {code}"))
                .unwrap_or_else(|| "a signal".to_string());
            return Err(SyncError::TrackerFailed {
                command,
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_create(&self, args: &[&str]) -> Result<CreatedIssue> {
        let stdout = self.run("create", args)?;
        parse_created(&self.label("create"), &stdout)
    }
}

/// Parse `bd create --json` output: an issue object, or a list whose first
/// element is the issue.
pub fn parse_created(command: &str, stdout: &str) -> Result<CreatedIssue> {
    let value: Value =
        serde_json::from_str(stdout.trim()).map_err(|err| SyncError::TrackerParse {
            command: command.to_string(),
            message: err.to_string(),
        })?;

    let issue = match &value {
        Value::Object(_) => &value,
        Value::Array(items) => items.first().ok_or_else(|| SyncError::TrackerParse {
            command: command.to_string(),
            message: "expected an issue object, got an empty list".to_string(),
        })?,
        other => {
            return Err(SyncError::TrackerParse {
                command: command.to_string(),
                message: format!("expected an issue object, got {other}"),
            });
        }
    };

    let id = issue
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SyncError::TrackerMissingId {
            command: command.to_string(),
        })?;
    let title = issue
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(CreatedIssue {
        id: id.to_string(),
        title: title.to_string(),
    })
}

/// Free text travels as `--flag=value` so a leading `-` is never read as an
/// option.
impl Tracker for BdCli {
    fn create_parent(
        &mut self,
        title: &str,
        description: &str,
        priority: u8,
    ) -> Result<CreatedIssue> {
        let title = format!("--title={title}");
        let description = format!("--description={description}");
        let priority = priority.to_string();
        self.run_create(&[
            "create",
            &title,
            &description,
            "--priority",
            &priority,
            "--type",
            "epic",
            "--json",
        ])
    }

    fn create_child(
        &mut self,
        parent_id: &str,
        title: &str,
        description: &str,
    ) -> Result<CreatedIssue> {
        let title = format!("--title={title}");
        let description = format!("--description={description}");
        self.run_create(&[
            "create",
            &title,
            &description,
            "--parent",
            parent_id,
            "--type",
            "task",
            "--json",
        ])
    }

    fn add_dependency(&mut self, blocked_id: &str, blocking_id: &str) -> Result<()> {
        self.run("dep add", &["dep", "add", blocked_id, blocking_id])?;
        Ok(())
    }

    fn set_status(&mut self, id: &str, status: &str) -> Result<()> {
        self.run("update", &["update", id, "--status", status])?;
        Ok(())
    }

    fn close(&mut self, id: &str) -> Result<()> {
        self.run("close", &["close", id])?;
        Ok(())
    }

    fn check_ready(&mut self) -> bool {
        if !self.project.is_dir() {
            return false;
        }
        match self.run("--version", &["--version"]) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(error = %err, "tracker readiness probe failed");
                false
            }
        }
    }
}
