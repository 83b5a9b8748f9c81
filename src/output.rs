use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::sync::SyncReport;
use crate::tracker::PlannedOp;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

/// Everything a finished `sync` invocation reports on stdout.
#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub dry_run: bool,
    pub report: SyncReport,
    /// Tracker operations a dry run would have performed, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plan: Vec<PlannedOp>,
}

pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() > max_len {
        let truncated: String = title.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}

pub fn print_outcome(outcome: &SyncOutcome, format: Format) -> Result<()> {
    let report = &outcome.report;
    match format {
        Format::Json => println!("{}", serde_json::to_string(outcome)?),
        Format::Pretty => {
            let headline = if outcome.dry_run {
                format!(
                    "Dry run: {} tasks, {} subtasks (nothing sent to the tracker)",
                    report.tasks, report.subtasks
                )
            } else {
                format!(
                    "Synced {} tasks, {} subtasks",
                    report.tasks, report.subtasks
                )
            };
            println!("{}", headline.bold());

            for batch in &report.tiers {
                let ids: Vec<String> = batch.task_ids.iter().map(u64::to_string).collect();
                println!("  tier {}: {}", batch.tier, ids.join(", "));
            }

            println!(
                "  epics:   {} created, {} reused",
                report.parents_created.to_string().green(),
                report.parents_reused
            );
            println!(
                "  tasks:   {} created, {} reused",
                report.children_created.to_string().green(),
                report.children_reused
            );
            println!(
                "  deps:    {} task, {} subtask",
                report.task_dependencies, report.subtask_dependencies
            );
            println!(
                "  status:  {} closed, {} updated",
                report.closed, report.status_updates
            );
            if let Some(path) = &report.mapping_path {
                println!("  mapping: {}", path.display().to_string().cyan());
            }

            if !outcome.plan.is_empty() {
                println!();
                println!("{}", "Planned operations:".bold());
                for (index, op) in outcome.plan.iter().enumerate() {
                    println!("  {:>3}. {}", index + 1, truncate_title(&op.summary(), 96));
                }
            }
        }
        Format::Minimal => {
            let mode = if outcome.dry_run { "dry-run" } else { "synced" };
            println!(
                "{} tasks={} subtasks={} epics={}+{} children={}+{} deps={}+{} closed={} updated={}",
                mode,
                report.tasks,
                report.subtasks,
                report.parents_created,
                report.parents_reused,
                report.children_created,
                report.children_reused,
                report.task_dependencies,
                report.subtask_dependencies,
                report.closed,
                report.status_updates,
            );
            for op in &outcome.plan {
                println!("{}", op.summary());
            }
        }
    }
    Ok(())
}
