use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::input;
use crate::output::{self, Format, SyncOutcome};
use crate::store::lock::RunLock;
use crate::store::mapping::MappingStore;
use crate::sync::{Migrator, SyncReport};
use crate::tracker::{BdCli, PlanRecorder, PlannedOp, Tracker};

/// Mapping file location relative to the destination project.
pub const DEFAULT_MAPPING_FILE: &str = ".beads/taskmaster-mapping.json";

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub input: PathBuf,
    pub project: PathBuf,
    pub dry_run: bool,
    pub force: bool,
    pub resume: bool,
    pub mapping: Option<PathBuf>,
}

impl SyncOptions {
    pub fn mapping_path(&self) -> PathBuf {
        self.mapping
            .clone()
            .unwrap_or_else(|| self.project.join(DEFAULT_MAPPING_FILE))
    }
}

pub fn run(opts: &SyncOptions, format: Format) -> Result<()> {
    let outcome = if opts.dry_run {
        let (report, plan) = plan(opts)?;
        SyncOutcome {
            dry_run: true,
            report,
            plan,
        }
    } else {
        let mut tracker = BdCli::from_env(&opts.project);
        let report = execute(opts, &mut tracker)?;
        SyncOutcome {
            dry_run: false,
            report,
            plan: Vec::new(),
        }
    };
    output::print_outcome(&outcome, format)
}

/// Perform a real run against `tracker`.
///
/// The mapping file is protected by a run lock. An existing mapping aborts
/// the run unless `force` (start over) or `resume` (continue from it) is set.
/// When the run fails after creating anything, the partial mapping is
/// written so that a later `--resume` can pick up where this run stopped.
pub fn execute<T: Tracker>(opts: &SyncOptions, tracker: &mut T) -> Result<SyncReport> {
    let document = input::load_document(&opts.input)?;
    tracing::info!(
        input = %opts.input.display(),
        tasks = document.tasks.len(),
        "input loaded"
    );

    if !tracker.check_ready() {
        return Err(SyncError::TrackerNotReady(opts.project.clone()));
    }

    let mapping_path = opts.mapping_path();
    let lock = RunLock::acquire(&mapping_path)?;
    tracing::debug!(lock = %lock.path().display(), "run lock acquired");

    let mut store = starting_store(opts, &mapping_path)?;

    let result = Migrator::new(tracker, &mut store)
        .persist_to(&mapping_path)
        .run(&document.tasks);

    if result.is_err() && !store.is_empty() {
        checkpoint(&store, &mapping_path);
    }

    if let Err(err) = lock.release() {
        tracing::warn!(error = %err, "failed to release run lock");
    }
    result
}

/// Preview a run: every tracker call is recorded instead of performed and
/// nothing is written. With `resume`, an existing mapping is honoured so the
/// plan shows only what remains.
pub fn plan(opts: &SyncOptions) -> Result<(SyncReport, Vec<PlannedOp>)> {
    let document = input::load_document(&opts.input)?;
    let mapping_path = opts.mapping_path();

    let mut store = if opts.resume && MappingStore::exists(&mapping_path) {
        MappingStore::restore(&mapping_path)?
    } else {
        MappingStore::new()
    };

    let mut recorder = PlanRecorder::new();
    let report = Migrator::new(&mut recorder, &mut store).run(&document.tasks)?;
    Ok((report, recorder.into_ops()))
}

fn starting_store(opts: &SyncOptions, mapping_path: &Path) -> Result<MappingStore> {
    if !MappingStore::exists(mapping_path) {
        if opts.resume {
            tracing::warn!(
                path = %mapping_path.display(),
                "nothing to resume, starting a fresh migration"
            );
        }
        return Ok(MappingStore::new());
    }

    if opts.force {
        tracing::info!(path = %mapping_path.display(), "discarding existing mapping");
        return Ok(MappingStore::new());
    }
    if opts.resume {
        let store = MappingStore::restore(mapping_path)?;
        let stats = store.stats();
        tracing::info!(
            parents = stats.parent_count,
            children = stats.child_count,
            "resuming from existing mapping"
        );
        return Ok(store);
    }
    Err(SyncError::MappingExists(mapping_path.to_path_buf()))
}

fn checkpoint(store: &MappingStore, mapping_path: &Path) {
    match store.persist(mapping_path) {
        Ok(()) => {
            let stats = store.stats();
            tracing::warn!(
                path = %mapping_path.display(),
                parents = stats.parent_count,
                children = stats.child_count,
                "run failed, partial mapping saved for --resume"
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to save partial mapping");
        }
    }
}
