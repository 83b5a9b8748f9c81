//! Migrate a Task Master task file into a beads (`bd`) issue tracker.
//!
//! Tasks become epics, subtasks become child issues, dependency edges are
//! replayed as tracker blocking links and statuses are carried over. The
//! source-to-tracker id mapping is written beside the tracker data so a run
//! can be resumed or repeated.

pub mod build_info;
pub mod commands;
pub mod error;
pub mod graph;
pub mod input;
pub mod logging;
pub mod model;
pub mod output;
pub mod store;
pub mod sync;
pub mod tracker;
