//! Durable mapping from source task ids to tracker issue ids.
//!
//! In memory the mapping is two flat maps (by task id, and by task id plus
//! subtask id) with insertion-order vectors alongside, so lookups are O(1)
//! and the persisted file lists entries in creation order.
//!
//! On-disk shape:
//!
//! ```json
//! { "version": "1.0", "generatedAt": "...",
//!   "tasks": [ { "tmId": 1, "beadsId": "bd-a1", "subtasks": [ { "tmId": 1, "beadsId": "bd-a1.1" } ] } ] }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

pub const MAPPING_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappingFile {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<MappingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub tm_id: u64,
    pub beads_id: String,
    #[serde(default)]
    pub subtasks: Vec<SubtaskMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskMapping {
    pub tm_id: u64,
    pub beads_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MappingStats {
    pub parent_count: usize,
    pub child_count: usize,
}

#[derive(Debug, Default, Clone)]
pub struct MappingStore {
    parent_order: Vec<u64>,
    parents: HashMap<u64, String>,
    child_order: HashMap<u64, Vec<u64>>,
    children: HashMap<(u64, u64), String>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parent. A repeated source id keeps its first mapping.
    pub fn add_parent(&mut self, source_id: u64, dest_id: impl Into<String>) {
        if self.parents.contains_key(&source_id) {
            return;
        }
        self.parents.insert(source_id, dest_id.into());
        self.parent_order.push(source_id);
    }

    /// Register a child under an already-mapped parent.
    pub fn add_child(
        &mut self,
        parent_source_id: u64,
        child_source_id: u64,
        dest_id: impl Into<String>,
    ) -> Result<()> {
        if !self.parents.contains_key(&parent_source_id) {
            return Err(SyncError::ParentNotMapped(parent_source_id));
        }
        let key = (parent_source_id, child_source_id);
        if self.children.contains_key(&key) {
            return Ok(());
        }
        self.children.insert(key, dest_id.into());
        self.child_order
            .entry(parent_source_id)
            .or_default()
            .push(child_source_id);
        Ok(())
    }

    pub fn lookup_parent(&self, source_id: u64) -> Option<&str> {
        self.parents.get(&source_id).map(String::as_str)
    }

    pub fn lookup_child(&self, parent_source_id: u64, child_source_id: u64) -> Option<&str> {
        self.children
            .get(&(parent_source_id, child_source_id))
            .map(String::as_str)
    }

    pub fn stats(&self) -> MappingStats {
        MappingStats {
            parent_count: self.parents.len(),
            child_count: self.children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Snapshot in creation order, stamped with the current time.
    pub fn to_file(&self) -> MappingFile {
        let tasks = self
            .parent_order
            .iter()
            .map(|&tm_id| MappingEntry {
                tm_id,
                beads_id: self.parents.get(&tm_id).cloned().unwrap_or_default(),
                subtasks: self
                    .child_order
                    .get(&tm_id)
                    .map(|children| {
                        children
                            .iter()
                            .map(|&child| SubtaskMapping {
                                tm_id: child,
                                beads_id: self
                                    .children
                                    .get(&(tm_id, child))
                                    .cloned()
                                    .unwrap_or_default(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        MappingFile {
            version: MAPPING_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks,
        }
    }

    pub fn from_file(file: MappingFile) -> Self {
        let mut store = Self::new();
        for entry in file.tasks {
            store.add_parent(entry.tm_id, entry.beads_id);
            for subtask in entry.subtasks {
                store.insert_child_unchecked(entry.tm_id, subtask.tm_id, subtask.beads_id);
            }
        }
        store
    }

    fn insert_child_unchecked(&mut self, parent: u64, child: u64, dest_id: String) {
        if self.children.insert((parent, child), dest_id).is_none() {
            self.child_order.entry(parent).or_default().push(child);
        }
    }

    /// Write the full mapping to `path`, replacing whatever was there.
    ///
    /// The file is written next to its destination and renamed into place so
    /// an interrupted save never leaves a truncated mapping behind.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.to_file())?;
        let tmp = temp_path(path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Rebuild a store from a previously persisted file.
    pub fn restore(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let file: MappingFile =
            serde_json::from_str(&data).map_err(|err| SyncError::MappingCorrupt {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        Ok(Self::from_file(file))
    }

    /// Whether a mapping file is present. Never fails.
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
