use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

/// Exclusive advisory lock held for the duration of a sync run.
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Lock `<mapping path>.lock`, failing immediately if another run holds it.
    pub fn acquire(mapping_path: &Path) -> Result<Self> {
        let path = lock_path(mapping_path);
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive()
            .map_err(|_| SyncError::Locked(path.display().to_string()))?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly (normally handled by Drop).
    pub fn release(self) -> Result<()> {
        self.file.unlock()?;
        Ok(())
    }
}

pub fn lock_path(mapping_path: &Path) -> PathBuf {
    let mut name = mapping_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    mapping_path.with_file_name(name)
}
