//! Command store persistence and atomic write operations
//!
//! The store is a single JSON list of command records under the run's output
//! directory. Every save replaces the whole document via a temp file and a
//! rename. There is no locking: records appended by an external writer
//! between a load and a save are lost.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::error::{StoreError, StoreResult};
use super::record::CommandRecord;

/// File-backed command store
#[derive(Debug, Clone)]
pub struct CommandStore {
    path: PathBuf,
}

impl CommandStore {
    /// Create a store at an explicit path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create a store named `file_name` inside `out_dir`
    pub fn in_dir(out_dir: &Path, file_name: &str) -> Self {
        Self::new(out_dir.join(file_name))
    }

    /// Location of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the store file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load all records.
    ///
    /// A missing or blank file is an empty store; anything else that does not
    /// parse as a list of records is [`StoreError::Corrupt`].
    pub fn load(&self) -> StoreResult<Vec<CommandRecord>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }

    /// Replace the store content with `records`
    pub fn save(&self, records: &[CommandRecord]) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        write_atomic(&self.path, &json)
    }

    /// Delete the store file; a missing file is not an error
    pub fn remove(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Removed command store {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Write data atomically to a file
///
/// Writes a uniquely named temporary file in the target's directory, syncs,
/// then renames it over the target. Concurrent writers never share a temp
/// file, so the target is always some writer's complete document.
pub fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let failed = |detail: String| StoreError::AtomicWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    // Dropping the temp file on any error removes it
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| failed(format!("temp file in {:?}: {}", parent, e)))?;
    temp.write_all(data)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| failed(e.to_string()))?;

    // Rename atomically
    temp.persist(path)
        .map_err(|e| failed(format!("rename failed: {}", e.error)))?;

    // Sync parent directory
    let dir = OpenOptions::new().read(true).open(parent)?;
    dir.sync_all()?;

    Ok(())
}
