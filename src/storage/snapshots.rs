use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Context, Result};
use crate::utils::{list_files_with_suffix, sanitize_identifier, write_atomically, FileEntry};

pub const SNAPSHOT_SUFFIX: &str = "_output_data.txt";

/// Stored snapshot as seen by a directory listing.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub identifier: String,
    pub file: FileEntry,
}

/// Last successful payload per index or symbol, one file each, overwritten on every write.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", sanitize_identifier(identifier), SNAPSHOT_SUFFIX))
    }

    /// Replace the snapshot for `identifier`; readers never observe a partial file.
    pub fn write(&self, identifier: &str, payload: &Value) -> Result<PathBuf> {
        let path = self.path_for(identifier);
        let json = serde_json::to_vec_pretty(payload)?;
        write_atomically(&path, &json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        log::info!("data for {} has been written to {}", identifier, path.display());
        Ok(path)
    }

    /// Stored payload for `identifier`, or `None` when nothing has been fetched yet.
    pub fn read(&self, identifier: &str) -> Result<Option<Value>> {
        let path = self.path_for(identifier);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Failed to read snapshot {}", path.display()))
                    .into())
            }
        };
        let payload = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Ok(Some(payload))
    }

    /// Every stored snapshot, newest first.
    pub fn list(&self) -> Vec<SnapshotEntry> {
        list_files_with_suffix(&self.dir, SNAPSHOT_SUFFIX)
            .into_iter()
            .map(|file| SnapshotEntry {
                identifier: file.name.trim_end_matches(SNAPSHOT_SUFFIX).to_string(),
                file,
            })
            .collect()
    }
}
