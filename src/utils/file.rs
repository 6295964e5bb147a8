use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata for a file entry surfaced to listings.
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Files in `dir` whose name ends with `suffix`, newest first. A missing directory yields none.
pub fn list_files_with_suffix(dir: impl AsRef<Path>, suffix: &str) -> Vec<FileEntry> {
    let mut entries = Vec::new();
    let dir_path = dir.as_ref();

    if let Ok(read_dir) = fs::read_dir(dir_path) {
        for entry in read_dir.flatten() {
            let path = entry.path();
            let Some(name) = path
                .file_name()
                .and_then(|segment| segment.to_str())
                .map(|s| s.to_string())
            else {
                continue;
            };
            if !name.ends_with(suffix) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };

            entries.push(FileEntry {
                name,
                path,
                modified: metadata.modified().unwrap_or(UNIX_EPOCH),
                size: metadata.len(),
            });
        }
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified));
    entries
}

/// Replace `path` with `contents` via a temporary file in the same directory and a rename,
/// so concurrent readers see either the old file or the new one.
pub fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
