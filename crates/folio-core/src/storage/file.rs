//! File-backed key-value store
//!
//! Backs the durable tier. All entries live in one JSON object on disk and
//! every change rewrites the file atomically (write to temp file, then
//! rename), so a crash never leaves a half-written store.
//!
//! Storage location: `~/.local/share/folio/positions.json` (configurable
//! via `Config`)

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::error::{StorageError, StorageResult};
use super::KeyValueStore;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`
    ///
    /// A missing file is an empty store. A file that does not parse is moved
    /// to `<path>.corrupt` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;

        let entries = match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(entries) => entries,
            Err(e) => {
                let err = quarantine(&path, e.to_string())?;
                warn!("{}", err);
                BTreeMap::new()
            }
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `entries` to disk, then adopt them
    ///
    /// On failure the in-memory map keeps matching the file.
    fn commit(&mut self, entries: BTreeMap<String, String>) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(&entries)?;
        atomic_write(&self.path, json.as_bytes())?;
        self.entries = entries;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        if self.entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value.to_string());
        self.commit(entries)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut entries = self.entries.clone();
        entries.remove(key);
        self.commit(entries)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.commit(BTreeMap::new())
    }
}

/// Move an unparsable store file out of the way
fn quarantine(path: &Path, details: String) -> StorageResult<StorageError> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".corrupt");
    let backup_path = PathBuf::from(backup);

    fs::rename(path, &backup_path).map_err(|source| StorageError::Rename {
        from: path.to_path_buf(),
        to: backup_path.clone(),
        source,
    })?;

    Ok(StorageError::Corrupt {
        path: path.to_path_buf(),
        backup_path,
        details,
    })
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::Directory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::write(&temp_path, e))?;
    file.write_all(data)
        .map_err(|e| StorageError::write(&temp_path, e))?;
    file.sync_all()
        .map_err(|e| StorageError::write(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::Rename {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
