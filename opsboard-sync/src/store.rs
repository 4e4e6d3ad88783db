//! Persistent fallback storage for the last known-good dataset.
//!
//! A backup is only read when both the in-memory cache and the network are
//! unavailable, typically right after a restart during an outage.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use opsboard_types::BackupRecord;
use parking_lot::Mutex;
use thiserror::Error;

/// Errors from a [`FallbackStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("Backup I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored blob could not be encoded or decoded.
    #[error("Backup serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable key/value storage for [`BackupRecord`]s, one per source key.
///
/// Writes are last-write-wins. Implementations may block; the cache calls them
/// from the blocking pool after every successful fetch.
pub trait FallbackStore: Send + Sync + fmt::Debug {
    /// Overwrite the backup stored under `key`.
    fn persist(&self, key: &str, record: &BackupRecord) -> Result<(), StoreError>;

    /// Read the backup stored under `key`, if one exists and is compatible.
    fn recall(&self, key: &str) -> Result<Option<BackupRecord>, StoreError>;
}

/// Stores one JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The directory backups are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the backup file for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl FallbackStore for FileStore {
    fn persist(&self, key: &str, record: &BackupRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(record)?;

        // Write then rename so readers never observe a torn file.
        let mut file = fs::File::create(&tmp).map_err(io_err(&tmp))?;
        file.write_all(&json).map_err(io_err(&tmp))?;
        file.sync_all().map_err(io_err(&tmp))?;
        drop(file);
        fs::rename(&tmp, &path).map_err(io_err(&path))?;
        Ok(())
    }

    fn recall(&self, key: &str) -> Result<Option<BackupRecord>, StoreError> {
        let path = self.path_for(key);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };
        let record: BackupRecord = serde_json::from_slice(&content)?;
        if !record.version.is_compatible() {
            tracing::warn!(
                key,
                version = %record.version,
                "Ignoring backup with incompatible version"
            );
            return Ok(None);
        }
        Ok(Some(record))
    }
}

/// In-memory store, for tests and for hosts that opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, BackupRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl FallbackStore for MemoryStore {
    fn persist(&self, key: &str, record: &BackupRecord) -> Result<(), StoreError> {
        self.records.lock().insert(key.to_string(), record.clone());
        Ok(())
    }

    fn recall(&self, key: &str) -> Result<Option<BackupRecord>, StoreError> {
        Ok(self.records.lock().get(key).cloned())
    }
}
