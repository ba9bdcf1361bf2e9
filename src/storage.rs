//! Durable client storage for the session token.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser build of this client kept the bearer token in `localStorage`.
//! `TokenStorage` is that key-value surface; `FileStorage` is the on-disk
//! equivalent (one flat JSON object) and `MemoryStorage` backs tests and
//! ephemeral sessions.
//!
//! ERROR HANDLING
//! ==============
//! Writes are best-effort from the session manager's point of view: it logs
//! a failed write and carries on. The errors are still typed so other
//! callers can decide differently.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("storage file is not a JSON string map: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Key-value store that survives process restarts.
pub trait TokenStorage: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// Storage backed by a JSON file holding a flat `{ "key": "value" }` object.
///
/// Every operation re-reads the file so separate processes sharing the path
/// see each other's writes. Writes go to a sibling temp file first and are
/// renamed into place.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    fn io_err(&self, source: io::Error) -> StorageError {
        StorageError::Io { path: self.path.clone(), source }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

impl TokenStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = lock(&self.guard);
        let mut entries = self.load()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.save(&entries)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = lock(&self.guard);
        Ok(self.load()?.remove(key))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = lock(&self.guard);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
