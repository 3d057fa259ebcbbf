//! Durable local key-value storage.
//!
//! Holds the little state that survives a restart: the signed-in user record
//! and the auth token. Values are strings; typed values go through JSON via
//! [`load_json`] and [`save_json`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored value could not be encoded or decoded.
    #[error("storage encoding error for key {key}: {source}")]
    Encoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A string key-value store.
pub trait KeyValueStore: Send {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns an error if the backend fails or the stored value is not valid
/// JSON for `T`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    store
        .get(key)?
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StorageError::Encoding {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns an error if encoding or the backend write fails.
pub fn save_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encoding {
        key: key.to_string(),
        source,
    })?;
    store.set(key, raw)
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Non-durable store, for tests and throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Store backed by a single JSON object file.
///
/// The whole map is loaded on open and rewritten on every change through a
/// temporary file and rename, so a crash never leaves a half-written file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, creating nothing until the first write.
    ///
    /// A missing file opens empty. A corrupt file is logged and treated as
    /// empty; it is replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "Discarding unreadable storage file");
                BTreeMap::new()
            }),
            Err(source) if source.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened storage");
        Ok(Self { path, entries })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let raw = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StorageError::Encoding {
                key: "*".to_string(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Remembered {
        name: String,
        visits: u32,
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "abc".to_string()).unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));

        store.remove("token").unwrap();
        store.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/storage.json");

        let mut store = FileStore::open(&path).unwrap();
        let value = Remembered {
            name: "John Doe".to_string(),
            visits: 3,
        };
        save_json(&mut store, "user", &value).unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        let loaded: Option<Remembered> = load_json(&reopened, "user").unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn test_file_store_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("token", "abc".to_string()).unwrap();
        store.remove("token").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap(), None);
    }

    #[test]
    fn test_file_store_discards_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("user").unwrap(), None);
        store.set("user", "{}".to_string()).unwrap();
        assert_eq!(
            FileStore::open(&path).unwrap().get("user").unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn test_load_json_reports_bad_value() {
        let mut store = MemoryStore::new();
        store.set("user", "not json".to_string()).unwrap();
        let result: Result<Option<Remembered>, _> = load_json(&store, "user");
        assert!(matches!(result, Err(StorageError::Encoding { .. })));
    }
}
