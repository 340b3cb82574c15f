//! Local Storage Module
//!
//! Persistent key/value strings for client state (token, flags, user).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info};

/// A string key/value store with local-storage semantics.
///
/// Missing keys read as `Ok(None)`; removing a missing key is not an error.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage, one file per key under the data directory
pub struct FileStorage {
    storage_path: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at `dir`, creating it if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let storage_path = dir.as_ref().join("storage");

        std::fs::create_dir_all(&storage_path).map_err(|e| {
            error!("Failed to create storage directory: {}", e);
            StorageError::Io(e.to_string())
        })?;

        debug!("Local storage initialized at: {:?}", storage_path);

        Ok(Self { storage_path })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.storage_path.join(format!("{}.dat", key)))
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let file_path = self.key_path(key)?;

        match std::fs::read_to_string(&file_path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let file_path = self.key_path(key)?;

        std::fs::write(&file_path, value).map_err(|e| StorageError::Io(e.to_string()))?;

        debug!("Stored value for key: {}", key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let file_path = self.key_path(key)?;

        if file_path.exists() {
            std::fs::remove_file(&file_path).map_err(|e| StorageError::Io(e.to_string()))?;
            info!("Removed stored value for key: {}", key);
        }

        Ok(())
    }
}

/// In-memory storage; state is lost when dropped
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.remove(key);
        Ok(())
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}
