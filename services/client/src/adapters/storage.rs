//! services/client/src/adapters/storage.rs
//!
//! Durable credential storage: the concrete implementations of the
//! `CredentialStorage` port. `FileCredentialStorage` keeps the entries in a small JSON
//! object on disk; `MemoryCredentialStorage` is used for tests and embedding.

use family_tree_core::ports::{CredentialStorage, PortError, PortResult};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

//=========================================================================================
// File-backed storage
//=========================================================================================

/// Stores string entries in a JSON object file.
///
/// Every write rewrites the whole file through a temporary sibling and an atomic rename,
/// so a crash never leaves a half-written file behind.
pub struct FileCredentialStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileCredentialStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the path to the credentials file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> PortResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).map_err(storage_error)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            PortError::Storage(format!("{} is not valid JSON: {}", self.path.display(), e))
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(storage_error)?;
            }
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(storage_error)?;
            file.write_all(json.as_bytes()).map_err(storage_error)?;
            file.sync_all().map_err(storage_error)?;
        }
        fs::rename(&tmp_path, &self.path).map_err(storage_error)?;
        debug!("Wrote {} credential entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    fn modify<F>(&self, f: F) -> PortResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| PortError::Storage("credential file lock poisoned".to_string()))?;
        let mut entries = self.read_entries()?;
        if f(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

fn storage_error(e: std::io::Error) -> PortError {
    PortError::Storage(e.to_string())
}

impl CredentialStorage for FileCredentialStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.modify(|entries| entries.remove(key).is_some())
    }
}

//=========================================================================================
// In-memory storage
//=========================================================================================

/// Volatile storage; entries live as long as the value.
#[derive(Default)]
pub struct MemoryCredentialStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates an entry, as if a previous run had written it.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        self
    }

    fn entries(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Storage("memory storage lock poisoned".to_string()))
    }
}

impl CredentialStorage for MemoryCredentialStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use family_tree_core::ports::{API_KEY_KEY, TOKEN_KEY};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileCredentialStorage::new(temp_dir.path().join("credentials.json"));

        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        storage.remove(TOKEN_KEY).unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_entries_survive_a_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("credentials.json");

        let storage = FileCredentialStorage::new(file_path.clone());
        storage.set(TOKEN_KEY, "tok-1").unwrap();
        storage.set(API_KEY_KEY, "key-1").unwrap();

        let reopened = FileCredentialStorage::new(file_path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap(), Some("tok-1".to_string()));
        assert_eq!(reopened.get(API_KEY_KEY).unwrap(), Some("key-1".to_string()));

        reopened.remove(TOKEN_KEY).unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(API_KEY_KEY).unwrap(), Some("key-1".to_string()));
    }

    #[test]
    fn test_invalid_json_is_a_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("credentials.json");
        fs::write(&file_path, "{ invalid json").unwrap();

        let storage = FileCredentialStorage::new(file_path);
        assert!(matches!(storage.get(TOKEN_KEY), Err(PortError::Storage(_))));
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryCredentialStorage::new().with_entry(TOKEN_KEY, "tok");
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), Some("tok".to_string()));
        storage.remove(TOKEN_KEY).unwrap();
        storage.remove(TOKEN_KEY).unwrap();
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }
}
