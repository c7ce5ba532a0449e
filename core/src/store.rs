//! Persisted client-side key-value storage.
//!
//! The session token is the only value the client persists. `MemoryStore`
//! keeps it for the life of the process; `FileStore` keeps it in a small
//! JSON file so it survives restarts.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

use crate::config::ClientConfig;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "feedback_auth_token";

const FILE_NAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// String key-value storage that outlives a single request.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Store backed by `<dir>/session.json`.
///
/// The file is re-read on every access so several processes pointed at the
/// same directory observe each other's sign-in and sign-out.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
        }
    }

    /// The store under the configured storage directory, if one is set.
    pub fn from_config(config: &ClientConfig) -> Option<Self> {
        config.storage_dir.as_deref().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Current contents for a read-modify-write. A corrupt file is
    /// replaced; any other read failure is returned untouched.
    fn load_for_update(&self) -> Result<HashMap<String, String>, StoreError> {
        match self.load() {
            Err(StoreError::Corrupt(e)) => {
                warn!(path = %self.path.display(), "overwriting corrupt session file: {e}");
                Ok(HashMap::new())
            }
            other => other,
        }
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(values)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable session file: {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.load_for_update()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.load_for_update()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_clones_share_values() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set(TOKEN_KEY, "abc").unwrap();
        assert_eq!(other.get(TOKEN_KEY).as_deref(), Some("abc"));
        other.remove(TOKEN_KEY).unwrap();
        assert!(store.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::new(dir.path()).set(TOKEN_KEY, "persisted").unwrap();

        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.get(TOKEN_KEY).as_deref(), Some("persisted"));
    }

    #[test]
    fn file_store_follows_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileStore::from_config(&ClientConfig::new("http://h")).is_none());

        let config = ClientConfig {
            storage_dir: Some(dir.path().to_path_buf()),
            ..ClientConfig::new("http://h")
        };
        let store = FileStore::from_config(&config).unwrap();
        assert_eq!(store.path(), dir.path().join("session.json"));
    }

    #[test]
    fn file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert!(store.get(TOKEN_KEY).is_none());
        store.remove(TOKEN_KEY).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_remove_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set(TOKEN_KEY, "t").unwrap();
        store.set("theme", "dark").unwrap();
        store.remove(TOKEN_KEY).unwrap();
        assert!(store.get(TOKEN_KEY).is_none());
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn file_store_write_propagates_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every read fail with I/O.
        let store = FileStore::new(dir.path());
        fs::create_dir(store.path()).unwrap();

        assert!(matches!(store.set(TOKEN_KEY, "t"), Err(StoreError::Io(_))));
        assert!(matches!(store.remove(TOKEN_KEY), Err(StoreError::Io(_))));
        assert!(store.path().is_dir());
    }

    #[test]
    fn file_store_ignores_corrupt_file_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.path(), b"not json").unwrap();
        assert!(store.get(TOKEN_KEY).is_none());
        store.set(TOKEN_KEY, "fresh").unwrap();
        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("fresh"));
    }
}
