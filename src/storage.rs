//! Pluggable key-value persistence
//!
//! The library mirrors its whole in-memory map to one key on every mutation,
//! so the port is a plain string get/set/clear. Backends: in-memory (tests,
//! tooling dry runs) and file-based (the generation CLI). A platform-storage
//! backend slots in behind the same trait.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Key-value persistence port
pub trait StoragePort {
    /// Fetch the value for a key, `None` when absent
    fn get(&self, key: &str) -> Option<String>;
    /// Overwrite the value for a key
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove a key; absent keys are not an error
    fn clear(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile backend; contents vanish with the instance
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal identifiers, not user input, but keep them
        // filesystem-safe anyway
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl StoragePort for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })?;
        fs::write(self.path_for(key), value).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn clear(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_roundtrip() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("k"), None);
        storage.set("k", "v1").unwrap();
        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").as_deref(), Some("v2"));
        storage.clear("k").unwrap();
        assert_eq!(storage.get("k"), None);
        // Clearing an absent key is fine
        storage.clear("k").unwrap();
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        assert_eq!(storage.get("lib"), None);
        storage.set("lib", "{\"a\":1}").unwrap();
        assert_eq!(storage.get("lib").as_deref(), Some("{\"a\":1}"));

        // A fresh instance over the same directory sees the value
        let reopened = FileStorage::new(dir.path());
        assert_eq!(reopened.get("lib").as_deref(), Some("{\"a\":1}"));

        storage.clear("lib").unwrap();
        assert_eq!(storage.get("lib"), None);
        storage.clear("lib").unwrap();
    }

    #[test]
    fn test_file_keys_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        storage.set("weird/key name", "x").unwrap();
        assert_eq!(storage.get("weird/key name").as_deref(), Some("x"));
    }
}
