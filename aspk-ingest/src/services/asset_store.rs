//! Deterministically-named artifact store
//!
//! Presence of a key means the asset is complete: puts are atomic, so a
//! crash mid-write never leaves a file that a resume check would accept.

use crate::error::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Flat key → bytes store backing the acquisition step
pub trait AssetStore: Send + Sync {
    fn exists(&self, key: &str) -> bool;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StoreError>;

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Location reported in output rows for `key`
    fn path_for(&self, key: &str) -> PathBuf;
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\')
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Store rooted at one output directory per run
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for LocalAssetStore {
    fn exists(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.root.join(key).is_file()
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        let path = self.root.join(key);
        let tmp = self.root.join(format!(".{}.partial", key));

        std::fs::write(&tmp, bytes)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = bytes.len(), "Asset written");
        Ok(path)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(key)?;
        match std::fs::read(self.root.join(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        match std::fs::remove_file(self.root.join(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryAssetStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted list of stored keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl AssetStore for MemoryAssetStore {
    fn exists(&self, key: &str) -> bool {
        self.objects
            .lock()
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store lock poisoned")))?;
        objects.insert(key.to_string(), bytes.to_vec());
        Ok(self.path_for(key))
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store lock poisoned")))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store lock poisoned")))?;
        objects.remove(key);
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        PathBuf::from("memory").join(key)
    }
}
