/*!
Storage adapters for snapshot and patch documents.

The store composes against a storage port rather than the filesystem
directly, so the document pipeline stays independent of where the text
actually lives and unit tests can run entirely in memory. Documents are
UTF-8 text; adapters move opaque bytes.
*/

use std::fs;
use std::path::{Path, PathBuf};

use crate::{ReliquaryError, Result};

/// Storage abstraction for persisted documents.
pub trait StorageAdapter {
    /// Save document bytes to the specified location, replacing any
    /// existing document there.
    fn save(&self, data: &[u8], path: &str) -> Result<()>;

    /// Load document bytes from the specified location.
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    /// Check whether a document exists at the specified location.
    fn exists(&self, path: &str) -> bool;

    /// Delete the document at the specified location. Deleting an absent
    /// document is not an error.
    fn delete(&self, path: &str) -> Result<()>;
}

/// Local filesystem storage.
///
/// Resolves paths against an optional base directory and creates missing
/// parent directories on save. Every file handle is scoped to one call; no
/// handle outlives an operation, on success or failure.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Storage that uses caller paths as-is.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Storage that resolves every path relative to `base_dir`.
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }

    fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ReliquaryError::storage(format!(
                        "failed to create directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        Ok(())
    }
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        self.ensure_parent_dir(&full_path)?;
        fs::write(&full_path, data).map_err(|e| {
            ReliquaryError::storage(format!(
                "failed to write document to {}: {e}",
                full_path.display()
            ))
        })
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);
        fs::read(&full_path).map_err(|e| {
            ReliquaryError::storage(format!(
                "failed to read document from {}: {e}",
                full_path.display()
            ))
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).exists()
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        if full_path.exists() {
            fs::remove_file(&full_path).map_err(|e| {
                ReliquaryError::storage(format!(
                    "failed to delete document {}: {e}",
                    full_path.display()
                ))
            })?;
        }
        Ok(())
    }
}

/// In-memory storage for unit tests.
#[cfg(test)]
pub struct MemoryStorage {
    data: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        self.data
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        self.data
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ReliquaryError::storage(format!("document not found: {path}")))
    }

    fn exists(&self, path: &str) -> bool {
        self.data.lock().unwrap().contains_key(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.data.lock().unwrap().remove(path);
        Ok(())
    }
}
