/*!
Configuration for assembling a snapshot store.
*/

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::container::Format;
use crate::storage::LocalFileStorage;
use crate::store::SnapshotStore;
use crate::version::VersionSource;

/// Settings for a file-backed snapshot store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Output formatting for written documents and patches
    pub format: Format,
    /// Base directory all document paths resolve against; `None` uses paths
    /// as given
    pub base_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Human-readable output, paths used as given.
    pub fn pretty() -> Self {
        Self {
            format: Format::Pretty,
            base_dir: None,
        }
    }

    /// Minified output, paths used as given.
    pub fn compact() -> Self {
        Self {
            format: Format::Compact,
            base_dir: None,
        }
    }

    pub fn with_base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

/// Build a local-filesystem snapshot store from a configuration and the
/// application's version source.
pub fn store_from_config<V: VersionSource>(
    config: StoreConfig,
    versions: V,
) -> SnapshotStore<LocalFileStorage, V> {
    let storage = match config.base_dir {
        Some(base_dir) => LocalFileStorage::with_base_dir(base_dir),
        None => LocalFileStorage::new(),
    };
    SnapshotStore::new(storage, versions, config.format)
}
