/*!
# Reliquary Core

Versioned snapshot serialization with incremental diff/patch persistence.

This crate persists arbitrary typed object graphs to a textual,
version-tagged document format and reloads them while tolerating schema
evolution across application releases. Instead of a second full copy, a
snapshot can also be stored as a structural diff against a known base
document and reconstructed at load time.

## Architecture

* [`container`] — the envelope format pairing a `"Version"` stamp with an
  `"Object"` payload, and its compact/pretty rendering.
* [`extract`] — a streaming pass that reads only the version stamp from raw
  text, skipping everything else; degrades to `0.0` rather than failing.
* [`context`] / [`convert`] — the per-call decode context and the ordered,
  version-gated upgrade converters that consult it.
* [`registry`] — the `"$type"` discriminator registry for reconstructing
  the exact concrete subtype of polymorphic payloads; unknown tags fail
  closed.
* [`codec`] — full encode/decode of the envelope, wiring the above
  together.
* [`diff`] — pure structural diff and strict patch application over parsed
  document trees, with `apply(base, diff(base, current)) == current`.
* [`store`] — file-level composition: full snapshots, `save_as_diff`, and
  ordered incremental loading, over a pluggable [`storage`] adapter.

Everything is synchronous, and no operation touches shared mutable state:
the decode context is built per call, so concurrent decodes are independent.

## Usage

```rust
use reliquary_core::{
    ConverterSet, Format, LocalFileStorage, SnapshotStore, StaticVersion, Version,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SaveData {
    floor: u32,
}

# fn main() -> reliquary_core::Result<()> {
let dir = tempfile::tempdir()?;
let store = SnapshotStore::new(
    LocalFileStorage::with_base_dir(dir.path()),
    StaticVersion(Version::new(1, 4)),
    Format::Pretty,
);

store.save_snapshot(&SaveData { floor: 3 }, "main.json")?;
let back: SaveData = store.load_snapshot("main.json", &ConverterSet::new())?;
assert_eq!(back, SaveData { floor: 3 });

// An incremental snapshot stores only what changed against the base.
store.save_as_diff(&SaveData { floor: 4 }, "main.diff.json", "main.json")?;
let latest: SaveData =
    store.load_with_diffs("main.json", &["main.diff.json"], &ConverterSet::new())?;
assert_eq!(latest.floor, 4);
# Ok(())
# }
```
*/

pub mod codec;
pub mod config;
pub mod container;
pub mod context;
pub mod convert;
pub mod diff;
pub mod error;
pub mod extract;
pub mod registry;
pub mod storage;
pub mod store;
pub mod version;

pub use codec::{decode_tree, decode_tree_tagged, Codec};
pub use config::{store_from_config, StoreConfig};
pub use container::{Container, Format};
pub use context::DecodeContext;
pub use convert::{Converter, ConverterSet, VersionRange};
pub use error::{ReliquaryError, Result};
pub use extract::{extract_version, version_of_tree};
pub use registry::{TagRegistry, Tagged};
pub use storage::{LocalFileStorage, StorageAdapter};
pub use store::SnapshotStore;
pub use version::{StaticVersion, Version, VersionSource};
