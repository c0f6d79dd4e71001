/*!
The snapshot store: file-level composition of codec, diff engine, and
storage.

A full snapshot is a self-contained document. An incremental snapshot is a
patch file: the structural diff between a base document and the current
state, stored instead of a second full copy. Loading an incremental snapshot
replays the patches over the base in order and then runs the ordinary decode
pipeline over the merged tree:

```text
LoadBase -> ApplyPatch[0] -> ... -> ApplyPatch[n-1]
         -> ExtractVersion -> DecodeObject -> Done
```

Any patch that fails to apply aborts the whole load; no partial object is
ever returned. All I/O is synchronous and blocking.
*/

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::codec::{self, Codec};
use crate::container::Format;
use crate::convert::ConverterSet;
use crate::diff;
use crate::registry::{TagRegistry, Tagged};
use crate::storage::StorageAdapter;
use crate::version::VersionSource;
use crate::{ReliquaryError, Result};

/// Snapshot persistence over a storage adapter.
pub struct SnapshotStore<S: StorageAdapter, V: VersionSource> {
    storage: S,
    codec: Codec<V>,
}

impl<S: StorageAdapter, V: VersionSource> SnapshotStore<S, V> {
    pub fn new(storage: S, versions: V, format: Format) -> Self {
        Self {
            storage,
            codec: Codec::new(versions, format),
        }
    }

    pub fn codec(&self) -> &Codec<V> {
        &self.codec
    }

    /// Write a full, self-contained snapshot of `payload` to `path`.
    pub fn save_snapshot<T: Serialize>(&self, payload: &T, path: &str) -> Result<()> {
        let text = self.codec.encode(payload)?;
        self.storage.save(text.as_bytes(), path)
    }

    /// As [`SnapshotStore::save_snapshot`], for polymorphic payloads.
    pub fn save_snapshot_tagged<T: Tagged + Serialize>(
        &self,
        payload: &T,
        path: &str,
    ) -> Result<()> {
        let text = self.codec.encode_tagged(payload)?;
        self.storage.save(text.as_bytes(), path)
    }

    /// Load and decode a full snapshot, applying `converters` as dictated by
    /// the document's version stamp.
    pub fn load_snapshot<T: DeserializeOwned>(
        &self,
        path: &str,
        converters: &ConverterSet,
    ) -> Result<T> {
        let text = self.read_text(path)?;
        self.codec.decode(&text, converters)
    }

    /// As [`SnapshotStore::load_snapshot`], resolving a polymorphic payload
    /// through `registry`.
    pub fn load_snapshot_tagged<T>(
        &self,
        path: &str,
        converters: &ConverterSet,
        registry: &TagRegistry<T>,
    ) -> Result<T> {
        let text = self.read_text(path)?;
        self.codec.decode_tagged(&text, converters, registry)
    }

    /// Store `payload` as a structural diff against the document at
    /// `base_path`, writing the patch to `path`.
    ///
    /// When the current state equals the base there is nothing new to store:
    /// any stale patch at `path` is deleted and nothing is written.
    pub fn save_as_diff<T: Serialize>(
        &self,
        payload: &T,
        path: &str,
        base_path: &str,
    ) -> Result<()> {
        let current = self.codec.encode_tree(payload)?;
        self.write_diff(current, path, base_path)
    }

    /// As [`SnapshotStore::save_as_diff`], for polymorphic payloads.
    pub fn save_as_diff_tagged<T: Tagged + Serialize>(
        &self,
        payload: &T,
        path: &str,
        base_path: &str,
    ) -> Result<()> {
        let current = self.codec.encode_tree_tagged(payload)?;
        self.write_diff(current, path, base_path)
    }

    fn write_diff(&self, current: Value, path: &str, base_path: &str) -> Result<()> {
        let base = self.read_tree(base_path)?;
        match diff::diff(&base, &current) {
            None => {
                if self.storage.exists(path) {
                    debug!(path, "current state matches base; removing stale patch");
                    self.storage.delete(path)?;
                }
                Ok(())
            }
            Some(patch) => {
                let text = self.codec.format().render(&patch)?;
                self.storage.save(text.as_bytes(), path)
            }
        }
    }

    /// Load the base document at `base_path`, apply each patch in
    /// `patch_paths` strictly in order, then decode the merged document.
    ///
    /// The context version handed to `converters` is extracted from the
    /// final merged tree, not the base — a patch may well have bumped the
    /// stamp.
    pub fn load_with_diffs<T: DeserializeOwned>(
        &self,
        base_path: &str,
        patch_paths: &[&str],
        converters: &ConverterSet,
    ) -> Result<T> {
        let merged = self.merge_diffs(base_path, patch_paths)?;
        codec::decode_tree(merged, converters)
    }

    /// As [`SnapshotStore::load_with_diffs`], resolving a polymorphic
    /// payload through `registry`.
    pub fn load_with_diffs_tagged<T>(
        &self,
        base_path: &str,
        patch_paths: &[&str],
        converters: &ConverterSet,
        registry: &TagRegistry<T>,
    ) -> Result<T> {
        let merged = self.merge_diffs(base_path, patch_paths)?;
        codec::decode_tree_tagged(merged, converters, registry)
    }

    fn merge_diffs(&self, base_path: &str, patch_paths: &[&str]) -> Result<Value> {
        let mut tree = self.read_tree(base_path)?;
        for patch_path in patch_paths {
            let patch = self.read_tree(patch_path)?;
            tree = diff::apply(&tree, &patch)?;
        }
        Ok(tree)
    }

    pub fn snapshot_exists(&self, path: &str) -> bool {
        self.storage.exists(path)
    }

    pub fn delete_snapshot(&self, path: &str) -> Result<()> {
        self.storage.delete(path)
    }

    fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.storage.load(path)?;
        String::from_utf8(bytes).map_err(|e| {
            ReliquaryError::invalid_format(format!("document at {path} is not UTF-8: {e}"))
        })
    }

    fn read_tree(&self, path: &str) -> Result<Value> {
        Ok(serde_json::from_str(&self.read_text(path)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::VersionRange;
    use crate::storage::MemoryStorage;
    use crate::version::StaticVersion;
    use crate::Version;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
    struct GameState {
        floor: u32,
        team: Vec<String>,
        gold: u64,
    }

    fn state() -> GameState {
        GameState {
            floor: 12,
            team: vec!["Bulbasaur".into(), "Squirtle".into()],
            gold: 450,
        }
    }

    fn store(major: u32, minor: u32) -> SnapshotStore<MemoryStorage, StaticVersion> {
        SnapshotStore::new(
            MemoryStorage::new(),
            StaticVersion(Version::new(major, minor)),
            Format::Compact,
        )
    }

    #[test]
    fn full_snapshot_round_trip() {
        let store = store(1, 4);
        store.save_snapshot(&state(), "main.json").unwrap();
        assert!(store.snapshot_exists("main.json"));

        let back: GameState = store
            .load_snapshot("main.json", &ConverterSet::new())
            .unwrap();
        assert_eq!(back, state());
    }

    #[test]
    fn save_as_diff_then_load_with_diffs() {
        let store = store(1, 4);
        store.save_snapshot(&state(), "base.json").unwrap();

        let mut modified = state();
        modified.floor = 13;
        modified.team.push("Charmander".into());
        store
            .save_as_diff(&modified, "patch1.json", "base.json")
            .unwrap();
        assert!(store.snapshot_exists("patch1.json"));

        let back: GameState = store
            .load_with_diffs("base.json", &["patch1.json"], &ConverterSet::new())
            .unwrap();
        assert_eq!(back, modified);
    }

    #[test]
    fn chained_patches_apply_in_order() {
        let store = store(1, 0);
        store.save_snapshot(&state(), "base.json").unwrap();

        let mut step1 = state();
        step1.gold = 700;
        store.save_as_diff(&step1, "p1.json", "base.json").unwrap();

        // The second diff is taken against base + p1, the way a running game
        // stacks incremental saves.
        let merged = store.merge_diffs("base.json", &["p1.json"]).unwrap();
        let merged_text = Format::Compact.render(&merged).unwrap();
        store.storage.save(merged_text.as_bytes(), "merged.json").unwrap();

        let mut step2 = step1.clone();
        step2.team.clear();
        store.save_as_diff(&step2, "p2.json", "merged.json").unwrap();

        let back: GameState = store
            .load_with_diffs("base.json", &["p1.json", "p2.json"], &ConverterSet::new())
            .unwrap();
        assert_eq!(back, step2);
    }

    #[test]
    fn non_commutative_patches_are_order_sensitive() {
        let store = store(1, 0);
        // p1 adds a property, p2 renames it; p2 cannot apply before p1.
        store
            .storage
            .save(br#"{"Version":"1.0","Object":{}}"#, "base.json")
            .unwrap();
        store
            .storage
            .save(br#"{"Object":{"hp":[10]}}"#, "p1.json")
            .unwrap();
        store
            .storage
            .save(
                br#"{"Object":{"hp":[10,0,0],"hit_points":[10]}}"#,
                "p2.json",
            )
            .unwrap();

        let forward: Value = store
            .load_with_diffs("base.json", &["p1.json", "p2.json"], &ConverterSet::new())
            .unwrap();
        assert_eq!(forward, json!({"hit_points": 10}));

        let reversed = store.load_with_diffs::<Value>(
            "base.json",
            &["p2.json", "p1.json"],
            &ConverterSet::new(),
        );
        assert!(matches!(reversed, Err(ReliquaryError::Patch { .. })));
    }

    #[test]
    fn no_op_diff_deletes_stale_patch() {
        let store = store(1, 4);
        store.save_snapshot(&state(), "base.json").unwrap();

        // A patch from an earlier session is lying around.
        store.storage.save(b"stale", "patch.json").unwrap();
        assert!(store.snapshot_exists("patch.json"));

        store
            .save_as_diff(&state(), "patch.json", "base.json")
            .unwrap();
        assert!(!store.snapshot_exists("patch.json"));
    }

    #[test]
    fn no_op_diff_without_stale_patch_writes_nothing() {
        let store = store(1, 4);
        store.save_snapshot(&state(), "base.json").unwrap();
        store
            .save_as_diff(&state(), "patch.json", "base.json")
            .unwrap();
        assert!(!store.snapshot_exists("patch.json"));
    }

    #[test]
    fn failing_patch_aborts_the_whole_load() {
        let store = store(1, 4);
        store.save_snapshot(&state(), "base.json").unwrap();

        let mut modified = state();
        modified.gold = 9999;
        store
            .save_as_diff(&modified, "patch.json", "base.json")
            .unwrap();

        // Corrupt the base so the patch's recorded old values no longer match.
        let mut tampered = state();
        tampered.gold = 1;
        store.save_snapshot(&tampered, "base.json").unwrap();

        let result: Result<GameState> =
            store.load_with_diffs("base.json", &["patch.json"], &ConverterSet::new());
        assert!(matches!(result, Err(ReliquaryError::Patch { .. })));
    }

    #[test]
    fn patch_can_bump_the_version_seen_by_converters() {
        let store = store(2, 0);
        store
            .storage
            .save(br#"{"Version":"1.0","Object":{"gold":5}}"#, "base.json")
            .unwrap();
        // The patch rewrites the stamp along with the payload, as diffs over
        // whole containers naturally do.
        store
            .storage
            .save(
                br#"{"Version":["1.0","2.0"],"Object":{"gold":[5,50]}}"#,
                "patch.json",
            )
            .unwrap();

        // Gated to documents older than 2.0: must NOT run, because the merged
        // document is stamped 2.0 even though the base says 1.0.
        let converters =
            ConverterSet::new().with(VersionRange::before(Version::new(2, 0)), |_, _| {
                Err(ReliquaryError::convert("legacy converter ran unexpectedly"))
            });

        let back: Value = store
            .load_with_diffs("base.json", &["patch.json"], &converters)
            .unwrap();
        assert_eq!(back, json!({"gold": 50}));
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct BossDungeon {
        floors: u32,
    }

    impl Tagged for BossDungeon {
        fn type_tag(&self) -> &'static str {
            "BossDungeon"
        }
    }

    #[test]
    fn tagged_snapshot_round_trip_through_diffs() {
        #[derive(Debug, PartialEq)]
        enum Dungeon {
            Boss(BossDungeon),
        }

        let mut registry: TagRegistry<Dungeon> = TagRegistry::new();
        registry.register_type("BossDungeon", Dungeon::Boss);

        let store = store(1, 0);
        store
            .save_snapshot_tagged(&BossDungeon { floors: 5 }, "base.json")
            .unwrap();
        store
            .save_as_diff_tagged(&BossDungeon { floors: 9 }, "patch.json", "base.json")
            .unwrap();

        let back = store
            .load_with_diffs_tagged(
                "base.json",
                &["patch.json"],
                &ConverterSet::new(),
                &registry,
            )
            .unwrap();
        assert_eq!(back, Dungeon::Boss(BossDungeon { floors: 9 }));
    }
}
