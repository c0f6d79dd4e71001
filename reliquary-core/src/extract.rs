/*!
Streaming version extraction.

Determining which release produced a document must not require a full decode:
the payload may be huge, and its polymorphic fields may not even be decodable
until the right upgrade converters are chosen. This pass walks the top-level
properties of the raw text forward-only, structurally skipping every value
other than `"Version"` (skipped values are consumed through
[`serde::de::IgnoredAny`], never materialized), and stops at the first match.

This pass never fails its caller. A missing or unparseable version — or text
that is not a JSON object at all — degrades to [`Version::default`] (`0.0`)
with a `tracing` diagnostic.
*/

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::Value;
use tracing::warn;

use crate::container::VERSION_FIELD;
use crate::Version;

enum Scanned {
    Found(Version),
    BadValue(String),
    Absent,
}

/// Scans the top-level properties of one document, recording the outcome into
/// a slot so that a version found before any later malformed text survives.
struct TopLevelScan<'a>(&'a mut Option<Scanned>);

impl<'de> DeserializeSeed<'de> for TopLevelScan<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for TopLevelScan<'_> {
    type Value = ();

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a top-level snapshot object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            if key == VERSION_FIELD {
                let raw: String = map.next_value()?;
                *self.0 = Some(match raw.parse::<Version>() {
                    Ok(version) => Scanned::Found(version),
                    Err(_) => Scanned::BadValue(raw),
                });
                // The remaining properties still have to be walked so the
                // map access protocol stays balanced, but they are skipped
                // without being materialized.
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                return Ok(());
            }
            map.next_value::<IgnoredAny>()?;
        }
        *self.0 = Some(Scanned::Absent);
        Ok(())
    }
}

/// Read the `"Version"` stamp from raw document text without decoding the
/// payload.
///
/// Returns `Version(0, 0)` and logs a diagnostic when the field is absent,
/// unparseable, or the text is malformed before the field is reached. Once
/// the stamp has been read, later garbage in the text is not this pass's
/// problem; the full decoder will report it.
///
/// # Example
/// ```rust
/// use reliquary_core::{extract_version, Version};
///
/// let version = extract_version(r#"{"Version":"2.3","Object":"<garbage>"}"#);
/// assert_eq!(version, Version::new(2, 3));
/// ```
pub fn extract_version(text: &str) -> Version {
    let mut scanned = None;
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let outcome = TopLevelScan(&mut scanned).deserialize(&mut deserializer);

    match scanned {
        Some(Scanned::Found(version)) => return version,
        Some(Scanned::BadValue(raw)) => {
            warn!(raw = %raw, "document Version is not parseable; assuming 0.0");
        }
        Some(Scanned::Absent) => {
            warn!("document carries no Version field; assuming 0.0");
        }
        None => match outcome {
            Err(err) => warn!(error = %err, "could not scan document for Version; assuming 0.0"),
            Ok(()) => warn!("document carries no Version field; assuming 0.0"),
        },
    }
    Version::default()
}

/// Tree-level twin of [`extract_version`], for documents already parsed (the
/// incremental path reads the stamp from the final merged tree, not the base).
/// Same degraded-default contract.
pub fn version_of_tree(tree: &Value) -> Version {
    match tree.get(VERSION_FIELD) {
        Some(Value::String(raw)) => match raw.parse::<Version>() {
            Ok(version) => version,
            Err(_) => {
                warn!(raw = raw.as_str(), "document Version is not parseable; assuming 0.0");
                Version::default()
            }
        },
        Some(_) => {
            warn!("document Version is not a string; assuming 0.0");
            Version::default()
        }
        None => {
            warn!("document carries no Version field; assuming 0.0");
            Version::default()
        }
    }
}
