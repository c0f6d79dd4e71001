/*!
The codec: full encode and decode of versioned documents.

Encoding wraps a payload and the application's current version into a
[`Container`] and renders it to text. Decoding runs the pipeline the other
way: extract the stamp (streaming pass), build the per-call
[`DecodeContext`], parse the envelope, run the supplied upgrade converters
over the raw payload tree, then deserialize into the requested type — with
an optional [`TagRegistry`] resolving polymorphic payloads at that last step.

All of this is synchronous and free of shared state; any number of decodes
may run concurrently and each converter observes exactly the version of the
document it was invoked for.
*/

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::container::{self, Container, Format};
use crate::convert::ConverterSet;
use crate::extract::{extract_version, version_of_tree};
use crate::registry::{tag_tree, TagRegistry, Tagged};
use crate::version::VersionSource;
use crate::{DecodeContext, Result};

/// Encoder/decoder pairing an application version source with an output
/// format.
///
/// # Example
/// ```rust
/// use reliquary_core::{Codec, ConverterSet, Format, StaticVersion, Version};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct Roster { names: Vec<String> }
///
/// let codec = Codec::new(StaticVersion(Version::new(1, 4)), Format::Compact);
/// let roster = Roster { names: vec!["Chikorita".into()] };
///
/// let text = codec.encode(&roster).unwrap();
/// let back: Roster = codec.decode(&text, &ConverterSet::new()).unwrap();
/// assert_eq!(back, roster);
/// ```
#[derive(Debug)]
pub struct Codec<V: VersionSource> {
    versions: V,
    format: Format,
}

impl<V: VersionSource> Codec<V> {
    pub fn new(versions: V, format: Format) -> Self {
        Self { versions, format }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn versions(&self) -> &V {
        &self.versions
    }

    /// Wrap `payload` in a Container stamped with the current application
    /// version and render it. No side effects; the caller owns writing the
    /// text to storage.
    pub fn encode<T: Serialize>(&self, payload: &T) -> Result<String> {
        let object = serde_json::to_value(payload)?;
        self.render_container(object)
    }

    /// As [`Codec::encode`], embedding the payload's `"$type"` discriminator
    /// so decode can rebuild the exact concrete subtype.
    pub fn encode_tagged<T: Tagged + Serialize>(&self, payload: &T) -> Result<String> {
        let object = tag_tree(payload.type_tag(), serde_json::to_value(payload)?)?;
        self.render_container(object)
    }

    /// Build the current Container as a parsed tree, for the diff engine.
    pub fn encode_tree<T: Serialize>(&self, payload: &T) -> Result<Value> {
        let object = serde_json::to_value(payload)?;
        Container::new(self.versions.current_version(), object).into_tree()
    }

    /// Tagged twin of [`Codec::encode_tree`].
    pub fn encode_tree_tagged<T: Tagged + Serialize>(&self, payload: &T) -> Result<Value> {
        let object = tag_tree(payload.type_tag(), serde_json::to_value(payload)?)?;
        Container::new(self.versions.current_version(), object).into_tree()
    }

    fn render_container(&self, object: Value) -> Result<String> {
        let tree = Container::new(self.versions.current_version(), object).into_tree()?;
        self.format.render(&tree)
    }

    /// Decode a full document into a concrete payload type.
    ///
    /// # Errors
    /// * `Parse` — malformed document text.
    /// * `InvalidFormat` — well-formed JSON that is not a Container.
    /// * `Convert` — an applicable upgrade converter rejected the payload.
    pub fn decode<T: DeserializeOwned>(
        &self,
        text: &str,
        converters: &ConverterSet,
    ) -> Result<T> {
        let ctx = DecodeContext::new(extract_version(text));
        let tree: Value = serde_json::from_str(text)?;
        let object = migrated_object(&ctx, tree, converters)?;
        Ok(serde_json::from_value(object)?)
    }

    /// Decode a full document whose payload is polymorphic, resolving the
    /// concrete subtype through `registry`. Unknown or missing discriminators
    /// fail closed with `TypeMismatch` / `MissingDiscriminator`.
    pub fn decode_tagged<T>(
        &self,
        text: &str,
        converters: &ConverterSet,
        registry: &TagRegistry<T>,
    ) -> Result<T> {
        let ctx = DecodeContext::new(extract_version(text));
        let tree: Value = serde_json::from_str(text)?;
        let object = migrated_object(&ctx, tree, converters)?;
        registry.decode(&ctx, object)
    }
}

/// Decode an already-parsed Container tree. The incremental loader lands
/// here after patch application, so the context version is read from the
/// tree it actually decodes — the final merged document, not the base.
pub fn decode_tree<T: DeserializeOwned>(tree: Value, converters: &ConverterSet) -> Result<T> {
    let ctx = DecodeContext::new(version_of_tree(&tree));
    let object = migrated_object(&ctx, tree, converters)?;
    Ok(serde_json::from_value(object)?)
}

/// Tagged twin of [`decode_tree`].
pub fn decode_tree_tagged<T>(
    tree: Value,
    converters: &ConverterSet,
    registry: &TagRegistry<T>,
) -> Result<T> {
    let ctx = DecodeContext::new(version_of_tree(&tree));
    let object = migrated_object(&ctx, tree, converters)?;
    registry.decode(&ctx, object)
}

fn migrated_object(
    ctx: &DecodeContext,
    tree: Value,
    converters: &ConverterSet,
) -> Result<Value> {
    let object = container::take_object(tree)?;
    converters.apply(ctx, object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::VersionRange;
    use crate::version::StaticVersion;
    use crate::{ReliquaryError, Version};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
    struct Party {
        leader: String,
        level: u32,
    }

    fn codec(major: u32, minor: u32, format: Format) -> Codec<StaticVersion> {
        Codec::new(StaticVersion(Version::new(major, minor)), format)
    }

    #[test]
    fn round_trips_a_concrete_payload() {
        let codec = codec(1, 4, Format::Compact);
        let party = Party {
            leader: "Eevee".into(),
            level: 23,
        };
        let text = codec.encode(&party).unwrap();
        let back: Party = codec.decode(&text, &ConverterSet::new()).unwrap();
        assert_eq!(back, party);
    }

    #[test]
    fn encode_stamps_the_application_version() {
        let codec = codec(2, 9, Format::Compact);
        let text = codec.encode(&json!({})).unwrap();
        assert_eq!(extract_version(&text), Version::new(2, 9));
    }

    #[test]
    fn pretty_and_compact_are_semantically_identical() {
        let party = Party {
            leader: "Mudkip".into(),
            level: 5,
        };
        let compact = codec(1, 0, Format::Compact).encode(&party).unwrap();
        let pretty = codec(1, 0, Format::Pretty).encode(&party).unwrap();
        assert_ne!(compact, pretty);
        let a: Value = serde_json::from_str(&compact).unwrap();
        let b: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let codec = codec(1, 0, Format::Compact);
        let err = codec
            .decode::<Party>("{\"Version\":", &ConverterSet::new())
            .unwrap_err();
        assert!(matches!(err, ReliquaryError::Parse(_)));
    }

    #[test]
    fn document_without_object_field_is_invalid() {
        let codec = codec(1, 0, Format::Compact);
        let err = codec
            .decode::<Value>(r#"{"Version":"1.0"}"#, &ConverterSet::new())
            .unwrap_err();
        assert!(matches!(err, ReliquaryError::InvalidFormat(_)));
    }

    #[test]
    fn converters_see_the_document_version_not_the_app_version() {
        // Document written by 0.7; decoded by an app running 3.0.
        let old_codec = codec(0, 7, Format::Compact);
        let text = old_codec.encode(&json!({"name": "Totodile"})).unwrap();

        let converters = ConverterSet::new().with(VersionRange::any(), |ctx, mut v| {
            v["decoded_from"] = json!(ctx.version().to_string());
            Ok(v)
        });
        let new_codec = codec(3, 0, Format::Compact);
        let out: Value = new_codec.decode(&text, &converters).unwrap();
        assert_eq!(out["decoded_from"], json!("0.7"));
    }

    #[test]
    fn migration_runs_before_typed_deserialization() {
        // A 0.x document spells the field `lv`; Party requires `level`.
        let text = r#"{"Version":"0.5","Object":{"leader":"Eevee","lv":9}}"#;
        let converters =
            ConverterSet::new().with(VersionRange::before(Version::new(1, 0)), |_, mut v| {
                let lv = v["lv"].take();
                v.as_object_mut()
                    .ok_or_else(|| ReliquaryError::convert("expected an object payload"))?
                    .remove("lv");
                v["level"] = lv;
                Ok(v)
            });

        let codec = codec(1, 0, Format::Compact);
        let party: Party = codec.decode(text, &converters).unwrap();
        assert_eq!(party.level, 9);

        // The same converter set leaves a current document untouched.
        let current = codec
            .encode(&Party {
                leader: "Eevee".into(),
                level: 9,
            })
            .unwrap();
        let party: Party = codec.decode(&current, &converters).unwrap();
        assert_eq!(party.level, 9);
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Apple {
        heals: u32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Orb {
        radius: u32,
    }

    #[derive(Debug, PartialEq)]
    enum Item {
        Apple(Apple),
        Orb(Orb),
    }

    impl Tagged for Apple {
        fn type_tag(&self) -> &'static str {
            "Apple"
        }
    }

    impl Tagged for Orb {
        fn type_tag(&self) -> &'static str {
            "Orb"
        }
    }

    fn item_registry() -> TagRegistry<Item> {
        let mut registry = TagRegistry::new();
        registry.register_type("Apple", Item::Apple);
        registry.register_type("Orb", Item::Orb);
        registry
    }

    #[test]
    fn polymorphic_round_trip_preserves_subtype_identity() {
        let codec = codec(1, 0, Format::Pretty);
        let text = codec.encode_tagged(&Orb { radius: 3 }).unwrap();
        assert!(text.contains("\"$type\""));

        let item = codec
            .decode_tagged(&text, &ConverterSet::new(), &item_registry())
            .unwrap();
        assert_eq!(item, Item::Orb(Orb { radius: 3 }));
    }

    #[test]
    fn unknown_discriminator_fails_closed() {
        let codec = codec(1, 0, Format::Compact);
        let text = r#"{"Version":"1.0","Object":{"$type":"Seed","heals":1}}"#;
        let err = codec
            .decode_tagged::<Item>(text, &ConverterSet::new(), &item_registry())
            .unwrap_err();
        assert!(matches!(err, ReliquaryError::TypeMismatch { tag } if tag == "Seed"));
    }

    #[test]
    fn tree_decode_matches_text_decode() {
        let codec = codec(1, 2, Format::Compact);
        let party = Party {
            leader: "Cyndaquil".into(),
            level: 12,
        };
        let tree = codec.encode_tree(&party).unwrap();
        let back: Party = decode_tree(tree, &ConverterSet::new()).unwrap();
        assert_eq!(back, party);
    }
}
