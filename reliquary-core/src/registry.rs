/*!
Tagged-variant registry for polymorphic reconstruction.

Fields whose declared type is trait-object-like carry a `"$type"`
discriminator in the persisted text so a decode can rebuild the exact
concrete variant. The mapping from discriminator tag to decoder lives in a
[`TagRegistry`], resolved at a single boundary in the codec. Unknown or
missing tags fail closed with a type-mismatch error; the registry never
guesses or substitutes a default.
*/

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{DecodeContext, ReliquaryError, Result};

/// Wire name of the embedded type discriminator.
pub const TYPE_TAG_FIELD: &str = "$type";

/// Encode-side half of polymorphism: a payload that knows its own tag.
pub trait Tagged {
    fn type_tag(&self) -> &'static str;
}

/// Embed a discriminator into an already-serialized payload tree.
///
/// # Errors
/// `InvalidFormat` when the payload did not serialize to a JSON object;
/// scalars and arrays have nowhere to carry a discriminator.
pub fn tag_tree(tag: &str, tree: Value) -> Result<Value> {
    match tree {
        Value::Object(mut map) => {
            map.insert(TYPE_TAG_FIELD.to_string(), Value::String(tag.to_string()));
            Ok(Value::Object(map))
        }
        other => Err(ReliquaryError::invalid_format(format!(
            "polymorphic payload tagged `{tag}` must serialize to a JSON object, got {other}"
        ))),
    }
}

type DecodeFn<T> = dyn Fn(&DecodeContext, Value) -> Result<T> + Send + Sync;

/// Discriminator-tag-to-decoder mapping for one supertype `T` (typically a
/// `Box<dyn Trait>`).
///
/// # Example
/// ```rust
/// use reliquary_core::{DecodeContext, TagRegistry, Version};
/// use serde::Deserialize;
///
/// trait Creature { fn hp(&self) -> i32; }
///
/// #[derive(Deserialize)]
/// struct Goblin { hp: i32 }
/// impl Creature for Goblin { fn hp(&self) -> i32 { self.hp } }
///
/// let mut registry: TagRegistry<Box<dyn Creature>> = TagRegistry::new();
/// registry.register_type("Goblin", |g: Goblin| Box::new(g) as Box<dyn Creature>);
///
/// let ctx = DecodeContext::new(Version::new(1, 0));
/// let value = serde_json::json!({"$type": "Goblin", "hp": 7});
/// let creature = registry.decode(&ctx, value).unwrap();
/// assert_eq!(creature.hp(), 7);
/// ```
pub struct TagRegistry<T> {
    decoders: HashMap<String, Box<DecodeFn<T>>>,
}

impl<T> Default for TagRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TagRegistry<T> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register a decoder closure for `tag`. A later registration under the
    /// same tag replaces the earlier one.
    pub fn register<F>(&mut self, tag: impl Into<String>, decode: F)
    where
        F: Fn(&DecodeContext, Value) -> Result<T> + Send + Sync + 'static,
    {
        self.decoders.insert(tag.into(), Box::new(decode));
    }

    /// Register a concrete `Deserialize` type under `tag`, with a projection
    /// into the supertype (usually just boxing).
    pub fn register_type<C, F>(&mut self, tag: impl Into<String>, into_super: F)
    where
        C: DeserializeOwned + 'static,
        F: Fn(C) -> T + Send + Sync + 'static,
    {
        self.register(tag, move |_ctx, value| {
            Ok(into_super(serde_json::from_value::<C>(value)?))
        });
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Resolve the payload's discriminator and run the matching decoder.
    ///
    /// The `"$type"` property is stripped before the decoder sees the tree.
    ///
    /// # Errors
    /// * `MissingDiscriminator` — the payload is not an object, or carries no
    ///   string `"$type"` property.
    /// * `TypeMismatch` — no decoder is registered for the named tag.
    pub fn decode(&self, ctx: &DecodeContext, value: Value) -> Result<T> {
        let mut value = value;
        let tag = match value.as_object_mut() {
            Some(map) => match map.remove(TYPE_TAG_FIELD) {
                Some(Value::String(tag)) => tag,
                _ => return Err(ReliquaryError::MissingDiscriminator),
            },
            None => return Err(ReliquaryError::MissingDiscriminator),
        };
        let decoder = self
            .decoders
            .get(&tag)
            .ok_or(ReliquaryError::TypeMismatch { tag: tag.clone() })?;
        decoder(ctx, value)
    }
}

impl<T> std::fmt::Debug for TagRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("TagRegistry").field("tags", &tags).finish()
    }
}
