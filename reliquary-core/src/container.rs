/*!
The document envelope and its textual rendering.

Every persisted document is exactly one top-level [`Container`]: a `"Version"`
stamp naming the producing application release and an `"Object"` payload
tree. The payload is opaque at this layer; the codec gives it meaning.
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ReliquaryError, Result, Version};

/// Wire name of the envelope's version stamp.
pub const VERSION_FIELD: &str = "Version";
/// Wire name of the envelope's payload.
pub const OBJECT_FIELD: &str = "Object";

/// The envelope pairing a version stamp with an arbitrary payload tree.
///
/// Containers are transient: one is built to wrap a payload for a single
/// encode, or reconstructed for a single decode, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "Version")]
    pub version: Version,
    #[serde(rename = "Object")]
    pub object: Value,
}

impl Container {
    pub fn new(version: Version, object: Value) -> Self {
        Self { version, object }
    }

    /// The envelope as a plain document tree, as the diff engine consumes it.
    pub fn into_tree(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Pull the payload tree out of a parsed document, consuming the envelope.
///
/// # Errors
/// `InvalidFormat` when the document is not a top-level object or has no
/// `"Object"` field. A missing `"Version"` is not checked here; that is the
/// extractor's degraded-but-tolerated condition.
pub fn take_object(tree: Value) -> Result<Value> {
    match tree {
        Value::Object(mut map) => map.remove(OBJECT_FIELD).ok_or_else(|| {
            ReliquaryError::invalid_format("document has no `Object` field")
        }),
        _ => Err(ReliquaryError::invalid_format(
            "expected a top-level snapshot object",
        )),
    }
}

/// Output formatting for rendered documents and patches.
///
/// `Pretty` is deterministic tab-indented text meant for documents kept under
/// source control; `Compact` is minified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Format {
    #[default]
    Pretty,
    Compact,
}

impl Format {
    /// Render a document tree to text in this format.
    pub fn render(&self, tree: &Value) -> Result<String> {
        match self {
            Format::Compact => Ok(serde_json::to_string(tree)?),
            Format::Pretty => {
                let mut out = Vec::with_capacity(256);
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
                let mut serializer =
                    serde_json::Serializer::with_formatter(&mut out, formatter);
                tree.serialize(&mut serializer)?;
                String::from_utf8(out).map_err(|e| {
                    ReliquaryError::invalid_format(format!(
                        "rendered document is not UTF-8: {e}"
                    ))
                })
            }
        }
    }
}
