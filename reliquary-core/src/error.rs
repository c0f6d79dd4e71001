/*!
Error types for the Reliquary core engine.
*/

use thiserror::Error;

/// Result type used throughout the Reliquary core.
pub type Result<T> = std::result::Result<T, ReliquaryError>;

/// Errors that can occur during snapshot encode, decode, and patch operations.
///
/// A missing or unparseable `Version` field is deliberately *not* represented
/// here: version extraction degrades to `0.0` with a logged diagnostic and
/// never fails its caller.
#[derive(Error, Debug)]
pub enum ReliquaryError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed document text during a full decode
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A discriminator named a type with no registered decoder
    #[error("type mismatch: no decoder registered for discriminator `{tag}`")]
    TypeMismatch { tag: String },

    /// A polymorphic payload carried no discriminator at all
    #[error("type mismatch: payload object carries no `$type` discriminator")]
    MissingDiscriminator,

    /// A patch did not apply cleanly to its base document
    #[error("patch error at `{path}`: {reason}")]
    Patch { path: String, reason: String },

    /// An upgrade converter rejected the subtree it was given
    #[error("converter error: {0}")]
    Convert(String),

    /// Storage adapter errors
    #[error("storage error: {0}")]
    Storage(String),

    /// Structurally valid JSON that is not a valid snapshot document
    #[error("invalid document format: {0}")]
    InvalidFormat(String),
}

impl ReliquaryError {
    /// Create a new patch error for the given document path
    pub fn patch<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::Patch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new converter error
    pub fn convert<S: Into<String>>(msg: S) -> Self {
        Self::Convert(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }
}
