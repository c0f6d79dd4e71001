/*!
The per-call decode context.

Upgrade converters need to know "what version produced the document I am
looking at". That value is the *document's* version, never the running
application's, and it is fixed for the whole of one decode: the codec builds
a [`DecodeContext`] once per call from the extracted stamp and threads it,
immutably, through every converter and registry decoder it invokes. There is
no process-wide slot and therefore nothing to lock; concurrent decodes are
independent by construction.
*/

use crate::Version;

/// Immutable context for a single decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    version: Version,
}

impl DecodeContext {
    /// Build the context for one decode from the document's extracted stamp.
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// The version of the document currently being decoded.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Convenience for converters gating on "older than release X".
    pub fn is_before(&self, version: Version) -> bool {
        self.version < version
    }
}
