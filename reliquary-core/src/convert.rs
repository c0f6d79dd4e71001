/*!
Upgrade converters: version-gated payload migrations.

A converter is a pure transform over the raw payload tree, paired with the
version range of documents it applies to. Converters are supplied per decode
call as an ordered set; every applicable transform runs in registration
order, before typed deserialization, so later converters see the output of
earlier ones. A transform that cannot make sense of its input fails the whole
decode — there is no partial migration.
*/

use serde_json::Value;

use crate::{DecodeContext, Result, Version};

/// A half-open version interval `[since, before)`, either end open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    since: Option<Version>,
    before: Option<Version>,
}

impl VersionRange {
    /// Matches every document version.
    pub fn any() -> Self {
        Self {
            since: None,
            before: None,
        }
    }

    /// Matches documents produced before `version` (exclusive). The common
    /// shape for "this schema changed in release X".
    pub fn before(version: Version) -> Self {
        Self {
            since: None,
            before: Some(version),
        }
    }

    /// Matches documents produced at or after `version`.
    pub fn since(version: Version) -> Self {
        Self {
            since: Some(version),
            before: None,
        }
    }

    /// Matches `since <= v < before`.
    pub fn between(since: Version, before: Version) -> Self {
        Self {
            since: Some(since),
            before: Some(before),
        }
    }

    pub fn contains(&self, version: Version) -> bool {
        if let Some(since) = self.since {
            if version < since {
                return false;
            }
        }
        if let Some(before) = self.before {
            if version >= before {
                return false;
            }
        }
        true
    }
}

type TransformFn = dyn Fn(&DecodeContext, Value) -> Result<Value> + Send + Sync;

/// One migration hook: an applicability range plus a pure transform.
pub struct Converter {
    range: VersionRange,
    transform: Box<TransformFn>,
}

impl Converter {
    pub fn new<F>(range: VersionRange, transform: F) -> Self
    where
        F: Fn(&DecodeContext, Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            range,
            transform: Box::new(transform),
        }
    }

    pub fn applies(&self, ctx: &DecodeContext) -> bool {
        self.range.contains(ctx.version())
    }

    pub fn run(&self, ctx: &DecodeContext, value: Value) -> Result<Value> {
        (self.transform)(ctx, value)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

/// An ordered collection of converters, evaluated in registration order.
#[derive(Debug, Default)]
pub struct ConverterSet {
    converters: Vec<Converter>,
}

impl ConverterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration; order of calls is order of evaluation.
    pub fn with<F>(mut self, range: VersionRange, transform: F) -> Self
    where
        F: Fn(&DecodeContext, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.converters.push(Converter::new(range, transform));
        self
    }

    pub fn push(&mut self, converter: Converter) {
        self.converters.push(converter);
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Run every applicable transform over the payload tree, in order.
    pub fn apply(&self, ctx: &DecodeContext, mut value: Value) -> Result<Value> {
        for converter in &self.converters {
            if converter.applies(ctx) {
                value = converter.run(ctx, value)?;
            }
        }
        Ok(value)
    }
}
