/*!
Version stamps and the application version source.

Every persisted document is tagged with the version of the application that
produced it, in `major.minor[.build]` form. Reloading consults that stamp to
decide which upgrade converters apply, so `Version` ordering treats an absent
build component as build `0` (`"1.2"` and `"1.2.0"` compare equal).
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ReliquaryError, Result};

/// A `major.minor[.build]` version stamp.
///
/// Serializes as its string form, matching the wire `"Version"` field:
/// `"1.4"` or `"1.4.2"`.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
}

impl Version {
    /// Create a two-component version (`major.minor`)
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
        }
    }

    /// Create a three-component version (`major.minor.build`)
    pub fn with_build(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
        }
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.build.unwrap_or(0))
    }
}

impl Default for Version {
    /// The degraded version stamp: `0.0`, meaning "producer unknown"
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build {
            Some(build) => write!(f, "{}.{}.{}", self.major, self.minor, build),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

impl FromStr for Version {
    type Err = ReliquaryError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(ReliquaryError::invalid_format(format!(
                "version `{s}` is not of the form major.minor[.build]"
            )));
        }
        let component = |part: &str| -> Result<u32> {
            part.parse::<u32>().map_err(|_| {
                ReliquaryError::invalid_format(format!(
                    "version `{s}` has non-numeric component `{part}`"
                ))
            })
        };
        Ok(Self {
            major: component(parts[0])?,
            minor: component(parts[1])?,
            build: parts.get(2).map(|p| component(p)).transpose()?,
        })
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of the running application's version.
///
/// The core never decides what version to stamp on a new document; the
/// surrounding application supplies it through this trait. Note that this is
/// distinct from the decode-time context version, which is the version of the
/// *document being read*.
pub trait VersionSource {
    fn current_version(&self) -> Version;
}

/// A fixed application version, the common case for release builds.
#[derive(Debug, Clone, Copy)]
pub struct StaticVersion(pub Version);

impl VersionSource for StaticVersion {
    fn current_version(&self) -> Version {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_and_three_components() {
        assert_eq!("1.4".parse::<Version>().unwrap(), Version::new(1, 4));
        assert_eq!(
            "1.4.2".parse::<Version>().unwrap(),
            Version::with_build(1, 4, 2)
        );
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("1".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn absent_build_compares_as_zero() {
        assert_eq!(Version::new(1, 2), Version::with_build(1, 2, 0));
        assert!(Version::new(1, 2) < Version::with_build(1, 2, 1));
        assert!(Version::new(1, 3) > Version::with_build(1, 2, 9));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for v in [Version::new(0, 7), Version::with_build(2, 11, 3)] {
            assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
        }
    }

    #[test]
    fn serializes_as_wire_string() {
        let text = serde_json::to_string(&Version::with_build(7, 0, 13)).unwrap();
        assert_eq!(text, "\"7.0.13\"");
        let back: Version = serde_json::from_str(&text).unwrap();
        assert_eq!(back, Version::with_build(7, 0, 13));
    }
}
