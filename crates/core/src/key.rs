//! Namespaced dimension type keys.
//!
//! A dimension type is identified by a stable `namespace:path` key such as
//! `minecraft:the_nether`. The key is what gets persisted in world records, so
//! it is validated on construction and ordered lexically for stable iteration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace assumed when a key omits one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Error returned when parsing an invalid [`DimensionTypeKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key (or one of its halves) was empty.
    #[error("dimension type key {0} cannot be empty")]
    Empty(&'static str),
    /// One half of the key exceeded its length limit.
    #[error("dimension type key {part} too long (max {max})")]
    TooLong {
        /// Which half was too long.
        part: &'static str,
        /// Length limit for that half.
        max: usize,
    },
    /// A character outside the allowed set was found.
    #[error("dimension type key {part} has invalid character {found:?}")]
    InvalidChar {
        /// Which half held the character.
        part: &'static str,
        /// The offending character.
        found: char,
    },
}

/// A `namespace:path` key naming a dimension type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DimensionTypeKey {
    namespace: String,
    path: String,
}

impl DimensionTypeKey {
    /// Parse `namespace:path`, or a bare `path` in [`DEFAULT_NAMESPACE`].
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(KeyError::Empty("key"));
        }
        let (namespace, path) = input.split_once(':').unwrap_or((DEFAULT_NAMESPACE, input));
        check_part("namespace", namespace.trim(), 64, |c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
        })?;
        check_part("path", path.trim(), 128, |c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/')
        })?;
        Ok(Self {
            namespace: namespace.trim().to_string(),
            path: path.trim().to_string(),
        })
    }

    /// Key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn check_part(
    part: &'static str,
    value: &str,
    max: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::Empty(part));
    }
    if value.len() > max {
        return Err(KeyError::TooLong { part, max });
    }
    match value.chars().find(|c| !allowed(*c)) {
        Some(found) => Err(KeyError::InvalidChar { part, found }),
        None => Ok(()),
    }
}

impl fmt::Display for DimensionTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for DimensionTypeKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DimensionTypeKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DimensionTypeKey> for String {
    fn from(key: DimensionTypeKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_uses_default_namespace() {
        let key = DimensionTypeKey::parse("overworld").unwrap();
        assert_eq!(key.namespace(), "minecraft");
        assert_eq!(key.to_string(), "minecraft:overworld");
    }

    #[test]
    fn custom_namespace_is_kept() {
        let key: DimensionTypeKey = "skylands:floating".parse().unwrap();
        assert_eq!(key.namespace(), "skylands");
        assert_eq!(key.path(), "floating");
    }

    #[test]
    fn rejects_bad_keys() {
        assert_eq!(DimensionTypeKey::parse("  "), Err(KeyError::Empty("key")));
        assert_eq!(DimensionTypeKey::parse("mdm:"), Err(KeyError::Empty("path")));
        assert!(matches!(
            DimensionTypeKey::parse("Nether"),
            Err(KeyError::InvalidChar { found: 'N', .. })
        ));
    }

    #[test]
    fn converts_to_canonical_string() {
        let key = DimensionTypeKey::parse("the_end").unwrap();
        assert_eq!(String::from(key), "minecraft:the_end");
    }
}
