//! Dimension identifiers and dimension type descriptors.
//!
//! A dimension is a numbered slot (`DimensionId`) bound to one dimension type.
//! Three slots are primordial and always exist: the primary world (0) and the
//! two auxiliary worlds (-1 and 1). Everything above is allocated at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DimensionTypeKey;

/// Signed identifier of a dimension slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionId(pub i32);

impl DimensionId {
    /// The primary world.
    pub const PRIMARY: Self = Self(0);
    /// First auxiliary primordial dimension (nether-like).
    pub const NETHER: Self = Self(-1);
    /// Second auxiliary primordial dimension (end-like).
    pub const END: Self = Self(1);

    /// The three primordial ids, in canonical order.
    pub const PRIMORDIAL: [Self; 3] = [Self::PRIMARY, Self::NETHER, Self::END];

    /// Raw numeric value.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Whether this is one of the three always-present ids.
    pub const fn is_primordial(self) -> bool {
        matches!(self.0, -1..=1)
    }

    /// Conventional folder name for primordial auxiliary dimensions.
    pub fn legacy_folder_name(self) -> Option<&'static str> {
        match self {
            Self::NETHER => Some("DIM-1"),
            Self::END => Some("DIM1"),
            _ => None,
        }
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered dimension type (always below
/// [`DimensionTypeId::CAPACITY`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionTypeId(u8);

impl DimensionTypeId {
    /// Size of the dimension type id space.
    pub const CAPACITY: usize = 128;

    /// Build an id, rejecting values outside the id space.
    pub const fn new(value: u8) -> Option<Self> {
        if (value as usize) < Self::CAPACITY {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Raw numeric value.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DimensionTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Environment flags carried by a dimension type. Opaque to the lifecycle core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    /// Sky light reaches the surface.
    pub has_skylight: bool,
    /// A bedrock ceiling caps the world.
    pub has_ceiling: bool,
    /// Water evaporates.
    pub ultrawarm: bool,
    /// Compasses and clocks work.
    pub natural: bool,
}

impl Environment {
    /// Surface-style environment.
    pub const SURFACE: Self = Self {
        has_skylight: true,
        has_ceiling: false,
        ultrawarm: false,
        natural: true,
    };

    /// Enclosed hot environment.
    pub const UNDERWORLD: Self = Self {
        has_skylight: false,
        has_ceiling: true,
        ultrawarm: true,
        natural: false,
    };

    /// Floating void environment.
    pub const VOID: Self = Self {
        has_skylight: false,
        has_ceiling: false,
        ultrawarm: false,
        natural: false,
    };
}

/// Descriptor of a class of world. Immutable once registered; compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionType {
    key: DimensionTypeKey,
    environment: Environment,
}

impl DimensionType {
    /// Create a descriptor.
    pub fn new(key: DimensionTypeKey, environment: Environment) -> Self {
        Self { key, environment }
    }

    /// Stable key naming this type.
    pub fn key(&self) -> &DimensionTypeKey {
        &self.key
    }

    /// Environment flags.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Built-in overworld type.
    pub fn overworld() -> Self {
        Self::builtin("overworld", Environment::SURFACE)
    }

    /// Built-in nether type.
    pub fn nether() -> Self {
        Self::builtin("the_nether", Environment::UNDERWORLD)
    }

    /// Built-in end type.
    pub fn the_end() -> Self {
        Self::builtin("the_end", Environment::VOID)
    }

    fn builtin(path: &str, environment: Environment) -> Self {
        let key = DimensionTypeKey::parse(path)
            .unwrap_or_else(|err| panic!("built-in dimension type key {path} is invalid: {err}"));
        Self::new(key, environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primordial_ids_are_stable() {
        assert_eq!(DimensionId::PRIMARY.get(), 0);
        assert_eq!(DimensionId::NETHER.get(), -1);
        assert_eq!(DimensionId::END.get(), 1);
        assert!(DimensionId(-1).is_primordial());
        assert!(!DimensionId(2).is_primordial());
        assert!(!DimensionId(-2).is_primordial());
    }

    #[test]
    fn legacy_folder_names() {
        assert_eq!(DimensionId::NETHER.legacy_folder_name(), Some("DIM-1"));
        assert_eq!(DimensionId::END.legacy_folder_name(), Some("DIM1"));
        assert_eq!(DimensionId::PRIMARY.legacy_folder_name(), None);
    }

    #[test]
    fn type_id_rejects_out_of_range() {
        assert_eq!(DimensionTypeId::new(127).map(DimensionTypeId::get), Some(127));
        assert!(DimensionTypeId::new(128).is_none());
    }

    #[test]
    fn builtin_types_are_distinct() {
        assert_ne!(DimensionType::overworld(), DimensionType::nether());
        assert_eq!(DimensionType::the_end().key().to_string(), "minecraft:the_end");
    }
}
