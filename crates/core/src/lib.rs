#![warn(missing_docs)]
//! Core identifiers shared across the workspace.

pub mod dimension;
pub mod key;

use serde::{Deserialize, Serialize};

pub use dimension::{DimensionId, DimensionType, DimensionTypeId, Environment};
pub use key::{DimensionTypeKey, KeyError, DEFAULT_NAMESPACE};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// Whether this tick lands on a multiple of `interval` (never true for a zero interval).
    pub fn is_multiple_of(self, interval: u64) -> bool {
        interval != 0 && self.0 % interval == 0
    }
}
