//! Travel modes and per-edge traversal permissions

use serde::Deserialize;

const WALK_BIT: u8 = 0b001;
const BICYCLE_BIT: u8 = 0b010;
const CAR_BIT: u8 = 0b100;

/// Non-transit travel mode used to decide which street edges may be linked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraverseMode {
    Walk,
    Bicycle,
    Car,
}

impl TraverseMode {
    const fn bit(self) -> u8 {
        match self {
            TraverseMode::Walk => WALK_BIT,
            TraverseMode::Bicycle => BICYCLE_BIT,
            TraverseMode::Car => CAR_BIT,
        }
    }
}

/// Set of modes accepted when filtering link candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraverseModeSet(u8);

impl TraverseModeSet {
    pub const fn single(mode: TraverseMode) -> Self {
        Self(mode.bit())
    }

    /// Modes accepted when linking for `mode`.
    ///
    /// Cyclists may dismount, so a bicycle search also accepts walk-only edges.
    pub const fn for_linking(mode: TraverseMode) -> Self {
        match mode {
            TraverseMode::Bicycle => Self(BICYCLE_BIT | WALK_BIT),
            other => Self::single(other),
        }
    }

    pub const fn contains(self, mode: TraverseMode) -> bool {
        self.0 & mode.bit() != 0
    }
}

/// Modes allowed to traverse an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permission(u8);

impl Permission {
    pub const NONE: Permission = Permission(0);
    pub const PEDESTRIAN: Permission = Permission(WALK_BIT);
    pub const BICYCLE: Permission = Permission(BICYCLE_BIT);
    pub const CAR: Permission = Permission(CAR_BIT);
    pub const PEDESTRIAN_AND_BICYCLE: Permission = Permission(WALK_BIT | BICYCLE_BIT);
    pub const PEDESTRIAN_AND_CAR: Permission = Permission(WALK_BIT | CAR_BIT);
    pub const BICYCLE_AND_CAR: Permission = Permission(BICYCLE_BIT | CAR_BIT);
    pub const ALL: Permission = Permission(WALK_BIT | BICYCLE_BIT | CAR_BIT);

    pub const fn allows(self, mode: TraverseMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub const fn allows_any(self, modes: TraverseModeSet) -> bool {
        self.0 & modes.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }
}
