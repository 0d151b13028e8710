// Core types shared across the game core.
//
// Defines map coordinates (`Coordinate`) and the compact integer identifiers
// used to address tiles, units, players and terrains. Tiles live in an arena
// owned by `GameMap` (see `map.rs`) and units in a `BTreeMap` owned by `Game`
// (see `game.rs`); every cross-reference between them goes through these ids,
// never through owning pointers.
//
// All types derive `Serialize` and `Deserialize` so commands, events and
// configuration can carry them.
//
// **Critical constraint: determinism.** Ids are plain sequential integers
// handed out in allocation order. Every keyed collection in the crate is a
// `BTreeMap`/`BTreeSet` over these ids, so iteration order is a pure function
// of the call sequence.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in the 2D map grid.
///
/// `x` grows to the east, `y` grows to the north ("up"). Direction 0 of every
/// tessellation points toward increasing `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift this coordinate by the given deltas.
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Compact ids
// ---------------------------------------------------------------------------

macro_rules! compact_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl $name {
            /// Position of this id in its owning arena.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

compact_id!(/// Index of a tile in the map's tile arena.
TileId(u32));
compact_id!(/// Unique identifier for a unit.
UnitId(u32));
compact_id!(/// Unique identifier for a player (the owner of an allegiance).
PlayerId(u32));
compact_id!(/// Interned terrain tag. Names live in `config::TerrainTable`.
TerrainId(u16));
