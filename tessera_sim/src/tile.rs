// A single map cell.
//
// Tiles are stored in the map's arena (`GameMap.tiles`, indexed by `TileId`)
// and know nothing about their neighbours: adjacency is a property of the
// map's tessellation and grid, resolved in `map.rs`. A tile carries its
// coordinate (while placed), a terrain tag, a capacity and the set of units
// standing on it.
//
// Fields are private to the crate. All mutation goes through `GameMap` (for
// placement) or `Game` (for terrain, capacity and occupancy), because each of
// those changes has to be mirrored elsewhere: in the grid, in unit positions,
// or in subscribed units' edge tables.
//
// See also: `map.rs` for the grid/tile invariant, `game.rs` for occupancy
// changes and the events they emit.

use crate::types::{Coordinate, TerrainId, TileId, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Capacity value meaning "no limit".
pub const UNBOUNDED_CAPACITY: u32 = u32::MAX;

/// One cell of the map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tile {
    id: TileId,
    /// `Some` while the tile is placed in the map's grid.
    coordinate: Option<Coordinate>,
    terrain: TerrainId,
    capacity: u32,
    occupants: BTreeSet<UnitId>,
}

impl Tile {
    pub(crate) fn new(id: TileId, terrain: TerrainId, capacity: u32) -> Self {
        Self {
            id,
            coordinate: None,
            terrain,
            capacity,
            occupants: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    /// The tile's grid coordinate, or `None` while detached.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn is_placed(&self) -> bool {
        self.coordinate.is_some()
    }

    pub fn terrain(&self) -> TerrainId {
        self.terrain
    }

    /// Maximum number of occupants. `UNBOUNDED_CAPACITY` means no limit.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn occupants(&self) -> &BTreeSet<UnitId> {
        &self.occupants
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.occupants.contains(&unit)
    }

    /// Whether the tile has room for `unit`. A unit already standing here
    /// always fits.
    pub fn can_carry(&self, unit: UnitId) -> bool {
        self.contains(unit) || (self.occupants.len() as u64) < u64::from(self.capacity)
    }

    pub(crate) fn set_coordinate(&mut self, coordinate: Option<Coordinate>) {
        self.coordinate = coordinate;
    }

    pub(crate) fn set_terrain(&mut self, terrain: TerrainId) {
        self.terrain = terrain;
    }

    pub(crate) fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
    }

    /// Returns `false` if the unit was already present.
    pub(crate) fn insert_occupant(&mut self, unit: UnitId) -> bool {
        self.occupants.insert(unit)
    }

    /// Returns `false` if the unit was not present.
    pub(crate) fn remove_occupant(&mut self, unit: UnitId) -> bool {
        self.occupants.remove(&unit)
    }
}
