// Per-unit movement graphs and their incremental maintenance.
//
// Every unit that needs paths owns a private directed graph over the map:
// one node per placed tile, one edge per (tile, direction) pair. The graph is
// stored as an `EdgeTable`, a `Vec` indexed by `TileId` holding a small array
// of weights per direction, so an edge lookup is two index operations. Edges
// into tiles that do not exist are simply +∞.
//
// Edge weight is a property of the *destination* tile and the moving unit:
//
//   weight(u, from, to) = +∞                                      if !can_pass(u, to)
//                       = terrain_cost(u, to.terrain) * distance(from, to)  otherwise
//
// so the table is asymmetric. Capacity is not part of the weight: a full
// tile can still be passed through on the way somewhere else, it just cannot
// be where a walk ends (`can_stop`, checked by the pathfinder's endpoint).
//
// When something about a tile T changes
// (terrain, occupants, capacity) only the edges *entering* T need to be
// recomputed: for every neighbour n of T, the edge (n, direction_to(n, T)).
// `refresh_edges_into` does exactly that; edges leaving T are untouched.
//
// `Subscriptions` records which units want to hear about which tiles
// (tile → ordered set of units). A unit subscribes to every placed tile when
// its graph is built and unsubscribes when the graph is removed.
//
// Graph lifecycle (`GraphState`):
//
//   Unbuilt ──build──▶ Built ──tile placed/detached, cost table edit──▶ Stale
//      ▲                 │  ▲                                             │
//      └─────remove──────┘  └───────────────── rebuild ───────────────────┘
//
// See also: `game.rs` which owns the graphs and drives maintenance from each
// mutation, `pathfinding.rs` which searches an `EdgeTable`.
//
// **Critical constraint: determinism.** Tables are built in tile-id order and
// subscriptions are `BTreeSet`s; refresh order never affects the result since
// each edge weight is a pure function of the current map and unit state.

use crate::map::GameMap;
use crate::types::{TileId, UnitId};
use crate::unit::{PassRule, Unit};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Lifecycle of a unit's graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GraphState {
    /// No edge table. The unit is not subscribed to any tile.
    #[default]
    Unbuilt,
    /// Edge table matches the current map.
    Built,
    /// Map adjacency or the unit's cost table changed; the table must be
    /// rebuilt before the next path query.
    Stale,
}

/// Edge weights for one unit: `weights[tile][direction]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeTable {
    weights: Vec<SmallVec<[f64; 8]>>,
}

impl EdgeTable {
    /// Weight of the edge leaving `from` in `direction`; +∞ when there is no
    /// such edge.
    pub fn weight(&self, from: TileId, direction: u8) -> f64 {
        self.weights
            .get(from.index())
            .and_then(|row| row.get(direction as usize))
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    fn set(&mut self, from: TileId, direction: u8, weight: f64) {
        if let Some(slot) = self
            .weights
            .get_mut(from.index())
            .and_then(|row| row.get_mut(direction as usize))
        {
            *slot = weight;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Number of finite edges. Useful for tests and debugging.
    pub fn finite_edge_count(&self) -> usize {
        self.weights
            .iter()
            .flatten()
            .filter(|w| w.is_finite())
            .count()
    }
}

/// A unit's graph: its lifecycle state plus the edge table.
#[derive(Clone, Debug, Default)]
pub struct UnitGraph {
    pub state: GraphState,
    pub edges: EdgeTable,
}

/// Which units listen to which tiles.
#[derive(Clone, Debug, Default)]
pub struct Subscriptions {
    by_tile: BTreeMap<TileId, BTreeSet<UnitId>>,
}

impl Subscriptions {
    pub fn subscribe(&mut self, tile: TileId, unit: UnitId) {
        self.by_tile.entry(tile).or_default().insert(unit);
    }

    /// Remove `unit` from every tile's subscriber set.
    pub fn unsubscribe_all(&mut self, unit: UnitId) {
        self.by_tile.retain(|_, units| {
            units.remove(&unit);
            !units.is_empty()
        });
    }

    /// Units subscribed to `tile`, in id order.
    pub fn subscribers(&self, tile: TileId) -> Vec<UnitId> {
        self.by_tile
            .get(&tile)
            .map(|units| units.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, tile: TileId, unit: UnitId) -> bool {
        self.by_tile.get(&tile).is_some_and(|units| units.contains(&unit))
    }
}

/// Whether `unit` may pass through `tile`: terrain access, then the unit's
/// pass rule. Capacity is left to `can_stop`.
pub fn can_pass(map: &GameMap, units: &BTreeMap<UnitId, Unit>, unit: &Unit, tile: TileId) -> bool {
    let Some(t) = map.get(tile) else {
        return false;
    };
    if !unit.can_access(Some(t)) {
        return false;
    }
    match unit.pass_rule {
        PassRule::Open => true,
        PassRule::AvoidForeign => !t
            .occupants()
            .iter()
            .filter_map(|id| units.get(id))
            .any(|other| unit.is_foreign_to(other)),
    }
}

/// Whether `tile` has room for `unit` to end a walk there.
pub fn can_stop(map: &GameMap, unit: UnitId, tile: TileId) -> bool {
    map.get(tile).is_some_and(|t| t.can_carry(unit))
}

/// Cost for `unit` to step from `from` into `to`.
pub fn edge_weight(
    map: &GameMap,
    units: &BTreeMap<UnitId, Unit>,
    unit: &Unit,
    from: TileId,
    to: TileId,
) -> f64 {
    if !can_pass(map, units, unit, to) {
        return f64::INFINITY;
    }
    let Some(distance) = map.distance(from, to) else {
        return f64::INFINITY;
    };
    unit.terrain_cost(map.tile(to).terrain()) * distance
}

/// Compute the complete edge table for `unit` over the current map.
pub fn build_edges(map: &GameMap, units: &BTreeMap<UnitId, Unit>, unit: &Unit) -> EdgeTable {
    let count = map.tessellation().direction_count();
    let mut weights = vec![SmallVec::new(); map.tile_count()];
    for tile in map.placed_tiles() {
        weights[tile.index()] = (0..count)
            .map(|dir| match map.neighbor(tile, dir) {
                Some(n) => edge_weight(map, units, unit, tile, n),
                None => f64::INFINITY,
            })
            .collect();
    }
    EdgeTable { weights }
}

/// Recompute every edge of `unit`'s table that ends at `tile`.
pub fn refresh_edges_into(
    map: &GameMap,
    units: &BTreeMap<UnitId, Unit>,
    unit: &Unit,
    edges: &mut EdgeTable,
    tile: TileId,
) {
    for (_, neighbor) in map.neighbors(tile) {
        if let Some(dir) = map.direction_to(neighbor, tile) {
            edges.set(neighbor, dir, edge_weight(map, units, unit, neighbor, tile));
        }
    }
}
