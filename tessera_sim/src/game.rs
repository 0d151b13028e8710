// Core game state: map, units, per-unit graphs and the event log.
//
// `Game` is the single owner of everything mutable. It holds the `GameMap`
// (tile arena + grid), the unit registry (`BTreeMap<UnitId, Unit>`), each
// unit's graph (`BTreeMap<UnitId, UnitGraph>`, kept beside the registry so a
// unit and its edge table can be borrowed at the same time), the tile
// subscriptions and the `EventLog`.
//
// Every public mutation follows the same shape: validate, mutate, log an
// event, then run graph maintenance before returning. Maintenance rules:
//
// - Terrain, occupancy or capacity change at tile T: every subscriber of T
//   whose graph is `Built` recomputes the edges entering T
//   (`graph::refresh_edges_into`).
// - Allegiance change of unit U: every `Built` graph, on or off the map,
//   recomputes its edges into U's tile (if U has one). U's own `Built` graph
//   additionally refreshes its edges into every other occupied tile, since
//   its foreignness toward their occupants flipped.
// - Capacity never enters an edge weight. Full tiles can be passed through;
//   the pathfinder only refuses them as the place a walk ends.
// - Tile placed or detached: adjacency changed, so every `Built` graph turns
//   `Stale`. Stale graphs ignore per-tile refreshes and are rebuilt in full by
//   the next `find_path` (or `build_graph`).
// - A unit's cost-table edit: that unit's graph turns `Stale`.
//
// ## Movement
//
// `set_position` is the only way a unit's tile changes. It builds the unit's
// graph lazily the first time the unit lands on a tile. `move_to` asks the
// pathfinder for a route within the unit's current allowance, then walks it
// step by step: face the next tile, `set_position` (intermediate steps may
// pass through full tiles), deduct the cumulative-cost delta. A rejected step
// ends the walk where the unit stands. `move_to` reports success only when
// the unit ends on the requested target; a best-effort walk that stops short
// returns `false`.
//
// Legality policy (whose turn it is, who may move) is not decided here; see
// `command.rs` for the `MoveArbiter` seam and `Game::apply`.
//
// See also: `graph.rs` for edge weights and subscriptions, `pathfinding.rs`
// for the search, `event.rs` for the emitted events, `config.rs` for building
// a `Game` from JSON.
//
// The event log is unbounded: it only shrinks when a caller drains it with
// `drain_events`. Front ends drain once per turn or per applied action.
//
// **Critical constraint: determinism.** All keyed collections are `BTreeMap`
// / `BTreeSet` and unit ids are sequential, so the same call sequence always
// yields the same state and the same event log.

use crate::config::{TerrainTable, UnitProfile};
use crate::event::{EventLog, GameEvent, GameEventKind};
use crate::graph::{self, GraphState, Subscriptions, UnitGraph};
use crate::map::GameMap;
use crate::pathfinding::{self, Path};
use crate::tile::Tile;
use crate::types::{Coordinate, PlayerId, TerrainId, TileId, UnitId};
use crate::unit::{Unit, UnitSpec};
use std::collections::{BTreeMap, BTreeSet};

/// The complete mutable state of one game.
#[derive(Clone, Debug)]
pub struct Game {
    map: GameMap,
    units: BTreeMap<UnitId, Unit>,
    graphs: BTreeMap<UnitId, UnitGraph>,
    subscriptions: Subscriptions,
    events: EventLog,
    /// Terrain names for this game. Empty unless built from config.
    pub(crate) terrains: TerrainTable,
    /// Named unit profiles available to `spawn_profile`.
    pub(crate) profiles: BTreeMap<String, UnitProfile>,
    next_unit_id: u32,
}

impl Game {
    /// Start a game on `map` with no units.
    pub fn new(map: GameMap) -> Self {
        Self {
            map,
            units: BTreeMap::new(),
            graphs: BTreeMap::new(),
            subscriptions: Subscriptions::default(),
            events: EventLog::new(),
            terrains: TerrainTable::default(),
            profiles: BTreeMap::new(),
            next_unit_id: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn terrains(&self) -> &TerrainTable {
        &self.terrains
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// All units, in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.map.get(id)
    }

    pub fn position(&self, unit: UnitId) -> Option<TileId> {
        self.units.get(&unit).and_then(|u| u.position)
    }

    /// Units standing on `tile`, in id order.
    pub fn occupants(&self, tile: TileId) -> Vec<UnitId> {
        self.map
            .get(tile)
            .map(|t| t.occupants().iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn graph_state(&self, unit: UnitId) -> GraphState {
        self.graphs
            .get(&unit)
            .map_or(GraphState::Unbuilt, |g| g.state)
    }

    /// The stored weight of `unit`'s edge leaving `from` in `direction`.
    /// +∞ when the unit has no graph or no such edge exists.
    pub fn edge_weight(&self, unit: UnitId, from: TileId, direction: u8) -> f64 {
        self.graphs
            .get(&unit)
            .map_or(f64::INFINITY, |g| g.edges.weight(from, direction))
    }

    /// Whether `unit` currently listens for changes on `tile`.
    pub fn is_subscribed(&self, tile: TileId, unit: UnitId) -> bool {
        self.subscriptions.is_subscribed(tile, unit)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Remove and return all events logged since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    // -----------------------------------------------------------------------
    // Units
    // -----------------------------------------------------------------------

    /// Create a unit off the map.
    pub fn spawn_unit(&mut self, spec: UnitSpec) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.insert(id, Unit::from_spec(id, spec));
        self.events.push(GameEventKind::UnitSpawned { unit: id });
        id
    }

    /// Take a unit off the map, drop its graph and remove it from the game.
    /// Returns `false` if the unit does not exist.
    pub fn destroy_unit(&mut self, id: UnitId) -> bool {
        if !self.units.contains_key(&id) {
            return false;
        }
        self.relocate(id, None, false);
        self.remove_graph(id);
        self.units.remove(&id);
        self.events.push(GameEventKind::UnitDestroyed { unit: id });
        true
    }

    /// Inflict damage. A unit whose health reaches zero is destroyed.
    /// Returns the remaining health, or `None` if the unit does not exist.
    pub fn damage(&mut self, id: UnitId, amount: u32) -> Option<u32> {
        let unit = self.units.get_mut(&id)?;
        let remaining = unit.health.current.saturating_sub(amount);
        unit.health.current = remaining;
        if remaining == 0 {
            self.destroy_unit(id);
        }
        Some(remaining)
    }

    /// Restore health, capped at the maximum.
    pub fn repair(&mut self, id: UnitId, amount: u32) -> Option<u32> {
        let unit = self.units.get_mut(&id)?;
        unit.health.current = unit
            .health
            .current
            .saturating_add(amount)
            .min(unit.health.max);
        Some(unit.health.current)
    }

    /// Refill a unit's movement allowance.
    pub fn restore_allowance(&mut self, id: UnitId) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.allowance.refill();
                true
            }
            None => false,
        }
    }

    /// Refill the allowance of every unit owned by `player`, as at the start
    /// of that player's turn.
    pub fn begin_turn(&mut self, player: PlayerId) {
        for unit in self.units.values_mut() {
            if unit.allegiance == Some(player) {
                unit.allowance.refill();
            }
        }
    }

    /// Change a unit's cost for entering `terrain`. Negative or NaN costs are
    /// rejected. A built graph becomes stale.
    pub fn set_terrain_cost(&mut self, id: UnitId, terrain: TerrainId, cost: f64) -> bool {
        if cost.is_nan() || cost < 0.0 {
            return false;
        }
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        unit.terrain_costs.insert(terrain, cost);
        self.mark_stale(id);
        true
    }

    /// Change which player a unit belongs to.
    pub fn set_allegiance(&mut self, id: UnitId, allegiance: Option<PlayerId>) -> bool {
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        if unit.allegiance == allegiance {
            return false;
        }
        let previous = std::mem::replace(&mut unit.allegiance, allegiance);
        self.events.push(GameEventKind::AllegianceChanged {
            unit: id,
            previous,
            allegiance,
        });
        self.refresh_after_allegiance_change(id);
        true
    }

    // -----------------------------------------------------------------------
    // Tiles
    // -----------------------------------------------------------------------

    /// Allocate a new detached tile.
    pub fn create_tile(&mut self, terrain: TerrainId) -> TileId {
        self.map.create_tile(terrain)
    }

    /// Bind `tile` to `coord` (see `GameMap::place`). Every built graph goes
    /// stale.
    pub fn place_tile(&mut self, coord: Coordinate, tile: TileId) -> bool {
        let displaced = self.map.tile_at_coord(coord).filter(|&t| t != tile);
        let previous = self.map.get(tile).and_then(Tile::coordinate);
        if !self.map.place(coord, tile) {
            return false;
        }
        if let Some(d) = displaced {
            self.events.push(GameEventKind::TileDetached {
                tile: d,
                coordinate: coord,
            });
        }
        if let Some(c) = previous {
            self.events.push(GameEventKind::TileDetached {
                tile,
                coordinate: c,
            });
        }
        self.events.push(GameEventKind::TilePlaced {
            tile,
            coordinate: coord,
        });
        self.invalidate_graphs();
        true
    }

    /// Remove `tile` from the grid. Units standing on it stay on it.
    pub fn detach_tile(&mut self, tile: TileId) -> bool {
        let Some(coordinate) = self.map.get(tile).and_then(Tile::coordinate) else {
            return false;
        };
        self.map.detach(tile);
        self.events
            .push(GameEventKind::TileDetached { tile, coordinate });
        self.invalidate_graphs();
        true
    }

    pub fn set_terrain(&mut self, tile: TileId, terrain: TerrainId) -> bool {
        let Some(t) = self.map.get_mut(tile) else {
            return false;
        };
        let previous = t.terrain();
        if previous == terrain {
            return false;
        }
        t.set_terrain(terrain);
        self.events.push(GameEventKind::TerrainChanged {
            tile,
            previous,
            terrain,
        });
        self.refresh_subscribers(tile);
        true
    }

    /// Change how many units fit on `tile`. Existing occupants are never
    /// evicted, even if they now exceed the capacity.
    pub fn set_capacity(&mut self, tile: TileId, capacity: u32) -> bool {
        let Some(t) = self.map.get_mut(tile) else {
            return false;
        };
        let previous = t.capacity();
        if previous == capacity {
            return false;
        }
        t.set_capacity(capacity);
        self.events.push(GameEventKind::CapacityChanged {
            tile,
            previous,
            capacity,
        });
        self.refresh_subscribers(tile);
        true
    }

    /// Put `unit` on `tile`. Same rules as `set_position`.
    pub fn add_occupant(&mut self, tile: TileId, unit: UnitId) -> bool {
        self.set_position(unit, Some(tile))
    }

    /// Take `unit` off `tile`. Returns `false` if it is not standing there.
    pub fn remove_occupant(&mut self, tile: TileId, unit: UnitId) -> bool {
        if self.position(unit) != Some(tile) {
            return false;
        }
        self.set_position(unit, None)
    }

    // -----------------------------------------------------------------------
    // Position and facing
    // -----------------------------------------------------------------------

    /// Move a unit directly onto `tile` (or off the map with `None`).
    ///
    /// Returns `false` without changing anything when the unit does not
    /// exist, the tile's terrain is inaccessible to it, the tile is full, or
    /// the unit already stands there.
    pub fn set_position(&mut self, id: UnitId, tile: Option<TileId>) -> bool {
        self.relocate(id, tile, false)
    }

    /// `set_position` with an optional capacity exemption for tiles a unit
    /// only passes through on its way somewhere else.
    fn relocate(&mut self, id: UnitId, tile: Option<TileId>, pass_through: bool) -> bool {
        let Some(unit) = self.units.get(&id) else {
            return false;
        };
        let from = unit.position;
        if from == tile {
            return false;
        }
        if let Some(t) = tile {
            let Some(target) = self.map.get(t) else {
                return false;
            };
            if !unit.can_access(Some(target)) || !(pass_through || target.can_carry(id)) {
                return false;
            }
        }

        if tile.is_some() && self.graph_state(id) == GraphState::Unbuilt {
            self.build_graph(id);
        }

        if let Some(unit) = self.units.get_mut(&id) {
            unit.position = tile;
        }
        if let Some(old) = from {
            if let Some(t) = self.map.get_mut(old) {
                t.remove_occupant(id);
            }
            self.events
                .push(GameEventKind::OccupantRemoved { tile: old, unit: id });
            self.refresh_subscribers(old);
        }
        if let Some(new) = tile {
            if let Some(t) = self.map.get_mut(new) {
                t.insert_occupant(id);
            }
            self.events
                .push(GameEventKind::OccupantAdded { tile: new, unit: id });
            self.refresh_subscribers(new);
        }
        self.events.push(GameEventKind::UnitMoved {
            unit: id,
            from,
            to: tile,
        });
        true
    }

    /// Turn a positioned unit to face `direction`. Returns `false` for an
    /// invalid direction or when the facing is unchanged.
    pub fn set_facing(&mut self, id: UnitId, direction: u8) -> bool {
        let count = self.map.tessellation().direction_count();
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        if unit.position.is_none() || direction >= count || unit.facing == direction {
            return false;
        }
        let previous = std::mem::replace(&mut unit.facing, direction);
        self.events.push(GameEventKind::FacingChanged {
            unit: id,
            previous,
            facing: direction,
        });
        true
    }

    /// Rotate one direction counter-clockwise.
    pub fn turn_left(&mut self, id: UnitId) -> bool {
        self.turn(id, 1)
    }

    /// Rotate one direction clockwise.
    pub fn turn_right(&mut self, id: UnitId) -> bool {
        let count = self.map.tessellation().direction_count();
        self.turn(id, count - 1)
    }

    fn turn(&mut self, id: UnitId, steps: u8) -> bool {
        let count = self.map.tessellation().direction_count();
        let Some(unit) = self.units.get(&id) else {
            return false;
        };
        if !unit.is_mobile() || unit.position.is_none() {
            return false;
        }
        let facing = (unit.facing + steps) % count;
        self.set_facing(id, facing)
    }

    // -----------------------------------------------------------------------
    // Graphs
    // -----------------------------------------------------------------------

    /// Compute `unit`'s full edge table and subscribe it to every placed
    /// tile. Does nothing if the graph is already built.
    pub fn build_graph(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.units.get(&id) else {
            return false;
        };
        if self.graph_state(id) == GraphState::Built {
            return true;
        }
        let edges = graph::build_edges(&self.map, &self.units, unit);
        self.subscriptions.unsubscribe_all(id);
        for tile in self.map.placed_tiles() {
            self.subscriptions.subscribe(tile, id);
        }
        self.graphs.insert(
            id,
            UnitGraph {
                state: GraphState::Built,
                edges,
            },
        );
        true
    }

    /// Drop `unit`'s edge table and all its subscriptions.
    pub fn remove_graph(&mut self, id: UnitId) -> bool {
        self.subscriptions.unsubscribe_all(id);
        self.graphs.remove(&id).is_some()
    }

    fn mark_stale(&mut self, id: UnitId) {
        if let Some(graph) = self.graphs.get_mut(&id).filter(|g| g.state == GraphState::Built) {
            graph.state = GraphState::Stale;
        }
    }

    fn invalidate_graphs(&mut self) {
        for graph in self.graphs.values_mut() {
            if graph.state == GraphState::Built {
                graph.state = GraphState::Stale;
            }
        }
    }

    /// Recompute the edges entering `tile` for every built subscriber.
    fn refresh_subscribers(&mut self, tile: TileId) {
        for id in self.subscriptions.subscribers(tile) {
            let (Some(unit), Some(graph)) = (self.units.get(&id), self.graphs.get_mut(&id)) else {
                continue;
            };
            if graph.state == GraphState::Built {
                graph::refresh_edges_into(&self.map, &self.units, unit, &mut graph.edges, tile);
            }
        }
    }

    fn refresh_after_allegiance_change(&mut self, changed: UnitId) {
        if let Some(home) = self.position(changed) {
            for (id, graph) in self.graphs.iter_mut() {
                let Some(unit) = self.units.get(id) else {
                    continue;
                };
                if graph.state == GraphState::Built {
                    graph::refresh_edges_into(&self.map, &self.units, unit, &mut graph.edges, home);
                }
            }
        }

        let occupied: BTreeSet<TileId> = self
            .units
            .values()
            .filter(|u| u.id != changed)
            .filter_map(|u| u.position)
            .collect();
        let (Some(unit), Some(graph)) = (self.units.get(&changed), self.graphs.get_mut(&changed)) else {
            return;
        };
        if graph.state == GraphState::Built {
            for tile in occupied {
                graph::refresh_edges_into(&self.map, &self.units, unit, &mut graph.edges, tile);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pathfinding and movement
    // -----------------------------------------------------------------------

    /// Cheapest route for `unit` from its position toward `target` within
    /// `budget`. Rebuilds the unit's graph first if it is missing or stale.
    /// Empty when the unit has no position. The route may cross full tiles
    /// but never ends on one.
    pub fn find_path(&mut self, id: UnitId, target: TileId, budget: f64) -> Path {
        let Some(source) = self.position(id) else {
            return Path::default();
        };
        if self.graph_state(id) != GraphState::Built {
            self.build_graph(id);
        }
        match self.graphs.get(&id) {
            Some(graph) => pathfinding::find_path_stopping(
                &self.map,
                &graph.edges,
                source,
                target,
                budget,
                |t| graph::can_stop(&self.map, id, t),
            ),
            None => Path::default(),
        }
    }

    /// Walk `unit` toward `target` as far as its allowance reaches. Returns
    /// `true` only if the unit moved and ended on `target`.
    pub fn move_to(&mut self, id: UnitId, target: TileId) -> bool {
        let Some(unit) = self.units.get(&id) else {
            return false;
        };
        if !unit.is_mobile() || unit.position.is_none() {
            return false;
        }
        let budget = unit.allowance.current;
        let path = self.find_path(id, target, budget);
        self.follow_path(id, &path) && self.position(id) == Some(target)
    }

    /// Walk a path computed earlier by `find_path`. The path must start on
    /// the unit's tile and fit its current allowance.
    ///
    /// The map may have changed since the path was computed. Each step is
    /// checked again as it is taken; the first rejected step ends the walk
    /// and only the steps taken are paid for. Returns `true` if the unit
    /// ended on the last tile of the path.
    pub fn follow_path(&mut self, id: UnitId, path: &Path) -> bool {
        let Some(unit) = self.units.get(&id) else {
            return false;
        };
        let starts_here = path.steps.first().map(|s| s.tile) == unit.position;
        if !unit.is_mobile()
            || unit.position.is_none()
            || !starts_here
            || path.total_cost() > unit.allowance.current
        {
            return false;
        }
        let steps = path.steps.get(1..).unwrap_or_default();

        let mut travelled = 0.0;
        for (i, step) in steps.iter().enumerate() {
            let here = self.position(id);
            if let Some(dir) = here.and_then(|h| self.map.direction_to(h, step.tile)) {
                self.set_facing(id, dir);
            }
            let pass_through = i + 1 < steps.len();
            if !self.relocate(id, Some(step.tile), pass_through) {
                break;
            }
            let spent = step.cost - travelled;
            travelled = step.cost;
            if let Some(unit) = self.units.get_mut(&id) {
                unit.allowance.current = (unit.allowance.current - spent).max(0.0);
            }
        }

        match steps.last() {
            Some(last) => self.position(id) == Some(last.tile),
            None => false,
        }
    }

    /// Step once toward the tile the unit is facing.
    pub fn move_forward(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.units.get(&id) else {
            return false;
        };
        let Some(ahead) = unit
            .position
            .and_then(|p| self.map.neighbor(p, unit.facing))
        else {
            return false;
        };
        self.move_to(id, ahead)
    }
}
