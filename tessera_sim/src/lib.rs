// tessera_sim: turn-based game core on tessellated maps.
//
// This crate contains the whole rules engine: tessellation geometry, the tile
// grid, units with terrain affinities, per-unit movement graphs that are kept
// up to date incrementally as the map changes, a budgeted shortest-path
// search, and movement execution that spends a unit's allowance step by step.
// It has no rendering, I/O or threading and can be tested, benchmarked and
// driven headless.
//
// Module overview:
// - `game.rs`:         Top-level `Game` state; every mutation, graph maintenance, movement.
// - `map.rs`:          `GameMap`, the tile arena plus the 2D grid and neighbour lookups.
// - `tile.rs`:         `Tile`: coordinate, terrain, capacity, occupants.
// - `tessellation.rs`: Square / Hex / Octagon adjacency and distance.
// - `unit.rs`:         `Unit` data, terrain costs, `UnitSpec` for spawning.
// - `graph.rs`:        Edge tables, subscriptions, the edge-weight function.
// - `pathfinding.rs`:  Budgeted Dijkstra with best-effort fallback.
// - `command.rs`:      `GameAction` + `MoveArbiter`, the external mutation surface.
// - `event.rs`:        `EventLog` of sequenced `GameEvent`s.
// - `config.rs`:       `GameConfig` loaded from JSON, `TerrainTable`, `ConfigError`.
// - `types.rs`:        `Coordinate` and the compact id newtypes.
//
// The companion crate `tessera_scenarios` drives this library from ASCII map
// fixtures for end-to-end tests.
//
// **Critical constraint: determinism.** The game is a pure function of its
// call sequence: no `HashMap`, no system time, no randomness. Use `BTreeMap`
// for keyed collections.

pub mod command;
pub mod config;
pub mod event;
pub mod game;
pub mod graph;
pub mod map;
pub mod pathfinding;
pub mod tessellation;
pub mod tile;
pub mod types;
pub mod unit;
