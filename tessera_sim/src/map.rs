// The game map: a tile arena plus a fixed-size 2D grid.
//
// Tiles are allocated into `tiles` (a `Vec<Tile>` indexed by `TileId`) and
// never freed; a tile is either placed at exactly one grid coordinate or
// detached. The grid is a flat `Vec<Option<TileId>>` indexed by
// `x + y * width`, giving O(1) lookups. Out-of-bounds lookups return `None`;
// out-of-bounds placements are no-ops.
//
// The map enforces one invariant after every call:
//
//   grid[c] == Some(t)  <=>  tiles[t].coordinate == Some(c)
//
// `place()` keeps it by detaching in a fixed order (the tile currently at the
// target coordinate first, then the incoming tile from its old coordinate)
// before attaching. A violation is a logic error, caught by `debug_assert!`.
//
// Neighbour and distance queries resolve tile ids through the grid and the
// map's `Tessellation`; a detached tile has no neighbours.
//
// See also: `tessellation.rs` for the coordinate rules, `tile.rs` for the
// tile itself, `game.rs` which owns the map and turns grid changes into
// events and graph invalidation.
//
// **Critical constraint: determinism.** `placed_tiles()` walks the grid in
// index order; anything that iterates the map (graph builds, tests) sees the
// same order every run.

use crate::tessellation::Tessellation;
use crate::tile::{Tile, UNBOUNDED_CAPACITY};
use crate::types::{Coordinate, TerrainId, TileId};
use smallvec::SmallVec;

/// Neighbours of one tile as `(direction, tile)` pairs. Never more than eight.
pub type Neighbors = SmallVec<[(u8, TileId); 8]>;

/// A fixed-size grid of tiles under one tessellation.
#[derive(Clone, Debug)]
pub struct GameMap {
    width: u32,
    height: u32,
    tessellation: Tessellation,
    /// Tile arena. Index = `TileId.0`.
    tiles: Vec<Tile>,
    /// Flat grid storage: index = x + y * width.
    grid: Vec<Option<TileId>>,
}

impl GameMap {
    /// Create a map with an empty grid.
    pub fn new(width: u32, height: u32, tessellation: Tessellation) -> Self {
        let total = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tessellation,
            tiles: Vec::with_capacity(total),
            grid: vec![None; total],
        }
    }

    /// Create a map with a fresh tile of `terrain` at every coordinate.
    pub fn filled(width: u32, height: u32, tessellation: Tessellation, terrain: TerrainId) -> Self {
        let mut map = Self::new(width, height, tessellation);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let tile = map.create_tile(terrain);
                map.place(Coordinate::new(x, y), tile);
            }
        }
        map
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tessellation(&self) -> Tessellation {
        self.tessellation
    }

    /// Allocate a new, detached tile with unbounded capacity.
    pub fn create_tile(&mut self, terrain: TerrainId) -> TileId {
        let id = TileId(self.tiles.len() as u32);
        self.tiles.push(Tile::new(id, terrain, UNBOUNDED_CAPACITY));
        id
    }

    /// Number of tiles in the arena, placed or not.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Check whether a coordinate is within the grid.
    pub fn in_bounds(&self, coord: Coordinate) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    /// Convert a coordinate to a flat grid index. Returns `None` if out of bounds.
    fn index(&self, coord: Coordinate) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.x as usize + coord.y as usize * self.width as usize)
        } else {
            None
        }
    }

    /// The tile placed at `(x, y)`, if any.
    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileId> {
        self.tile_at_coord(Coordinate::new(x, y))
    }

    pub fn tile_at_coord(&self, coord: Coordinate) -> Option<TileId> {
        self.index(coord).and_then(|i| self.grid[i])
    }

    /// Look up a tile by id. Returns `None` for ids outside the arena.
    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    /// Look up a tile by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this map.
    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id.index())
    }

    /// Bind `tile` to `coord`.
    ///
    /// Whatever tile previously sat at `coord` is detached, and `tile` is
    /// detached from its previous coordinate, in that order, before the new
    /// binding is written. Returns `true` if the grid changed; `false` for
    /// out-of-bounds coordinates, unknown tiles, or when `coord` already holds
    /// exactly this tile.
    pub fn place(&mut self, coord: Coordinate, tile: TileId) -> bool {
        let Some(slot) = self.index(coord) else {
            return false;
        };
        if tile.index() >= self.tiles.len() || self.grid[slot] == Some(tile) {
            return false;
        }

        if let Some(previous) = self.grid[slot].take() {
            self.tiles[previous.index()].set_coordinate(None);
        }
        self.detach(tile);

        self.grid[slot] = Some(tile);
        self.tiles[tile.index()].set_coordinate(Some(coord));

        debug_assert!(self.is_consistent_at(coord));
        true
    }

    /// Remove `tile` from the grid. Returns `true` if it was placed.
    pub fn detach(&mut self, tile: TileId) -> bool {
        let Some(coord) = self.get(tile).and_then(Tile::coordinate) else {
            return false;
        };
        if let Some(slot) = self.index(coord) {
            debug_assert_eq!(self.grid[slot], Some(tile));
            self.grid[slot] = None;
        }
        self.tiles[tile.index()].set_coordinate(None);
        true
    }

    fn is_consistent_at(&self, coord: Coordinate) -> bool {
        match self.tile_at_coord(coord) {
            Some(t) => self.tiles[t.index()].coordinate() == Some(coord),
            None => true,
        }
    }

    /// All placed tiles, in grid order.
    pub fn placed_tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.grid.iter().filter_map(|slot| *slot)
    }

    /// The tile adjacent to `tile` in `direction`, or `None` if `tile` is
    /// detached, the direction is invalid, or nothing is placed there.
    pub fn neighbor(&self, tile: TileId, direction: u8) -> Option<TileId> {
        let coord = self.get(tile)?.coordinate()?;
        let target = self.tessellation.offset(coord, direction)?;
        self.tile_at_coord(target)
    }

    /// Every existing neighbour of `tile` with the direction leading to it.
    pub fn neighbors(&self, tile: TileId) -> Neighbors {
        (0..self.tessellation.direction_count())
            .filter_map(|dir| self.neighbor(tile, dir).map(|n| (dir, n)))
            .collect()
    }

    /// Reverse neighbour lookup: the direction from `from` that leads to `to`,
    /// found by scanning every direction. `None` if they are not adjacent.
    pub fn direction_to(&self, from: TileId, to: TileId) -> Option<u8> {
        (0..self.tessellation.direction_count()).find(|&dir| self.neighbor(from, dir) == Some(to))
    }

    /// Distance between two placed tiles under the map's metric.
    pub fn distance(&self, a: TileId, b: TileId) -> Option<f64> {
        let ca = self.get(a)?.coordinate()?;
        let cb = self.get(b)?.coordinate()?;
        Some(self.tessellation.distance(ca, cb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAINS: TerrainId = TerrainId(0);

    #[test]
    fn filled_map_places_every_coordinate() {
        let map = GameMap::filled(9, 10, Tessellation::Square, PLAINS);
        assert_eq!(map.tile_count(), 90);
        for y in 0..10 {
            for x in 0..9 {
                let t = map.tile_at(x, y).unwrap();
                assert_eq!(map.tile(t).coordinate(), Some(Coordinate::new(x, y)));
            }
        }
    }

    #[test]
    fn out_of_bounds_lookup_is_none() {
        let map = GameMap::filled(3, 3, Tessellation::Square, PLAINS);
        assert_eq!(map.tile_at(-1, 0), None);
        assert_eq!(map.tile_at(3, 0), None);
        assert_eq!(map.tile_at(0, 3), None);
        assert!(map.get(TileId(99)).is_none());
    }

    #[test]
    fn place_replaces_and_detaches_previous_tile() {
        let mut map = GameMap::filled(9, 10, Tessellation::Square, PLAINS);
        let old = map.tile_at(6, 4).unwrap();
        let new = map.create_tile(TerrainId(1));
        assert!(!map.tile(new).is_placed());

        assert!(map.place(Coordinate::new(6, 4), new));
        assert_eq!(map.tile_at(6, 4), Some(new));
        assert_eq!(map.tile(new).coordinate(), Some(Coordinate::new(6, 4)));
        assert_eq!(map.tile(old).coordinate(), None);

        // Put the old tile back.
        assert!(map.place(Coordinate::new(6, 4), old));
        assert_eq!(map.tile_at(6, 4), Some(old));
        assert_eq!(map.tile(new).coordinate(), None);
    }

    #[test]
    fn place_moves_tile_and_clears_old_slot() {
        let mut map = GameMap::filled(3, 3, Tessellation::Square, PLAINS);
        let moving = map.tile_at(0, 0).unwrap();
        let displaced = map.tile_at(2, 2).unwrap();

        assert!(map.place(Coordinate::new(2, 2), moving));
        assert_eq!(map.tile_at(0, 0), None);
        assert_eq!(map.tile_at(2, 2), Some(moving));
        assert!(!map.tile(displaced).is_placed());
    }

    #[test]
    fn place_same_tile_is_noop() {
        let mut map = GameMap::filled(3, 3, Tessellation::Square, PLAINS);
        let t = map.tile_at(1, 1).unwrap();
        assert!(!map.place(Coordinate::new(1, 1), t));
        assert_eq!(map.tile_at(1, 1), Some(t));
    }

    #[test]
    fn place_out_of_bounds_is_noop() {
        let mut map = GameMap::new(3, 3, Tessellation::Square);
        let t = map.create_tile(PLAINS);
        assert!(!map.place(Coordinate::new(3, 0), t));
        assert!(!map.tile(t).is_placed());
    }

    #[test]
    fn grid_and_tiles_agree_after_shuffling() {
        let mut map = GameMap::filled(4, 4, Tessellation::Hex, PLAINS);
        let spare = map.create_tile(PLAINS);
        let moves = [
            (Coordinate::new(0, 0), spare),
            (Coordinate::new(3, 3), TileId(0)),
            (Coordinate::new(0, 0), TileId(15)),
            (Coordinate::new(1, 2), spare),
        ];
        for (coord, tile) in moves {
            map.place(coord, tile);
            for id in 0..map.tile_count() as u32 {
                if let Some(c) = map.tile(TileId(id)).coordinate() {
                    assert_eq!(map.tile_at_coord(c), Some(TileId(id)));
                }
            }
            for t in map.placed_tiles() {
                assert!(map.tile(t).is_placed());
            }
        }
    }

    #[test]
    fn square_neighbors_at_corner() {
        let map = GameMap::filled(9, 10, Tessellation::Square, PLAINS);
        let corner = map.tile_at(0, 0).unwrap();
        assert_eq!(map.neighbor(corner, 0), map.tile_at(0, 1));
        assert_eq!(map.neighbor(corner, 1), map.tile_at(1, 0));
        assert_eq!(map.neighbor(corner, 2), None);
        assert_eq!(map.neighbor(corner, 3), None);
        assert_eq!(map.neighbors(corner).len(), 2);
    }

    #[test]
    fn direction_to_round_trips_for_every_tessellation() {
        for tess in [Tessellation::Square, Tessellation::Hex, Tessellation::Octagon] {
            let map = GameMap::filled(6, 6, tess, PLAINS);
            for tile in map.placed_tiles() {
                for (dir, n) in map.neighbors(tile) {
                    assert_eq!(map.direction_to(tile, n), Some(dir), "{tess:?}");
                }
            }
        }
    }

    #[test]
    fn direction_to_non_neighbor_is_none() {
        let map = GameMap::filled(5, 5, Tessellation::Square, PLAINS);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(2, 2).unwrap();
        assert_eq!(map.direction_to(a, b), None);
    }

    #[test]
    fn detached_tile_has_no_neighbors_or_distance() {
        let mut map = GameMap::filled(3, 3, Tessellation::Square, PLAINS);
        let t = map.tile_at(1, 1).unwrap();
        assert!(map.detach(t));
        assert!(map.neighbors(t).is_empty());
        assert_eq!(map.distance(t, TileId(0)), None);
        assert_eq!(map.tile_at(1, 1), None);
        assert!(!map.detach(t));
    }

    #[test]
    fn distance_uses_map_tessellation() {
        let map = GameMap::filled(9, 10, Tessellation::Square, PLAINS);
        let a = map.tile_at(2, 3).unwrap();
        let b = map.tile_at(6, 6).unwrap();
        assert_eq!(map.distance(a, b), Some(7.0));
    }
}
