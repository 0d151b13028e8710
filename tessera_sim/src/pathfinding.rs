// Budgeted Dijkstra search over a unit's edge table.
//
// `find_path` explores outward from `source` using a `BinaryHeap` (min-heap
// via reversed ordering, same pattern as the event log's sequence ordering).
// Scores, predecessors and the closed set are `Vec`s indexed by `TileId`.
//
// The search is bounded by a movement budget: a relaxation whose cumulative
// cost would exceed the budget is discarded, and +∞ edges are never relaxed,
// so every settled tile is reachable within the budget. If `target` is
// settled the result is the shortest path to it. Otherwise the result is the
// best effort: the settled tile closest to the target by tessellation
// distance, preferring the more expensive (i.e. further along) tile on a
// distance tie, then the earlier-settled one. If that best tile is the source
// itself, the path is empty.
//
// Edges into full tiles are finite, so a path may cross them. A walk may not
// end on one, though: `find_path_stopping` takes a `can_stop` predicate, and
// only tiles it accepts count as reaching the target or as a best-effort
// endpoint. `find_path` is the variant where every tile is a valid stop.
//
// Heap ties on cost are broken by insertion sequence, so equal-cost
// alternatives resolve the same way on every run.
//
// See also: `graph.rs` for the `EdgeTable` being searched, `game.rs` which
// rebuilds stale graphs before calling in and walks the resulting path.
//
// **Critical constraint: determinism.** The search is a pure function of the
// map, the edge table, the endpoints and the budget. Costs are ordered with
// `total_cmp`.

use crate::graph::EdgeTable;
use crate::map::GameMap;
use crate::types::TileId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One tile on a path and the cumulative cost to reach it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStep {
    pub tile: TileId,
    pub cost: f64,
}

/// The result of a budgeted search. Starts at the source (cost 0) unless
/// empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub steps: Vec<PathStep>,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.steps.iter().map(|s| s.tile)
    }

    pub fn last(&self) -> Option<TileId> {
        self.steps.last().map(|s| s.tile)
    }

    /// Cumulative cost of the whole path; zero when empty.
    pub fn total_cost(&self) -> f64 {
        self.steps.last().map_or(0.0, |s| s.cost)
    }

    /// Whether the path ends at `target`.
    pub fn reaches(&self, target: TileId) -> bool {
        self.last() == Some(target)
    }
}

/// Entry in the open set (min-heap via reversed ordering).
struct OpenEntry {
    tile: TileId,
    cost: f64,
    sequence: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest (cost, sequence) is "greatest".
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Find the cheapest path from `source` toward `target` costing at most
/// `budget`. See the module header for the best-effort rule.
pub fn find_path(
    map: &GameMap,
    edges: &EdgeTable,
    source: TileId,
    target: TileId,
    budget: f64,
) -> Path {
    find_path_stopping(map, edges, source, target, budget, |_| true)
}

/// `find_path`, but the path may only end on tiles accepted by `can_stop`.
/// The source is always an acceptable place to stay.
pub fn find_path_stopping(
    map: &GameMap,
    edges: &EdgeTable,
    source: TileId,
    target: TileId,
    budget: f64,
    can_stop: impl Fn(TileId) -> bool,
) -> Path {
    let n = map.tile_count();
    if source.index() >= n || !map.tile(source).is_placed() || budget.is_nan() {
        return Path::default();
    }

    let mut g_score = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<TileId>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut settled: Vec<TileId> = Vec::new();
    let mut open = BinaryHeap::new();
    let mut sequence = 0u64;

    g_score[source.index()] = 0.0;
    open.push(OpenEntry {
        tile: source,
        cost: 0.0,
        sequence,
    });

    let directions = map.tessellation().direction_count();
    let mut reached = false;

    while let Some(OpenEntry { tile, cost, .. }) = open.pop() {
        let ti = tile.index();
        if closed[ti] {
            continue;
        }
        closed[ti] = true;
        settled.push(tile);

        if tile == target && (tile == source || can_stop(tile)) {
            reached = true;
            break;
        }

        for dir in 0..directions {
            let Some(next) = map.neighbor(tile, dir) else {
                continue;
            };
            let weight = edges.weight(tile, dir);
            if !weight.is_finite() {
                continue;
            }
            let tentative = cost + weight;
            if tentative > budget {
                continue;
            }
            let ni = next.index();
            if !closed[ni] && tentative < g_score[ni] {
                g_score[ni] = tentative;
                came_from[ni] = Some(tile);
                sequence += 1;
                open.push(OpenEntry {
                    tile: next,
                    cost: tentative,
                    sequence,
                });
            }
        }
    }

    let end = if reached {
        target
    } else {
        let stops: Vec<TileId> = settled
            .into_iter()
            .filter(|&t| t == source || can_stop(t))
            .collect();
        match best_effort(map, &stops, &g_score, target) {
            Some(t) if t != source => t,
            _ => return Path::default(),
        }
    };

    let mut steps = Vec::new();
    let mut current = Some(end);
    while let Some(tile) = current {
        steps.push(PathStep {
            tile,
            cost: g_score[tile.index()],
        });
        current = came_from[tile.index()];
    }
    steps.reverse();
    Path { steps }
}

/// Settled tile closest to `target`; ties prefer larger cost, then earlier
/// settle order. `None` when the target is not on the map.
fn best_effort(map: &GameMap, settled: &[TileId], g_score: &[f64], target: TileId) -> Option<TileId> {
    let mut best: Option<(TileId, f64, f64)> = None;
    for &tile in settled {
        let distance = map.distance(tile, target)?;
        let cost = g_score[tile.index()];
        let better = match best {
            None => true,
            Some((_, best_distance, best_cost)) => match distance.total_cmp(&best_distance) {
                Ordering::Less => true,
                Ordering::Equal => cost > best_cost,
                Ordering::Greater => false,
            },
        };
        if better {
            best = Some((tile, distance, cost));
        }
    }
    best.map(|(tile, _, _)| tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_edges;
    use crate::tessellation::Tessellation;
    use crate::types::{Coordinate, TerrainId, UnitId};
    use crate::unit::{Unit, UnitSpec};
    use std::collections::BTreeMap;

    const GRASS: TerrainId = TerrainId(0);
    const WALL: TerrainId = TerrainId(1);
    const MUD: TerrainId = TerrainId(2);

    fn setup(map: &GameMap) -> EdgeTable {
        let u = Unit::from_spec(
            UnitId(0),
            UnitSpec::new().with_cost(GRASS, 1.0).with_cost(MUD, 4.0),
        );
        build_edges(map, &BTreeMap::new(), &u)
    }

    fn set(map: &mut GameMap, x: i32, y: i32, terrain: TerrainId) {
        let t = map.create_tile(terrain);
        map.place(Coordinate::new(x, y), t);
    }

    #[test]
    fn unlimited_budget_gives_shortest_path() {
        let map = GameMap::filled(5, 5, Tessellation::Square, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(4, 4).unwrap();
        let path = find_path(&map, &edges, a, b, f64::INFINITY);
        assert_eq!(path.len(), 9);
        assert_eq!(path.total_cost(), 8.0);
        assert!(path.reaches(b));
        assert_eq!(path.steps[0], PathStep { tile: a, cost: 0.0 });
        // Consecutive tiles are adjacent and costs are non-decreasing.
        for pair in path.steps.windows(2) {
            assert!(map.direction_to(pair[0].tile, pair[1].tile).is_some());
            assert!(pair[1].cost >= pair[0].cost);
        }
    }

    #[test]
    fn budget_is_never_exceeded() {
        let map = GameMap::filled(5, 5, Tessellation::Square, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(4, 4).unwrap();
        for budget in [0.5, 1.0, 2.5, 3.0, 7.9] {
            let path = find_path(&map, &edges, a, b, budget);
            assert!(path.total_cost() <= budget);
            assert!(!path.reaches(b));
        }
        let path = find_path(&map, &edges, a, b, 3.0);
        assert_eq!(path.total_cost(), 3.0);
        assert_eq!(map.distance(path.last().unwrap(), b), Some(5.0));
    }

    #[test]
    fn zero_budget_from_source_is_empty() {
        let map = GameMap::filled(3, 3, Tessellation::Square, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(2, 2).unwrap();
        assert!(find_path(&map, &edges, a, b, 0.0).is_empty());
    }

    #[test]
    fn source_equals_target_is_single_step() {
        let map = GameMap::filled(3, 3, Tessellation::Hex, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(1, 1).unwrap();
        let path = find_path(&map, &edges, a, a, 0.0);
        assert_eq!(path.steps, vec![PathStep { tile: a, cost: 0.0 }]);
    }

    #[test]
    fn walls_force_a_detour() {
        // Column x=1 is a wall except at the top row.
        let mut map = GameMap::filled(3, 3, Tessellation::Square, GRASS);
        set(&mut map, 1, 0, WALL);
        set(&mut map, 1, 1, WALL);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(2, 0).unwrap();
        let path = find_path(&map, &edges, a, b, f64::INFINITY);
        assert!(path.reaches(b));
        assert_eq!(path.total_cost(), 6.0);
    }

    #[test]
    fn cheaper_long_way_beats_expensive_short_way() {
        let mut map = GameMap::filled(3, 2, Tessellation::Square, GRASS);
        set(&mut map, 1, 0, MUD);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(2, 0).unwrap();
        let path = find_path(&map, &edges, a, b, f64::INFINITY);
        // Through mud: 4 + 1 = 5. Around via the top row: 4 steps of 1.
        assert_eq!(path.total_cost(), 4.0);
    }

    #[test]
    fn unreachable_target_returns_closest_settled_tile() {
        let mut map = GameMap::filled(4, 1, Tessellation::Square, GRASS);
        set(&mut map, 2, 0, WALL);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(3, 0).unwrap();
        let path = find_path(&map, &edges, a, b, f64::INFINITY);
        assert_eq!(path.last(), map.tile_at(1, 0));
        assert_eq!(path.total_cost(), 1.0);
    }

    #[test]
    fn walled_in_source_gives_empty_path() {
        let mut map = GameMap::filled(3, 1, Tessellation::Square, GRASS);
        set(&mut map, 1, 0, WALL);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(2, 0).unwrap();
        assert!(find_path(&map, &edges, a, b, f64::INFINITY).is_empty());
    }

    #[test]
    fn detached_source_gives_empty_path() {
        let mut map = GameMap::filled(3, 1, Tessellation::Square, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(2, 0).unwrap();
        map.detach(a);
        assert!(find_path(&map, &edges, a, b, f64::INFINITY).is_empty());
    }

    #[test]
    fn octagon_prefers_diagonals() {
        let map = GameMap::filled(4, 4, Tessellation::Octagon, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(3, 3).unwrap();
        let path = find_path(&map, &edges, a, b, f64::INFINITY);
        assert_eq!(path.len(), 4);
        assert!((path.total_cost() - 3.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn path_crosses_but_never_ends_on_a_blocked_stop() {
        let map = GameMap::filled(4, 1, Tessellation::Square, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let gate = map.tile_at(1, 0).unwrap();
        let b = map.tile_at(3, 0).unwrap();

        let path = find_path_stopping(&map, &edges, a, b, f64::INFINITY, |t| t != gate);
        assert!(path.reaches(b));
        assert!(path.tiles().any(|t| t == gate));

        // Budget runs out right on the gate: stop short of it.
        let path = find_path_stopping(&map, &edges, a, b, 1.0, |t| t != gate);
        assert!(path.is_empty());

        // The gate itself as target falls back to the nearest other stop.
        let path = find_path_stopping(&map, &edges, a, gate, f64::INFINITY, |t| t != gate);
        assert!(!path.reaches(gate));
        assert_eq!(path.last(), map.tile_at(2, 0));
    }

    #[test]
    fn nan_budget_gives_empty_path() {
        let map = GameMap::filled(3, 1, Tessellation::Square, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(2, 0).unwrap();
        assert!(find_path(&map, &edges, a, b, f64::NAN).is_empty());
    }

    #[test]
    fn search_is_deterministic() {
        let map = GameMap::filled(6, 6, Tessellation::Hex, GRASS);
        let edges = setup(&map);
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(5, 5).unwrap();
        let first = find_path(&map, &edges, a, b, f64::INFINITY);
        for _ in 0..10 {
            assert_eq!(find_path(&map, &edges, a, b, f64::INFINITY), first);
        }
    }
}
