// Tessellation rules: adjacency and distance for the three supported tilings.
//
// A `Tessellation` is a small closed enum evaluated by `match`, not a trait
// object: the set of tilings is fixed and every map uses exactly one. It
// answers three questions about pure coordinates:
// - how many directions a tile has (`direction_count`),
// - which coordinate lies in a given direction (`offset`),
// - how far apart two coordinates are (`distance`).
//
// Tile-level lookups (`neighbor`, `direction_to`) combine these with the
// map's grid and live in `map.rs`.
//
// Direction numbering, with y growing "up":
//
//   Square          Octagon            Hex (offset columns)
//      0            7  0  1               ___0___
//    3 . 1          6  .  2            5 /       \ 1
//      2            5  4  3            4 \_______/ 2
//                                            3
//
// Hex maps use offset coordinates with even columns sitting half a tile lower
// than odd ones, so the y-delta of the four diagonal directions depends on
// column parity.
//
// See also: `map.rs` for neighbour lookup over the tile grid, `graph.rs` which
// multiplies `distance` by terrain cost to produce edge weights.

use crate::types::Coordinate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const SQUARE_OFFSETS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

const OCTAGON_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// Hex offsets for even and odd source columns, indexed by direction.
const HEX_OFFSETS_EVEN: [(i32, i32); 6] = [(0, 1), (1, 0), (1, -1), (0, -1), (-1, -1), (-1, 0)];
const HEX_OFFSETS_ODD: [(i32, i32); 6] = [(0, 1), (1, 1), (1, 0), (0, -1), (-1, 0), (-1, 1)];

/// The tiling a map is laid out in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tessellation {
    /// Four edge-adjacent neighbours, Manhattan metric.
    #[default]
    Square,
    /// Six neighbours on offset columns.
    Hex,
    /// Squares that also connect through their corners: eight neighbours,
    /// diagonal steps cost √2.
    Octagon,
}

impl Tessellation {
    /// Number of directions a tile has: 4, 6 or 8.
    pub const fn direction_count(self) -> u8 {
        match self {
            Tessellation::Square => 4,
            Tessellation::Hex => 6,
            Tessellation::Octagon => 8,
        }
    }

    /// The coordinate adjacent to `from` in `direction`. Returns `None` if the
    /// direction is not valid for this tessellation. Bounds are not checked.
    pub fn offset(self, from: Coordinate, direction: u8) -> Option<Coordinate> {
        let d = direction as usize;
        let (dx, dy) = match self {
            Tessellation::Square => *SQUARE_OFFSETS.get(d)?,
            Tessellation::Octagon => *OCTAGON_OFFSETS.get(d)?,
            Tessellation::Hex => {
                if is_even_column(from) {
                    *HEX_OFFSETS_EVEN.get(d)?
                } else {
                    *HEX_OFFSETS_ODD.get(d)?
                }
            }
        };
        Some(from.translate(dx, dy))
    }

    /// The direction opposite to `direction`. Every tiling here has an even
    /// direction count with opposites half a turn apart.
    pub const fn opposite(self, direction: u8) -> u8 {
        let count = self.direction_count();
        (direction + count / 2) % count
    }

    /// Distance between two coordinates under this tessellation's metric.
    pub fn distance(self, a: Coordinate, b: Coordinate) -> f64 {
        match self {
            Tessellation::Square => square_distance(a, b),
            Tessellation::Octagon => octagon_distance(a, b),
            Tessellation::Hex => hex_distance(a, b),
        }
    }
}

fn is_even_column(c: Coordinate) -> bool {
    c.x.rem_euclid(2) == 0
}

fn square_distance(a: Coordinate, b: Coordinate) -> f64 {
    f64::from((a.x - b.x).unsigned_abs() + (a.y - b.y).unsigned_abs())
}

fn octagon_distance(a: Coordinate, b: Coordinate) -> f64 {
    let dx = (a.x - b.x).unsigned_abs();
    let dy = (a.y - b.y).unsigned_abs();
    let (big, small) = if dx >= dy { (dx, dy) } else { (dy, dx) };
    f64::from(big - small) + std::f64::consts::SQRT_2 * f64::from(small)
}

/// Hex distance on offset columns.
///
/// Every column step can also absorb half a row step; how much depends on the
/// parity of the source column and on whether the target lies above or below.
fn hex_distance(a: Coordinate, b: Coordinate) -> f64 {
    let dx = (b.x - a.x).unsigned_abs();
    let dy = (b.y - a.y).unsigned_abs();

    if dx == 0 {
        return f64::from(dy);
    }

    let even = is_even_column(a);
    let absorbed = match b.y.cmp(&a.y) {
        Ordering::Less if even => dx.div_ceil(2),
        Ordering::Less => dx / 2,
        Ordering::Greater if even => dx / 2,
        Ordering::Greater => dx.div_ceil(2),
        Ordering::Equal => 0,
    };

    if absorbed >= dy {
        f64::from(dx)
    } else {
        f64::from(dx + dy - absorbed)
    }
}
