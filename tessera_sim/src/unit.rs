// Units: the entities that stand on tiles and move across the map.
//
// A `Unit` is plain data owned by `Game` (in a `BTreeMap<UnitId, Unit>`).
// Everything that changes a unit's position, facing, allegiance or
// allowance goes through `Game`, since those changes ripple into tile
// occupancy, other units' edge tables and the event log. This file only holds
// the unit-local rules:
//
// - the terrain cost table (`can_access`, `terrain_cost`): a unit can enter
//   exactly the terrains it has a cost for; unknown terrain costs +∞,
// - the movement allowance and health meters,
// - the mobility tag and the passability rule (`PassRule`) consulted by
//   `graph::can_pass`.
//
// Units are created from a `UnitSpec`, which is the programmatic twin of the
// data-driven `config::UnitProfile`.
//
// See also: `graph.rs` for the edge-weight function built on top of these
// rules, `game.rs` for spawning and movement, `config.rs` for profiles.

use crate::tile::Tile;
use crate::types::{PlayerId, TerrainId, TileId, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a unit may move under its own power.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mobility {
    #[default]
    Mobile,
    /// Can be put on a tile but never walks, turns or gets a path.
    Immobile,
}

/// Extra passability rule applied on top of terrain access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassRule {
    /// Any accessible tile is passable.
    #[default]
    Open,
    /// Tiles holding a unit of a different allegiance are impassable.
    AvoidForeign,
}

/// A current/maximum pair. Used for movement allowance and health.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Meter<T> {
    pub current: T,
    pub max: T,
}

impl<T: Copy> Meter<T> {
    pub fn full(max: T) -> Self {
        Self { current: max, max }
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }
}

/// A unit on (or off) the map.
#[derive(Clone, Debug)]
pub struct Unit {
    pub id: UnitId,
    /// Cost multiplier per accessible terrain. Absent terrain is inaccessible.
    pub terrain_costs: BTreeMap<TerrainId, f64>,
    /// The tile the unit stands on, if any.
    pub position: Option<TileId>,
    /// Direction the unit faces, always below the map's direction count.
    pub facing: u8,
    /// Movement points. `max` is `f64::INFINITY` for unlimited movement.
    pub allowance: Meter<f64>,
    pub health: Meter<u32>,
    pub mobility: Mobility,
    pub pass_rule: PassRule,
    pub allegiance: Option<PlayerId>,
}

impl Unit {
    pub(crate) fn from_spec(id: UnitId, spec: UnitSpec) -> Self {
        Self {
            id,
            terrain_costs: spec.terrain_costs,
            position: None,
            facing: 0,
            allowance: Meter::full(non_negative(spec.max_allowance)),
            health: Meter::full(spec.max_health),
            mobility: spec.mobility,
            pass_rule: spec.pass_rule,
            allegiance: spec.allegiance,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.mobility == Mobility::Mobile
    }

    /// Whether the unit may enter `tile`. Having no tile at all is always
    /// accessible (the unit is simply off the map).
    pub fn can_access(&self, tile: Option<&Tile>) -> bool {
        tile.is_none_or(|t| self.terrain_costs.contains_key(&t.terrain()))
    }

    /// Cost multiplier for entering `terrain`; `f64::INFINITY` if unknown.
    pub fn terrain_cost(&self, terrain: TerrainId) -> f64 {
        self.terrain_costs
            .get(&terrain)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Whether this unit and `other` count as foreign to each other.
    pub fn is_foreign_to(&self, other: &Unit) -> bool {
        self.id != other.id && self.allegiance != other.allegiance
    }
}

/// Parameters for `Game::spawn_unit`.
///
/// ```ignore
/// let spec = UnitSpec::new()
///     .with_cost(plains, 1.0)
///     .with_cost(forest, 2.0)
///     .with_allowance(6.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSpec {
    pub terrain_costs: BTreeMap<TerrainId, f64>,
    pub max_allowance: f64,
    pub max_health: u32,
    pub mobility: Mobility,
    pub pass_rule: PassRule,
    pub allegiance: Option<PlayerId>,
}

impl Default for UnitSpec {
    fn default() -> Self {
        Self {
            terrain_costs: BTreeMap::new(),
            max_allowance: f64::INFINITY,
            max_health: 1,
            mobility: Mobility::Mobile,
            pass_rule: PassRule::Open,
            allegiance: None,
        }
    }
}

impl UnitSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cost(mut self, terrain: TerrainId, cost: f64) -> Self {
        self.terrain_costs.insert(terrain, cost);
        self
    }

    /// Movement points per turn. Negative and NaN values become zero.
    pub fn with_allowance(mut self, max: f64) -> Self {
        self.max_allowance = non_negative(max);
        self
    }

    pub fn with_health(mut self, max: u32) -> Self {
        self.max_health = max;
        self
    }

    pub fn with_mobility(mut self, mobility: Mobility) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_pass_rule(mut self, pass_rule: PassRule) -> Self {
        self.pass_rule = pass_rule;
        self
    }

    pub fn with_allegiance(mut self, player: PlayerId) -> Self {
        self.allegiance = Some(player);
        self
    }
}

/// `value`, or zero when it is negative or NaN.
fn non_negative(value: f64) -> f64 {
    if value >= 0.0 { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::UNBOUNDED_CAPACITY;

    const GRASS: TerrainId = TerrainId(0);
    const WATER: TerrainId = TerrainId(1);

    fn walker() -> Unit {
        Unit::from_spec(UnitId(0), UnitSpec::new().with_cost(GRASS, 1.5))
    }

    #[test]
    fn spawned_unit_is_off_map_with_full_meters() {
        let u = Unit::from_spec(
            UnitId(3),
            UnitSpec::new().with_allowance(4.0).with_health(10),
        );
        assert_eq!(u.position, None);
        assert_eq!(u.facing, 0);
        assert_eq!(u.allowance.current, 4.0);
        assert_eq!(u.health, Meter { current: 10, max: 10 });
    }

    #[test]
    fn default_allowance_is_unlimited() {
        assert_eq!(walker().allowance.max, f64::INFINITY);
    }

    #[test]
    fn allowance_is_never_negative() {
        assert_eq!(UnitSpec::new().with_allowance(-2.0).max_allowance, 0.0);
        assert_eq!(UnitSpec::new().with_allowance(f64::NAN).max_allowance, 0.0);

        let spec = UnitSpec {
            max_allowance: -1.0,
            ..UnitSpec::default()
        };
        let u = Unit::from_spec(UnitId(0), spec);
        assert_eq!(u.allowance, Meter { current: 0.0, max: 0.0 });
    }

    #[test]
    fn terrain_cost_known_and_unknown() {
        let u = walker();
        assert_eq!(u.terrain_cost(GRASS), 1.5);
        assert_eq!(u.terrain_cost(WATER), f64::INFINITY);
    }

    #[test]
    fn can_access_follows_cost_table() {
        let u = walker();
        let grass = Tile::new(TileId(0), GRASS, UNBOUNDED_CAPACITY);
        let water = Tile::new(TileId(1), WATER, UNBOUNDED_CAPACITY);
        assert!(u.can_access(Some(&grass)));
        assert!(!u.can_access(Some(&water)));
        assert!(u.can_access(None));
    }

    #[test]
    fn foreign_requires_different_allegiance() {
        let a = Unit::from_spec(UnitId(0), UnitSpec::new().with_allegiance(PlayerId(1)));
        let b = Unit::from_spec(UnitId(1), UnitSpec::new().with_allegiance(PlayerId(1)));
        let c = Unit::from_spec(UnitId(2), UnitSpec::new().with_allegiance(PlayerId(2)));
        assert!(!a.is_foreign_to(&b));
        assert!(a.is_foreign_to(&c));
        assert!(!a.is_foreign_to(&a));
    }

    #[test]
    fn meter_refill() {
        let mut m = Meter::full(5.0);
        m.current = 1.0;
        m.refill();
        assert_eq!(m.current, 5.0);
    }
}
