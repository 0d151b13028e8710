// Data-driven game configuration.
//
// A `GameConfig` describes a starting game: the map (size, tessellation, a
// per-tile terrain layout), the terrain names in play, and named unit
// profiles. It is loaded from JSON with serde; every field has a default, so
// a config file only needs to state what differs from `GameConfig::default()`.
//
// Terrain names are interned into a `TerrainTable` in declaration order, so
// the same config always yields the same `TerrainId`s. The layout is a list
// of strings, one per row, starting at y = 0; each character is looked up in
// the legend to get a terrain name. An empty layout fills the whole map with
// `default_terrain`.
//
// Unit profiles (`UnitProfile`) are the data-driven form of `UnitSpec`:
// terrain costs keyed by name, an optional movement allowance (absent means
// unlimited), mobility, pass rule and health. Profiles are data, not code
// branches; adding a unit type never touches the crate.
//
// Loading is the only fallible surface of the crate. Problems are reported as
// `ConfigError` values; gameplay operations never return errors.
//
// See also: `game.rs` for `Game`, which stores the terrain table and profiles,
// `unit.rs` for `UnitSpec`, `map.rs` for `GameMap`.
//
// **Critical constraint: determinism.** Terrain ids and profile lookups only
// depend on the config contents (`Vec` order and `BTreeMap` order).

use crate::game::Game;
use crate::map::GameMap;
use crate::tessellation::Tessellation;
use crate::types::{Coordinate, PlayerId, TerrainId, UnitId};
use crate::unit::{Mobility, PassRule, UnitSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Everything that can go wrong while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map must be at least 1x1, got {width}x{height}")]
    EmptyMap { width: u32, height: u32 },
    #[error("layout has {rows} rows but the map is {height} high")]
    LayoutRows { rows: usize, height: u32 },
    #[error("layout row {row} is {found} wide but the map is {width} wide")]
    LayoutWidth { row: usize, found: usize, width: u32 },
    #[error("layout character {0:?} is not in the legend")]
    UnknownLegendKey(char),
    #[error("unknown terrain {0:?}")]
    UnknownTerrain(String),
    #[error("unknown unit profile {0:?}")]
    UnknownProfile(String),
    #[error("terrain cost for {terrain:?} must be a non-negative number, got {cost}")]
    NegativeCost { terrain: String, cost: f64 },
    #[error("max_allowance must be a non-negative number, got {0}")]
    InvalidAllowance(f64),
    #[error("too many terrains ({0})")]
    TooManyTerrains(usize),
}

// ---------------------------------------------------------------------------
// Terrain table
// ---------------------------------------------------------------------------

/// Bidirectional terrain name ↔ `TerrainId` mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerrainTable {
    names: Vec<String>,
}

impl TerrainTable {
    /// Build a table from names in order. Duplicates share one id.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, ConfigError> {
        let mut table = Self::default();
        for name in names {
            table.intern(name)?;
        }
        Ok(table)
    }

    /// The id for `name`, allocating one if it is new.
    pub fn intern(&mut self, name: &str) -> Result<TerrainId, ConfigError> {
        if let Some(id) = self.id(name) {
            return Ok(id);
        }
        let next = u16::try_from(self.names.len())
            .map_err(|_| ConfigError::TooManyTerrains(self.names.len() + 1))?;
        self.names.push(name.to_owned());
        Ok(TerrainId(next))
    }

    pub fn id(&self, name: &str) -> Option<TerrainId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| TerrainId(i as u16))
    }

    pub fn name(&self, id: TerrainId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn require(&self, name: &str) -> Result<TerrainId, ConfigError> {
        self.id(name)
            .ok_or_else(|| ConfigError::UnknownTerrain(name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level game configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub map: MapConfig,
    /// Terrain names in id order.
    pub terrains: Vec<String>,
    pub unit_profiles: BTreeMap<String, UnitProfile>,
}

/// Map dimensions and layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub tessellation: Tessellation,
    /// Terrain for every tile when `layout` is empty.
    pub default_terrain: String,
    /// Capacity of every tile; `None` means unbounded.
    pub default_capacity: Option<u32>,
    /// Single-character layout keys → terrain names.
    pub legend: BTreeMap<String, String>,
    /// One string per row, row 0 first. Empty for a uniform map.
    pub layout: Vec<String>,
}

/// Data-driven unit type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitProfile {
    /// Cost multiplier per terrain name. Terrains not listed are inaccessible.
    pub terrain_costs: BTreeMap<String, f64>,
    /// Movement points per turn; `None` for unlimited.
    pub max_allowance: Option<f64>,
    pub mobility: Mobility,
    pub pass_rule: PassRule,
    pub max_health: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            tessellation: Tessellation::Square,
            default_terrain: "grass".into(),
            default_capacity: None,
            legend: BTreeMap::new(),
            layout: Vec::new(),
        }
    }
}

impl Default for UnitProfile {
    fn default() -> Self {
        Self {
            terrain_costs: BTreeMap::new(),
            max_allowance: None,
            mobility: Mobility::Mobile,
            pass_rule: PassRule::Open,
            max_health: 1,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        fn costs(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
            pairs.iter().map(|&(n, c)| (n.to_owned(), c)).collect()
        }
        let mut unit_profiles = BTreeMap::new();
        unit_profiles.insert(
            "infantry".to_owned(),
            UnitProfile {
                terrain_costs: costs(&[("grass", 1.0), ("forest", 2.0), ("mountain", 3.0)]),
                max_allowance: Some(6.0),
                pass_rule: PassRule::AvoidForeign,
                max_health: 10,
                ..UnitProfile::default()
            },
        );
        unit_profiles.insert(
            "boat".to_owned(),
            UnitProfile {
                terrain_costs: costs(&[("water", 1.0)]),
                max_allowance: Some(8.0),
                max_health: 6,
                ..UnitProfile::default()
            },
        );
        unit_profiles.insert(
            "tower".to_owned(),
            UnitProfile {
                terrain_costs: costs(&[("grass", 0.0), ("mountain", 0.0)]),
                mobility: Mobility::Immobile,
                max_health: 20,
                ..UnitProfile::default()
            },
        );
        Self {
            map: MapConfig::default(),
            terrains: ["grass", "forest", "water", "mountain"]
                .map(String::from)
                .to_vec(),
            unit_profiles,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl GameConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check everything `build_map` and `Game::from_config` rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let terrains = self.terrain_table()?;
        self.build_map_with(&terrains)?;
        for profile in self.unit_profiles.values() {
            profile.to_spec(&terrains)?;
        }
        Ok(())
    }

    /// Intern the configured terrain names.
    pub fn terrain_table(&self) -> Result<TerrainTable, ConfigError> {
        TerrainTable::from_names(self.terrains.iter().map(String::as_str))
    }

    /// Build the configured map.
    pub fn build_map(&self) -> Result<GameMap, ConfigError> {
        self.build_map_with(&self.terrain_table()?)
    }

    fn build_map_with(&self, terrains: &TerrainTable) -> Result<GameMap, ConfigError> {
        let m = &self.map;
        if m.width == 0 || m.height == 0 {
            return Err(ConfigError::EmptyMap {
                width: m.width,
                height: m.height,
            });
        }

        let rows = self.terrain_rows(terrains)?;
        let mut map = GameMap::new(m.width, m.height, m.tessellation);
        for (y, row) in rows.iter().enumerate() {
            for (x, &terrain) in row.iter().enumerate() {
                let tile = map.create_tile(terrain);
                if let (Some(capacity), Some(t)) = (m.default_capacity, map.get_mut(tile)) {
                    t.set_capacity(capacity);
                }
                map.place(Coordinate::new(x as i32, y as i32), tile);
            }
        }
        Ok(map)
    }

    /// Resolve the layout into a `height × width` grid of terrain ids.
    fn terrain_rows(&self, terrains: &TerrainTable) -> Result<Vec<Vec<TerrainId>>, ConfigError> {
        let m = &self.map;
        if m.layout.is_empty() {
            let fill = terrains.require(&m.default_terrain)?;
            return Ok(vec![vec![fill; m.width as usize]; m.height as usize]);
        }

        if m.layout.len() != m.height as usize {
            return Err(ConfigError::LayoutRows {
                rows: m.layout.len(),
                height: m.height,
            });
        }

        let mut rows = Vec::with_capacity(m.layout.len());
        for (y, line) in m.layout.iter().enumerate() {
            let width = line.chars().count();
            if width != m.width as usize {
                return Err(ConfigError::LayoutWidth {
                    row: y,
                    found: width,
                    width: m.width,
                });
            }
            let row = line
                .chars()
                .map(|c| {
                    let name = m
                        .legend
                        .get(c.to_string().as_str())
                        .ok_or(ConfigError::UnknownLegendKey(c))?;
                    terrains.require(name)
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl UnitProfile {
    /// Resolve terrain names against `terrains`.
    pub fn to_spec(&self, terrains: &TerrainTable) -> Result<UnitSpec, ConfigError> {
        if let Some(allowance) = self.max_allowance.filter(|a| a.is_nan() || *a < 0.0) {
            return Err(ConfigError::InvalidAllowance(allowance));
        }
        let mut spec = UnitSpec {
            max_allowance: self.max_allowance.unwrap_or(f64::INFINITY),
            max_health: self.max_health,
            mobility: self.mobility,
            pass_rule: self.pass_rule,
            ..UnitSpec::default()
        };
        for (name, &cost) in &self.terrain_costs {
            if cost.is_nan() || cost < 0.0 {
                return Err(ConfigError::NegativeCost {
                    terrain: name.clone(),
                    cost,
                });
            }
            spec.terrain_costs.insert(terrains.require(name)?, cost);
        }
        Ok(spec)
    }
}

impl Game {
    /// Build a game from a validated config: map, terrain table and
    /// profiles. No units are spawned.
    pub fn from_config(config: &GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let terrains = config.terrain_table()?;
        let mut game = Game::new(config.build_map_with(&terrains)?);
        game.terrains = terrains;
        game.profiles = config.unit_profiles.clone();
        Ok(game)
    }

    /// Look up a terrain id by name.
    pub fn terrain(&self, name: &str) -> Option<TerrainId> {
        self.terrains.id(name)
    }

    /// Spawn a unit (off the map) from a named profile.
    pub fn spawn_profile(
        &mut self,
        profile: &str,
        allegiance: Option<PlayerId>,
    ) -> Result<UnitId, ConfigError> {
        let found = self
            .profiles
            .get(profile)
            .ok_or_else(|| ConfigError::UnknownProfile(profile.to_owned()))?;
        let mut spec = found.to_spec(&self.terrains)?;
        spec.allegiance = allegiance;
        Ok(self.spawn_unit(spec))
    }
}
