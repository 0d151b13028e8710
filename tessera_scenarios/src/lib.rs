// Test-only scenario harness for end-to-end game tests.
//
// A `Scenario` builds a real `Game` from an ASCII map, going through the same
// `GameConfig` JSON path a front end would use. Each row string is one map
// row, row 0 first (y = 0). Layout characters:
//
//   .  grass        f  forest       ~  water        #  rock
//   A-Z  named marker, grass underneath
//
// Markers let tests refer to tiles by letter instead of coordinates.
//
// The harness registers a fixed set of unit profiles (see `PROFILES`). All
// game logic runs through the public `tessera_sim` API; the only test-specific
// code here is fixture parsing and a few convenience lookups.
//
// See also: `tests/end_to_end.rs` for the scenarios.

use std::collections::BTreeMap;

use tessera_sim::config::GameConfig;
use tessera_sim::game::Game;
use tessera_sim::tessellation::Tessellation;
use tessera_sim::types::{Coordinate, PlayerId, TileId, UnitId};

/// Unit profiles available in every scenario, as config JSON.
///
/// - `walker`: grass 1, forest 2, unlimited allowance.
/// - `scout`:  like `walker` but 3 movement points per turn.
/// - `guard`:  like `walker` but refuses tiles held by foreign units.
/// - `boat`:   water only.
/// - `tower`:  immobile, grass only.
pub const PROFILES: &str = r#"{
    "walker": { "terrain_costs": { "grass": 1.0, "forest": 2.0 } },
    "scout":  { "terrain_costs": { "grass": 1.0, "forest": 2.0 }, "max_allowance": 3.0 },
    "guard":  { "terrain_costs": { "grass": 1.0, "forest": 2.0 }, "pass_rule": "AvoidForeign" },
    "boat":   { "terrain_costs": { "water": 1.0 } },
    "tower":  { "terrain_costs": { "grass": 0.0 }, "mobility": "Immobile" }
}"#;

/// A game built from an ASCII map, plus its named markers.
pub struct Scenario {
    pub game: Game,
    markers: BTreeMap<char, Coordinate>,
}

impl Scenario {
    /// Build a scenario from map rows. Panics on a malformed fixture.
    pub fn new(tessellation: Tessellation, rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());

        let mut markers = BTreeMap::new();
        let mut layout = Vec::with_capacity(height);
        for (y, row) in rows.iter().enumerate() {
            let mut line = String::with_capacity(width);
            for (x, c) in row.chars().enumerate() {
                if c.is_ascii_uppercase() {
                    markers.insert(c, Coordinate::new(x as i32, y as i32));
                    line.push('.');
                } else {
                    line.push(c);
                }
            }
            layout.push(line);
        }

        let profiles: serde_json::Value =
            serde_json::from_str(PROFILES).expect("PROFILES is valid JSON");
        let config = serde_json::json!({
            "map": {
                "width": width,
                "height": height,
                "tessellation": tessellation,
                "legend": { ".": "grass", "f": "forest", "~": "water", "#": "rock" },
                "layout": layout,
            },
            "terrains": ["grass", "forest", "water", "rock"],
            "unit_profiles": profiles,
        });
        let config = GameConfig::from_json(&config.to_string()).expect("fixture config is valid");
        let game = Game::from_config(&config).expect("fixture builds a game");
        Self { game, markers }
    }

    /// Uniform grass map.
    pub fn open(tessellation: Tessellation, width: usize, height: usize) -> Self {
        let row = ".".repeat(width);
        let rows: Vec<&str> = (0..height).map(|_| row.as_str()).collect();
        Self::new(tessellation, &rows)
    }

    /// The tile under marker `name`.
    pub fn marker(&self, name: char) -> TileId {
        let coord = self
            .markers
            .get(&name)
            .unwrap_or_else(|| panic!("no marker {name:?} in fixture"));
        self.at(coord.x, coord.y)
    }

    pub fn at(&self, x: i32, y: i32) -> TileId {
        self.game
            .map()
            .tile_at(x, y)
            .unwrap_or_else(|| panic!("no tile at ({x}, {y})"))
    }

    /// Spawn a unit from a profile and put it on `tile`.
    pub fn spawn(&mut self, profile: &str, tile: TileId, player: Option<u32>) -> UnitId {
        let unit = self
            .game
            .spawn_profile(profile, player.map(PlayerId))
            .expect("known profile");
        assert!(
            self.game.set_position(unit, Some(tile)),
            "could not place {profile} on {tile}"
        );
        unit
    }

    /// Coordinate of the unit's tile.
    pub fn coordinate_of(&self, unit: UnitId) -> Option<Coordinate> {
        let tile = self.game.position(unit)?;
        self.game.map().tile(tile).coordinate()
    }

    /// Every stored edge weight of `unit`, in tile then direction order.
    pub fn edge_snapshot(&self, unit: UnitId) -> Vec<f64> {
        let map = self.game.map();
        let directions = map.tessellation().direction_count();
        map.placed_tiles()
            .flat_map(|t| (0..directions).map(move |d| (t, d)))
            .map(|(t, d)| self.game.edge_weight(unit, t, d))
            .collect()
    }

    /// Edge weights a from-scratch build would produce for `unit` right now.
    pub fn rebuilt_snapshot(&self, unit: UnitId) -> Vec<f64> {
        let mut fresh = Scenario {
            game: self.game.clone(),
            markers: self.markers.clone(),
        };
        fresh.game.remove_graph(unit);
        fresh.game.build_graph(unit);
        fresh.edge_snapshot(unit)
    }

    /// The map as rows, row 0 first, with `@` marking occupied tiles.
    pub fn render(&self) -> Vec<String> {
        let map = self.game.map();
        let terrains = self.game.terrains();
        (0..map.height() as i32)
            .map(|y| {
                (0..map.width() as i32)
                    .map(|x| match map.tile_at(x, y).map(|t| map.tile(t)) {
                        None => ' ',
                        Some(tile) if !tile.occupants().is_empty() => '@',
                        Some(tile) => match terrains.name(tile.terrain()) {
                            Some("grass") => '.',
                            Some("forest") => 'f',
                            Some("water") => '~',
                            Some("rock") => '#',
                            _ => '?',
                        },
                    })
                    .collect()
            })
            .collect()
    }
}
