// Commands that mutate game state, and the move-legality seam.
//
// Outside code can drive a `Game` two ways: call its methods directly, or
// build a `GameAction` and hand it to `Game::apply`. Actions are plain serde
// data, so a front end, a replay file or a test script can produce them
// without linking against anything but this crate.
//
// Whether a unit may move right now is a policy question the core does not
// answer itself. `MoveArbiter` is that seam: `Game::move_unit`, `put_unit`
// and the movement actions ask the arbiter first. Two policies ship:
// - `Unrestricted`: every unit may always move (editors, tests).
// - `TurnHolder`: only units whose allegiance is the player holding the
//   turn may move.
//
// Map-editing actions (terrain, capacity, tile placement) and unit lifecycle
// actions are not arbitrated.
//
// See also: `game.rs` for the methods each action maps onto, `event.rs` for
// what gets logged.

use crate::game::Game;
use crate::types::{Coordinate, PlayerId, TerrainId, TileId, UnitId};
use serde::{Deserialize, Serialize};

/// Decides whether a unit is allowed to move.
pub trait MoveArbiter {
    fn can_move(&self, game: &Game, unit: UnitId) -> bool;
}

/// Every existing unit may move.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unrestricted;

impl MoveArbiter for Unrestricted {
    fn can_move(&self, game: &Game, unit: UnitId) -> bool {
        game.unit(unit).is_some()
    }
}

/// Only the current player's units may move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnHolder {
    pub player: PlayerId,
}

impl MoveArbiter for TurnHolder {
    fn can_move(&self, game: &Game, unit: UnitId) -> bool {
        game.unit(unit)
            .is_some_and(|u| u.allegiance == Some(self.player))
    }
}

/// A single mutation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameAction {
    /// Walk a unit toward a tile (see `Game::move_to`).
    MoveUnit { unit: UnitId, target: TileId },
    /// Put a unit straight onto a tile, or off the map with `None`.
    PutUnit { unit: UnitId, tile: Option<TileId> },
    MoveForward { unit: UnitId },
    SetFacing { unit: UnitId, direction: u8 },
    TurnLeft { unit: UnitId },
    TurnRight { unit: UnitId },
    SetAllegiance {
        unit: UnitId,
        allegiance: Option<PlayerId>,
    },
    DestroyUnit { unit: UnitId },
    Damage { unit: UnitId, amount: u32 },
    Repair { unit: UnitId, amount: u32 },
    /// Refill the allowance of every unit owned by `player`.
    BeginTurn { player: PlayerId },
    SetTerrain { tile: TileId, terrain: TerrainId },
    SetCapacity { tile: TileId, capacity: u32 },
    PlaceTile { tile: TileId, coordinate: Coordinate },
    DetachTile { tile: TileId },
}

impl GameAction {
    /// The unit whose movement this action requests, if it is a movement
    /// action subject to arbitration.
    pub fn moving_unit(&self) -> Option<UnitId> {
        match *self {
            GameAction::MoveUnit { unit, .. }
            | GameAction::PutUnit { unit, .. }
            | GameAction::MoveForward { unit }
            | GameAction::SetFacing { unit, .. }
            | GameAction::TurnLeft { unit }
            | GameAction::TurnRight { unit } => Some(unit),
            _ => None,
        }
    }
}

impl Game {
    /// `move_to`, if the arbiter allows it.
    pub fn move_unit(&mut self, arbiter: &dyn MoveArbiter, unit: UnitId, target: TileId) -> bool {
        arbiter.can_move(self, unit) && self.move_to(unit, target)
    }

    /// `set_position`, if the arbiter allows it.
    pub fn put_unit(&mut self, arbiter: &dyn MoveArbiter, unit: UnitId, tile: Option<TileId>) -> bool {
        arbiter.can_move(self, unit) && self.set_position(unit, tile)
    }

    /// Apply one action. Returns whether the game changed (for `MoveUnit`,
    /// whether the unit reached the end of its path).
    pub fn apply(&mut self, action: &GameAction, arbiter: &dyn MoveArbiter) -> bool {
        if action
            .moving_unit()
            .is_some_and(|unit| !arbiter.can_move(self, unit))
        {
            return false;
        }
        match *action {
            GameAction::MoveUnit { unit, target } => self.move_to(unit, target),
            GameAction::PutUnit { unit, tile } => self.set_position(unit, tile),
            GameAction::MoveForward { unit } => self.move_forward(unit),
            GameAction::SetFacing { unit, direction } => self.set_facing(unit, direction),
            GameAction::TurnLeft { unit } => self.turn_left(unit),
            GameAction::TurnRight { unit } => self.turn_right(unit),
            GameAction::SetAllegiance { unit, allegiance } => self.set_allegiance(unit, allegiance),
            GameAction::DestroyUnit { unit } => self.destroy_unit(unit),
            GameAction::Damage { unit, amount } => self.damage(unit, amount).is_some(),
            GameAction::Repair { unit, amount } => self.repair(unit, amount).is_some(),
            GameAction::BeginTurn { player } => {
                self.begin_turn(player);
                true
            }
            GameAction::SetTerrain { tile, terrain } => self.set_terrain(tile, terrain),
            GameAction::SetCapacity { tile, capacity } => self.set_capacity(tile, capacity),
            GameAction::PlaceTile { tile, coordinate } => self.place_tile(coordinate, tile),
            GameAction::DetachTile { tile } => self.detach_tile(tile),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GameMap;
    use crate::tessellation::Tessellation;
    use crate::unit::UnitSpec;

    const GRASS: TerrainId = TerrainId(0);

    fn game_with_two_sides() -> (Game, UnitId, UnitId) {
        let mut game = Game::new(GameMap::filled(4, 4, Tessellation::Square, GRASS));
        let red = game.spawn_unit(UnitSpec::new().with_cost(GRASS, 1.0).with_allegiance(PlayerId(0)));
        let blue = game.spawn_unit(UnitSpec::new().with_cost(GRASS, 1.0).with_allegiance(PlayerId(1)));
        let a = game.map().tile_at(0, 0).unwrap();
        let b = game.map().tile_at(3, 3).unwrap();
        game.set_position(red, Some(a));
        game.set_position(blue, Some(b));
        (game, red, blue)
    }

    #[test]
    fn turn_holder_only_moves_own_units() {
        let (mut game, red, blue) = game_with_two_sides();
        let arbiter = TurnHolder { player: PlayerId(0) };
        let target = game.map().tile_at(0, 2).unwrap();
        assert!(!game.move_unit(&arbiter, blue, target));
        assert!(game.move_unit(&arbiter, red, target));
        assert_eq!(game.position(red), Some(target));
    }

    #[test]
    fn unrestricted_rejects_missing_units() {
        let (mut game, _, _) = game_with_two_sides();
        let t = game.map().tile_at(1, 1).unwrap();
        assert!(!game.put_unit(&Unrestricted, UnitId(42), Some(t)));
    }

    #[test]
    fn apply_gates_movement_but_not_map_edits() {
        let (mut game, red, blue) = game_with_two_sides();
        let arbiter = TurnHolder { player: PlayerId(1) };
        let t = game.map().tile_at(1, 0).unwrap();

        assert!(!game.apply(&GameAction::TurnLeft { unit: red }, &arbiter));
        assert!(game.apply(&GameAction::TurnLeft { unit: blue }, &arbiter));
        assert!(game.apply(
            &GameAction::SetTerrain {
                tile: t,
                terrain: TerrainId(5)
            },
            &arbiter
        ));
        assert_eq!(game.tile(t).unwrap().terrain(), TerrainId(5));
    }

    #[test]
    fn actions_round_trip_through_json() {
        let actions = vec![
            GameAction::MoveUnit {
                unit: UnitId(1),
                target: TileId(7),
            },
            GameAction::PutUnit {
                unit: UnitId(1),
                tile: None,
            },
            GameAction::PlaceTile {
                tile: TileId(3),
                coordinate: Coordinate::new(2, 1),
            },
        ];
        let json = serde_json::to_string(&actions).unwrap();
        let restored: Vec<GameAction> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, actions);
    }

    #[test]
    fn scripted_actions_replay_identically() {
        let script = [
            GameAction::BeginTurn { player: PlayerId(0) },
            GameAction::MoveUnit {
                unit: UnitId(0),
                target: TileId(10),
            },
            GameAction::SetAllegiance {
                unit: UnitId(1),
                allegiance: Some(PlayerId(0)),
            },
            GameAction::MoveUnit {
                unit: UnitId(1),
                target: TileId(0),
            },
        ];
        let run = || {
            let (mut game, _, _) = game_with_two_sides();
            for action in &script {
                game.apply(action, &Unrestricted);
            }
            game.drain_events()
        };
        assert_eq!(run(), run());
    }
}
