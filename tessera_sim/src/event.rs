// Game events: the observable record of every state change.
//
// `Game` pushes a `GameEvent` for each mutation that succeeds (a unit moved,
// a tile's terrain changed, a tile was placed, ...). Events are appended to an
// `EventLog` with a monotonically increasing sequence number; observers (UI,
// replay, tests) read or drain the log after each call. There are no callbacks
// and no global logger. The log is the narrative output of the core.
//
// Internal bookkeeping that follows from an event (edge-table refreshes,
// graph invalidation) happens synchronously inside `Game` before the call
// returns and is not itself logged.
//
// See also: `game.rs` for the mutations that emit each kind, `command.rs` for
// the actions that lead to them.
//
// **Critical constraint: determinism.** Sequence numbers come from a single
// counter, so two runs of the same call sequence produce identical logs.

use crate::types::{Coordinate, PlayerId, TerrainId, TileId, UnitId};
use serde::{Deserialize, Serialize};

/// One entry in the event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Position of this event in the log. Strictly increasing.
    pub sequence: u64,
    pub kind: GameEventKind,
}

/// What happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventKind {
    /// A unit's position changed. `None` means off the map.
    UnitMoved {
        unit: UnitId,
        from: Option<TileId>,
        to: Option<TileId>,
    },
    /// A unit turned.
    FacingChanged { unit: UnitId, previous: u8, facing: u8 },
    /// A unit changed sides.
    AllegianceChanged {
        unit: UnitId,
        previous: Option<PlayerId>,
        allegiance: Option<PlayerId>,
    },
    TerrainChanged {
        tile: TileId,
        previous: TerrainId,
        terrain: TerrainId,
    },
    CapacityChanged { tile: TileId, previous: u32, capacity: u32 },
    OccupantAdded { tile: TileId, unit: UnitId },
    OccupantRemoved { tile: TileId, unit: UnitId },
    TilePlaced { tile: TileId, coordinate: Coordinate },
    TileDetached { tile: TileId, coordinate: Coordinate },
    UnitSpawned { unit: UnitId },
    UnitDestroyed { unit: UnitId },
}

/// Append-only log of game events.
///
/// Nothing is ever discarded on its own; the buffer grows until `drain`
/// hands the pending events to the caller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<GameEvent>,
    next_sequence: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, stamping it with the next sequence number.
    pub fn push(&mut self, kind: GameEventKind) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(GameEvent { sequence, kind });
    }

    /// Remove and return every buffered event. Sequence numbering continues.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_increases_across_drains() {
        let mut log = EventLog::new();
        log.push(GameEventKind::UnitSpawned { unit: UnitId(0) });
        log.push(GameEventKind::UnitSpawned { unit: UnitId(1) });
        let first = log.drain();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].sequence, 0);
        assert_eq!(first[1].sequence, 1);
        assert!(log.is_empty());

        log.push(GameEventKind::UnitDestroyed { unit: UnitId(0) });
        assert_eq!(log.iter().next().unwrap().sequence, 2);
    }

    #[test]
    fn event_serialization() {
        let mut log = EventLog::new();
        log.push(GameEventKind::UnitMoved {
            unit: UnitId(4),
            from: None,
            to: Some(TileId(9)),
        });
        log.push(GameEventKind::TilePlaced {
            tile: TileId(9),
            coordinate: Coordinate::new(1, 2),
        });
        let json = serde_json::to_string(&log).unwrap();
        let restored: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.iter().collect::<Vec<_>>(), log.iter().collect::<Vec<_>>());
    }
}
