//! Read-mostly view of live rooms for the HTTP layer
//!
//! Written by the tick loop only; handlers read it without touching room state.

use dashmap::DashMap;
use serde::Serialize;

use super::r#match::{MatchPhase, MatchState};

/// Room summary published once per tick
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub code: String,
    pub phase: MatchPhase,
    pub players: usize,
    pub npcs: usize,
    pub tick: u64,
}

impl RoomSummary {
    pub fn of(state: &MatchState) -> Self {
        Self {
            code: state.code.clone(),
            phase: state.phase,
            players: state.players.len(),
            npcs: state.npcs.iter().filter(|n| n.alive).count(),
            tick: state.tick,
        }
    }
}

/// Registry of all active rooms
pub struct RoomDirectory {
    rooms: DashMap<String, RoomSummary>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    pub fn get(&self, code: &str) -> Option<RoomSummary> {
        self.rooms.get(code).map(|r| r.value().clone())
    }

    pub fn publish(&self, summary: RoomSummary) {
        self.rooms.insert(summary.code.clone(), summary);
    }

    pub fn remove(&self, code: &str) -> Option<RoomSummary> {
        self.rooms.remove(code).map(|(_, s)| s)
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().players).sum()
    }

    /// All rooms, sorted by code
    pub fn list(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.rooms.iter().map(|r| r.value().clone()).collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        rooms
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(code: &str, players: usize) -> RoomSummary {
        RoomSummary {
            code: code.to_string(),
            phase: MatchPhase::Lobby,
            players,
            npcs: 0,
            tick: 0,
        }
    }

    #[test]
    fn publish_replaces_and_totals() {
        let dir = RoomDirectory::new();
        dir.publish(summary("b", 2));
        dir.publish(summary("a", 3));
        dir.publish(summary("b", 4));

        assert_eq!(dir.active_rooms(), 2);
        assert_eq!(dir.total_players(), 7);
        let codes: Vec<String> = dir.list().into_iter().map(|s| s.code).collect();
        assert_eq!(codes, vec!["a", "b"]);

        assert!(dir.remove("a").is_some());
        assert!(dir.get("a").is_none());
        assert_eq!(dir.total_players(), 4);
    }
}
