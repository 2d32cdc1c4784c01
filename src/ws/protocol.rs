//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::entity::{Obstacle, Role, Slot};
use crate::game::r#match::{EndReason, MatchPhase};
use crate::game::rules::{RuleOverrides, RuleSet};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Register in the room; the first joiner becomes host
    Join { name: String },

    /// Desired intent for the next tick (last value wins)
    Input {
        /// Movement direction, need not be normalized
        #[serde(default)]
        dx: f32,
        #[serde(default)]
        dy: f32,
        #[serde(default)]
        sprint: bool,
        /// Use the active slot this tick
        #[serde(default)]
        shoot: bool,
        /// Aim point in field coordinates
        #[serde(default)]
        aim_x: f32,
        #[serde(default)]
        aim_y: f32,
        #[serde(default)]
        slot: Slot,
    },

    /// Host-only: start the match, optionally overriding the room rules
    StartMatch {
        #[serde(default)]
        rules: Option<RuleOverrides>,
    },

    /// Host-only: leave the ended state and go back to the lobby
    ReturnToLobby,

    /// Leave the room
    Leave,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once per connection after joining
    Init {
        id: Uuid,
        field_width: f32,
        field_height: f32,
        obstacles: Vec<Obstacle>,
        host: bool,
    },

    /// Player joined the room
    PlayerJoined { id: Uuid, name: String },

    /// Player left the room
    PlayerLeft { id: Uuid, reason: String },

    /// Lobby -> Playing
    MatchStarted {
        hunter_id: Uuid,
        timer: f32,
        rules: RuleSet,
        obstacles: Vec<Obstacle>,
    },

    /// Per-tick state view
    Tick {
        seq: u64,
        phase: MatchPhase,
        timer: f32,
        players: Vec<PlayerSnapshot>,
        npcs: Vec<NpcSnapshot>,
        projectiles: Vec<ProjectileSnapshot>,
        events: Vec<GameEvent>,
    },

    /// Playing -> Ended
    MatchEnded { reason: EndReason, hunter_won: bool },

    /// Rejected request, sent only to the requester
    Error { code: String, message: String },
}

/// Player state in a snapshot. Coordinates are truncated to integers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub role: Role,
    pub alive: bool,
    pub host: bool,
    pub stamina: u8,
    pub ammo: u32,
    pub slot: Slot,
    pub mark: u8,
    pub color: &'static str,
    pub idle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpcSnapshot {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub alive: bool,
    pub mark: u8,
    pub color: &'static str,
    pub idle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileSnapshot {
    pub id: u32,
    pub x: i32,
    pub y: i32,
}

/// One-shot events, drained after every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    /// Something died at this position
    Kill { x: i32, y: i32, color: &'static str },

    /// Display text
    Msg { text: String },

    /// Camera shake magnitude
    Shake { magnitude: f32 },

    /// Sound cue name
    Sound { cue: &'static str },
}
