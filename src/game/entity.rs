//! Authoritative entity records
//!
//! Positions are kept at full `f32` precision; truncation happens only when
//! a snapshot is built.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::Rect;
use super::TickInput;

/// Static axis-aligned obstacle, regenerated every match
pub type Obstacle = Rect;

/// Colors shared by NPCs and players so hiders blend in
pub const PALETTE: [&str; 8] = [
    "#e74c3c", "#3498db", "#2ecc71", "#f1c40f", "#9b59b6", "#e67e22", "#1abc9c", "#ecf0f1",
];

pub const MAX_STAMINA: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Hunter,
    Hider,
    Spectator,
}

/// Active equipment slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    #[default]
    Weapon,
    Marker,
}

/// Cyclic suspicion tag, always in 0..=3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Mark(u8);

impl Mark {
    pub fn value(self) -> u8 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 = (self.0 + 1) % 4;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Player state in a room (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub color: &'static str,
    pub host: bool,

    // Position and role
    pub x: f32,
    pub y: f32,
    pub role: Role,
    pub alive: bool,

    // Resources
    pub stamina: f32,
    /// Ammo or lives, depending on the match rules
    pub ammo: u32,
    pub slot: Slot,
    pub mark: Mark,
    pub fire_cooldown: f32,
    pub idle_time: f32,

    /// Latest buffered intent
    pub input: TickInput,
    /// `input.shoot` as seen by the previous tick
    pub shoot_held: bool,
}

impl Player {
    pub fn new(id: Uuid, name: String, color: &'static str, x: f32, y: f32) -> Self {
        Self {
            id,
            name,
            color,
            host: false,
            x,
            y,
            role: Role::Spectator,
            alive: true,
            stamina: MAX_STAMINA,
            ammo: 0,
            slot: Slot::Weapon,
            mark: Mark::default(),
            fire_cooldown: 0.0,
            idle_time: 0.0,
            input: TickInput::default(),
            shoot_held: false,
        }
    }

    pub fn is_hunter(&self) -> bool {
        self.role == Role::Hunter
    }

    /// A hider that can still be eliminated or marked
    pub fn is_live_hider(&self) -> bool {
        self.role == Role::Hider && self.alive
    }

    /// Restore per-match state before a new round
    pub fn reset_for_match(&mut self, role: Role, x: f32, y: f32, ammo: u32) {
        self.role = role;
        self.x = x;
        self.y = y;
        self.alive = true;
        self.stamina = MAX_STAMINA;
        self.ammo = ammo;
        self.slot = Slot::Weapon;
        self.mark.clear();
        self.fire_cooldown = 0.0;
        self.idle_time = 0.0;
        self.input = TickInput::default();
        self.shoot_held = false;
    }
}

/// Decoy controlled by the server
#[derive(Debug, Clone)]
pub struct Npc {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    /// Discrete intent per axis, each in {-1, 0, 1}
    pub intent_x: i8,
    pub intent_y: i8,
    pub intent_timer: f32,
    pub sprinting: bool,
    pub alive: bool,
    pub mark: Mark,
    pub color: &'static str,
    pub idle_time: f32,
}

impl Npc {
    pub fn new(id: u32, x: f32, y: f32, color: &'static str) -> Self {
        Self {
            id,
            x,
            y,
            intent_x: 0,
            intent_y: 0,
            intent_timer: 0.0,
            sprinting: false,
            alive: true,
            mark: Mark::default(),
            color,
            idle_time: 0.0,
        }
    }

    pub fn is_still(&self) -> bool {
        self.intent_x == 0 && self.intent_y == 0
    }
}

/// Active projectile in the game
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub lifetime: f32,
}
