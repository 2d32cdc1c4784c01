//! Game simulation modules

pub mod combat;
pub mod directory;
pub mod entity;
pub mod geometry;
pub mod r#match;
pub mod npc;
pub mod physics;
pub mod rules;
pub mod server;
pub mod snapshot;
pub mod spawn;

pub use directory::RoomDirectory;
pub use server::{GameServer, ServerHandle};

use entity::Slot;

/// Buffered intent for a single player (last value wins)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub dx: f32,
    pub dy: f32,
    pub sprint: bool,
    pub shoot: bool,
    pub aim_x: f32,
    pub aim_y: f32,
    pub slot: Slot,
}
