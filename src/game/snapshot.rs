//! Snapshot building
//!
//! Coordinates are truncated to integers here and only here; the simulation
//! keeps full precision.

use crate::ws::protocol::{GameEvent, NpcSnapshot, PlayerSnapshot, ProjectileSnapshot, ServerMsg};

use super::r#match::MatchState;

/// Builds the outbound per-tick view of a room
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Build a tick message from the current state and this tick's events
    pub fn build(state: &MatchState, events: Vec<GameEvent>) -> ServerMsg {
        let idle_threshold = state.tuning.idle_threshold;

        let players = state
            .players
            .iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                name: p.name.clone(),
                x: p.x as i32,
                y: p.y as i32,
                role: p.role,
                alive: p.alive,
                host: p.host,
                stamina: p.stamina as u8,
                ammo: p.ammo,
                slot: p.slot,
                mark: p.mark.value(),
                color: p.color,
                idle: p.idle_time >= idle_threshold,
            })
            .collect();

        let npcs = state
            .npcs
            .iter()
            .map(|n| NpcSnapshot {
                id: n.id,
                x: n.x as i32,
                y: n.y as i32,
                alive: n.alive,
                mark: n.mark.value(),
                color: n.color,
                idle: n.idle_time >= idle_threshold,
            })
            .collect();

        let projectiles = state
            .projectiles
            .iter()
            .map(|p| ProjectileSnapshot {
                id: p.id,
                x: p.x as i32,
                y: p.y as i32,
            })
            .collect();

        ServerMsg::Tick {
            seq: state.tick,
            phase: state.phase,
            timer: state.timer,
            players,
            npcs,
            projectiles,
            events,
        }
    }
}
