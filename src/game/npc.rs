//! Decoy wander behavior
//!
//! Each NPC holds a discrete intent for a random duration, then redraws.
//! NPCs are independent of each other; dead NPCs are frozen.

use rand::Rng;

use super::entity::{Npc, Obstacle};
use super::geometry::normalize;
use super::physics::PhysicsSystem;
use super::rules::Tuning;

pub struct NpcController;

impl NpcController {
    /// Draw a new intent and hold duration
    pub fn redraw<R: Rng + ?Sized>(npc: &mut Npc, rng: &mut R, tuning: &Tuning) {
        if rng.gen_bool(tuning.npc_idle_chance) {
            npc.intent_x = 0;
            npc.intent_y = 0;
            npc.sprinting = false;
        } else {
            npc.intent_x = rng.gen_range(-1..=1);
            npc.intent_y = rng.gen_range(-1..=1);
            npc.sprinting = rng.gen_bool(tuning.npc_sprint_chance);
        }
        npc.intent_timer = rng.gen_range(tuning.npc_hold_min..tuning.npc_hold_max);
    }

    /// Advance one NPC by `dt`.
    ///
    /// Without obstacles an NPC that reaches a wall bounces by inverting the
    /// blocked intent axis. With obstacles it slides: the blocked axis move is
    /// cancelled and the intent is kept.
    pub fn update<R: Rng + ?Sized>(
        npc: &mut Npc,
        rng: &mut R,
        tuning: &Tuning,
        obstacles: &[Obstacle],
        dt: f32,
    ) {
        if !npc.alive {
            return;
        }

        npc.intent_timer -= dt;
        if npc.intent_timer <= 0.0 {
            Self::redraw(npc, rng, tuning);
        }

        if npc.is_still() {
            npc.idle_time += dt;
            return;
        }
        npc.idle_time = 0.0;

        let (nx, ny) = normalize(npc.intent_x as f32, npc.intent_y as f32);
        let speed = if npc.sprinting {
            tuning.npc_sprint_speed
        } else {
            tuning.npc_speed
        };

        let step = PhysicsSystem::step(
            npc.x,
            npc.y,
            nx * speed * dt,
            ny * speed * dt,
            tuning.entity_radius,
            tuning,
            obstacles,
        );
        npc.x = step.x;
        npc.y = step.y;

        if obstacles.is_empty() {
            if step.blocked_x {
                npc.intent_x = -npc.intent_x;
            }
            if step.blocked_y {
                npc.intent_y = -npc.intent_y;
            }
        }
    }
}
