//! Player movement, stamina and field/obstacle constraints

use super::entity::{Obstacle, Player, MAX_STAMINA};
use super::geometry::{clamp_axis, normalize};
use super::rules::Tuning;

/// Result of a constrained move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub x: f32,
    pub y: f32,
    /// The x component was cut short by a wall or obstacle
    pub blocked_x: bool,
    pub blocked_y: bool,
}

/// Physics system for updating positions
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Move a circle by (dx, dy), clamping to the field and cancelling any
    /// axis that would overlap an obstacle.
    pub fn step(
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        radius: f32,
        tuning: &Tuning,
        obstacles: &[Obstacle],
    ) -> Step {
        let wanted_x = x + dx;
        let mut new_x = clamp_axis(wanted_x, radius, tuning.field_width);
        let mut blocked_x = new_x != wanted_x;
        if dx != 0.0 && Self::hits_obstacle(new_x, y, radius, obstacles) {
            new_x = x;
            blocked_x = true;
        }

        let wanted_y = y + dy;
        let mut new_y = clamp_axis(wanted_y, radius, tuning.field_height);
        let mut blocked_y = new_y != wanted_y;
        if dy != 0.0 && Self::hits_obstacle(new_x, new_y, radius, obstacles) {
            new_y = y;
            blocked_y = true;
        }

        Step {
            x: new_x,
            y: new_y,
            blocked_x,
            blocked_y,
        }
    }

    pub fn hits_obstacle(x: f32, y: f32, radius: f32, obstacles: &[Obstacle]) -> bool {
        obstacles.iter().any(|o| o.overlaps_circle(x, y, radius))
    }

    /// Stamina after one tick, clamped to [0, MAX_STAMINA]
    pub fn update_stamina(stamina: f32, sprinting: bool, dt: f32, tuning: &Tuning) -> f32 {
        let next = if sprinting {
            stamina - tuning.stamina_drain * dt
        } else {
            stamina + tuning.stamina_regen * dt
        };
        next.clamp(0.0, MAX_STAMINA)
    }

    /// Apply the player's buffered movement intent for one tick
    pub fn move_player(player: &mut Player, tuning: &Tuning, obstacles: &[Obstacle], dt: f32) {
        let (nx, ny) = normalize(player.input.dx, player.input.dy);
        let moving = nx != 0.0 || ny != 0.0;
        let sprinting = player.alive && moving && player.input.sprint && player.stamina > 0.0;

        let speed = if !player.alive {
            tuning.spectator_speed
        } else if sprinting {
            tuning.sprint_speed
        } else if player.is_hunter() {
            tuning.player_speed * tuning.hunter_speed_multiplier
        } else {
            tuning.player_speed
        };

        player.stamina = Self::update_stamina(player.stamina, sprinting, dt, tuning);
        player.idle_time = if moving { 0.0 } else { player.idle_time + dt };

        if !moving {
            return;
        }

        // Spectators pass through obstacles
        let blocking: &[Obstacle] = if player.alive { obstacles } else { &[] };
        let step = Self::step(
            player.x,
            player.y,
            nx * speed * dt,
            ny * speed * dt,
            tuning.entity_radius,
            tuning,
            blocking,
        );
        player.x = step.x;
        player.y = step.y;
    }
}
