//! Combat system - firing, projectile integration, hit detection, marking

use uuid::Uuid;

use super::entity::{Npc, Obstacle, Player, Projectile, Slot};
use super::geometry::{normalize, segment_within_radius, within_radius};
use super::physics::PhysicsSystem;
use super::rules::{FireMode, RuleSet, Tuning};

/// What a projectile or mark landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Index into the room's NPC list
    Npc(usize),
    Player(Uuid),
}

/// Hit result from projectile resolution
#[derive(Debug, Clone)]
pub struct HitResult {
    pub projectile_id: u32,
    pub shooter_id: Uuid,
    pub target: Target,
    pub x: f32,
    pub y: f32,
    pub color: &'static str,
}

/// Combat system for managing weapons and hits
pub struct CombatSystem;

impl CombatSystem {
    /// Update weapon cooldown
    pub fn update_cooldown(cooldown: f32, dt: f32) -> f32 {
        (cooldown - dt).max(0.0)
    }

    /// Whether the player may use the weapon slot this tick
    pub fn can_fire(player: &Player, rules: &RuleSet) -> bool {
        if !player.alive || !player.is_hunter() || player.slot != Slot::Weapon {
            return false;
        }
        if player.fire_cooldown > 0.0 {
            return false;
        }
        match rules.fire_mode {
            FireMode::LimitedAmmo => player.ammo > 0,
            FireMode::CooldownOnly => true,
        }
    }

    /// Whether the player may use the marker slot this tick
    pub fn can_mark(player: &Player) -> bool {
        player.alive && player.is_hunter() && player.slot == Slot::Marker && player.fire_cooldown <= 0.0
    }

    /// Spawn a projectile towards the player's aim point, spending ammo and
    /// starting the cooldown. Callers check `can_fire` first.
    pub fn fire(player: &mut Player, rules: &RuleSet, tuning: &Tuning, id: u32) -> Projectile {
        let (nx, ny) = normalize(player.input.aim_x - player.x, player.input.aim_y - player.y);

        if rules.fire_mode == FireMode::LimitedAmmo {
            player.ammo = player.ammo.saturating_sub(1);
        }
        player.fire_cooldown = tuning.weapon_cooldown;

        Projectile {
            id,
            owner_id: player.id,
            x: player.x,
            y: player.y,
            vel_x: nx * tuning.projectile_speed,
            vel_y: ny * tuning.projectile_speed,
            lifetime: tuning.projectile_lifetime,
        }
    }

    /// Advance the mark counter of the first entity near the aim point.
    /// NPCs are checked before hider players; at most one entity is marked.
    pub fn mark(
        aim_x: f32,
        aim_y: f32,
        npcs: &mut [Npc],
        players: &mut [Player],
        tuning: &Tuning,
    ) -> Option<Target> {
        let r = tuning.mark_radius;

        if let Some((idx, npc)) = npcs
            .iter_mut()
            .enumerate()
            .find(|(_, n)| n.alive && within_radius(aim_x, aim_y, n.x, n.y, r))
        {
            npc.mark.advance();
            return Some(Target::Npc(idx));
        }

        if let Some(player) = players
            .iter_mut()
            .find(|p| p.is_live_hider() && within_radius(aim_x, aim_y, p.x, p.y, r))
        {
            player.mark.advance();
            return Some(Target::Player(player.id));
        }

        None
    }

    /// Integrate projectiles and resolve collisions for one tick.
    ///
    /// Expired projectiles are removed before any collision test. A live
    /// projectile is tested along the segment it travelled this tick, hits at
    /// most one target, NPCs before players, and is removed on contact. Targets are marked dead here; callers turn hits into events.
    pub fn resolve_projectiles(
        projectiles: &mut Vec<Projectile>,
        npcs: &mut [Npc],
        players: &mut [Player],
        obstacles: &[Obstacle],
        tuning: &Tuning,
        dt: f32,
    ) -> Vec<HitResult> {
        let mut hits = Vec::new();
        let r = tuning.hit_radius;

        projectiles.retain_mut(|projectile| {
            let from = (projectile.x, projectile.y);
            projectile.x += projectile.vel_x * dt;
            projectile.y += projectile.vel_y * dt;
            projectile.lifetime -= dt;

            if projectile.lifetime <= 0.0 {
                return false;
            }

            // Sweep the whole step so low tick rates cannot skip a target
            let to = (projectile.x, projectile.y);
            let swept = |x: f32, y: f32| segment_within_radius(from, to, (x, y), r);

            if let Some((idx, npc)) = npcs
                .iter_mut()
                .enumerate()
                .find(|(_, n)| n.alive && swept(n.x, n.y))
            {
                npc.alive = false;
                hits.push(HitResult {
                    projectile_id: projectile.id,
                    shooter_id: projectile.owner_id,
                    target: Target::Npc(idx),
                    x: npc.x,
                    y: npc.y,
                    color: npc.color,
                });
                return false;
            }

            if let Some(player) = players
                .iter_mut()
                .find(|p| p.is_live_hider() && swept(p.x, p.y))
            {
                player.alive = false;
                hits.push(HitResult {
                    projectile_id: projectile.id,
                    shooter_id: projectile.owner_id,
                    target: Target::Player(player.id),
                    x: player.x,
                    y: player.y,
                    color: player.color,
                });
                return false;
            }

            let inside = projectile.x >= 0.0
                && projectile.x <= tuning.field_width
                && projectile.y >= 0.0
                && projectile.y <= tuning.field_height;

            inside && !PhysicsSystem::hits_obstacle(projectile.x, projectile.y, 0.0, obstacles)
        });

        hits
    }
}
