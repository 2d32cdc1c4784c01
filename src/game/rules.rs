//! Per-match rule selection and simulation tuning

use serde::{Deserialize, Serialize};

/// How the hunter's weapon is gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    /// Every shot spends one round; the round counter is the ammo budget
    LimitedAmmo,
    /// Unlimited shots, only the cooldown timer applies
    CooldownOnly,
}

impl Default for FireMode {
    fn default() -> Self {
        Self::LimitedAmmo
    }
}

/// Variant rules, fixed for the duration of one match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub fire_mode: FireMode,
    /// Killing an NPC costs the hunter one unit of ammo/lives
    pub casualty_penalty: bool,
    /// Generate static obstacles at match start
    pub obstacles: bool,
    /// Minimum hider spawn distance from the hunter (0 disables)
    pub hider_min_distance: f32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            fire_mode: FireMode::LimitedAmmo,
            casualty_penalty: false,
            obstacles: false,
            hider_min_distance: 300.0,
        }
    }
}

/// Partial rule set sent by the host with a start request
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RuleOverrides {
    #[serde(default)]
    pub fire_mode: Option<FireMode>,
    #[serde(default)]
    pub casualty_penalty: Option<bool>,
    #[serde(default)]
    pub obstacles: Option<bool>,
    #[serde(default)]
    pub hider_min_distance: Option<f32>,
}

impl RuleSet {
    pub fn with_overrides(self, overrides: &RuleOverrides) -> Self {
        Self {
            fire_mode: overrides.fire_mode.unwrap_or(self.fire_mode),
            casualty_penalty: overrides.casualty_penalty.unwrap_or(self.casualty_penalty),
            obstacles: overrides.obstacles.unwrap_or(self.obstacles),
            hider_min_distance: overrides
                .hider_min_distance
                .map(|d| d.max(0.0))
                .unwrap_or(self.hider_min_distance),
        }
    }

    /// The shared ammo/lives counter is a casualty budget rather than rounds
    pub fn counts_casualties(&self) -> bool {
        self.casualty_penalty && self.fire_mode == FireMode::CooldownOnly
    }
}

/// Simulation constants
#[derive(Debug, Clone)]
pub struct Tuning {
    pub field_width: f32,
    pub field_height: f32,
    pub entity_radius: f32,
    pub spawn_margin: f32,
    pub spawn_obstacle_attempts: u32,
    pub spawn_distance_attempts: u32,

    pub player_speed: f32,
    pub sprint_speed: f32,
    pub hunter_speed_multiplier: f32,
    pub spectator_speed: f32,
    pub stamina_drain: f32,
    pub stamina_regen: f32,
    pub idle_threshold: f32,

    pub npc_speed: f32,
    pub npc_sprint_speed: f32,
    pub npc_idle_chance: f64,
    pub npc_sprint_chance: f64,
    pub npc_hold_min: f32,
    pub npc_hold_max: f32,
    pub npc_base_count: usize,
    pub npc_per_player: usize,

    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
    pub hit_radius: f32,
    pub mark_radius: f32,
    pub weapon_cooldown: f32,
    pub mark_cooldown: f32,

    pub base_duration: f32,
    pub duration_per_hider: f32,
    pub base_ammo: u32,
    pub ammo_per_hider: u32,
    pub base_lives: u32,
    pub lives_per_hider: u32,

    pub obstacle_count: usize,
    pub obstacle_min_size: f32,
    pub obstacle_max_size: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            field_width: 1600.0,
            field_height: 1200.0,
            entity_radius: 20.0,
            spawn_margin: 50.0,
            spawn_obstacle_attempts: 100,
            spawn_distance_attempts: 15,

            player_speed: 200.0,
            sprint_speed: 320.0,
            hunter_speed_multiplier: 1.1,
            spectator_speed: 500.0,
            stamina_drain: 35.0,
            stamina_regen: 15.0,
            idle_threshold: 1.0,

            npc_speed: 200.0,
            npc_sprint_speed: 320.0,
            npc_idle_chance: 0.2,
            npc_sprint_chance: 0.3,
            npc_hold_min: 0.5,
            npc_hold_max: 2.5,
            npc_base_count: 10,
            npc_per_player: 4,

            projectile_speed: 900.0,
            projectile_lifetime: 1.5,
            hit_radius: 25.0,
            mark_radius: 40.0,
            weapon_cooldown: 0.5,
            mark_cooldown: 0.25,

            base_duration: 60.0,
            duration_per_hider: 30.0,
            base_ammo: 2,
            ammo_per_hider: 1,
            base_lives: 3,
            lives_per_hider: 1,

            obstacle_count: 8,
            obstacle_min_size: 60.0,
            obstacle_max_size: 180.0,
        }
    }
}

impl Tuning {
    pub fn npc_count(&self, players: usize) -> usize {
        self.npc_base_count + self.npc_per_player * players
    }

    /// Match length in seconds; larger rooms get more time
    pub fn match_duration(&self, hiders: usize) -> f32 {
        self.base_duration + self.duration_per_hider * hiders as f32
    }

    /// Starting value of the hunter's ammo/lives counter
    pub fn hunter_budget(&self, rules: &RuleSet, hiders: usize) -> u32 {
        let hiders = hiders as u32;
        if rules.counts_casualties() {
            self.base_lives + self.lives_per_hider * hiders
        } else {
            self.base_ammo + self.ammo_per_hider * hiders
        }
    }
}
