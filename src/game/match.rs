//! Match state and per-room authoritative tick
//!
//! `MatchState` owns every entity of one room. It is only ever mutated by the
//! tick loop: inputs are buffered with `set_input` and consumed by `tick`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::GameEvent;

use super::combat::{CombatSystem, HitResult, Target};
use super::entity::{Npc, Obstacle, Player, Projectile, Role, PALETTE};
use super::npc::NpcController;
use super::physics::PhysicsSystem;
use super::rules::{FireMode, RuleOverrides, RuleSet, Tuning};
use super::spawn::{generate_obstacles, Avoid, SpawnPlanner};
use super::TickInput;

/// Players needed to start and to keep a match running
pub const MIN_PLAYERS: usize = 2;

const NPC_KILL_LINES: [&str; 5] = [
    "That was just a decoy!",
    "An innocent bystander falls.",
    "Wrong target!",
    "The crowd panics.",
    "Not the one you were looking for.",
];

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Waiting for the host to start
    Lobby,
    /// Match in progress
    Playing,
    /// Match ended, waiting for a reset
    Ended,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    #[serde(rename = "all targets eliminated")]
    AllTargetsEliminated,
    #[serde(rename = "time expired")]
    TimeExpired,
    #[serde(rename = "out of ammo")]
    OutOfAmmo,
    #[serde(rename = "too many casualties")]
    TooManyCasualties,
    #[serde(rename = "not enough players")]
    NotEnoughPlayers,
    #[serde(rename = "hunter left")]
    HunterLeft,
    #[serde(rename = "internal error")]
    InternalError,
}

impl EndReason {
    pub fn hunter_won(self) -> bool {
        matches!(self, EndReason::AllTargetsEliminated)
    }
}

/// Terminal result of a match, produced exactly once per match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub reason: EndReason,
    pub hunter_won: bool,
}

/// Returned by a successful start
#[derive(Debug, Clone)]
pub struct MatchStart {
    pub hunter_id: Uuid,
    pub timer: f32,
    pub rules: RuleSet,
    pub obstacles: Vec<Obstacle>,
}

/// Everything one tick produced
#[derive(Debug, Default)]
pub struct TickOutput {
    pub events: Vec<GameEvent>,
    pub ended: Option<MatchOutcome>,
}

/// Rejected host requests
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("Only the host can do that")]
    NotHost,

    #[error("Not allowed while the match is {0:?}")]
    WrongPhase(MatchPhase),

    #[error("Need at least {need} players, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },
}

impl MatchError {
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::NotHost => "not_host",
            MatchError::WrongPhase(_) => "wrong_phase",
            MatchError::NotEnoughPlayers { .. } => "not_enough_players",
        }
    }
}

/// Match state (owned by the tick loop)
pub struct MatchState {
    pub code: String,
    pub seed: u64,
    pub phase: MatchPhase,
    pub tick: u64,
    /// Seconds left in the match
    pub timer: f32,
    pub players: Vec<Player>,
    pub npcs: Vec<Npc>,
    pub projectiles: Vec<Projectile>,
    pub obstacles: Vec<Obstacle>,
    /// Rules used when the host does not override them
    pub default_rules: RuleSet,
    /// Rules of the current (or last) match
    pub rules: RuleSet,
    pub tuning: Tuning,
    pub rng: ChaCha8Rng,
    hiders_at_start: usize,
    next_projectile_id: u32,
    /// Events raised between ticks, handed out by the next tick
    pending_events: Vec<GameEvent>,
}

impl MatchState {
    pub fn new(code: String, seed: u64, default_rules: RuleSet, tuning: Tuning) -> Self {
        Self {
            code,
            seed,
            phase: MatchPhase::Lobby,
            tick: 0,
            timer: 0.0,
            players: Vec::new(),
            npcs: Vec::new(),
            projectiles: Vec::new(),
            obstacles: Vec::new(),
            default_rules,
            rules: default_rules,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            hiders_at_start: 0,
            next_projectile_id: 0,
            pending_events: Vec::new(),
        }
    }

    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn hunter(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_hunter())
    }

    pub fn live_hiders(&self) -> usize {
        self.players.iter().filter(|p| p.is_live_hider()).count()
    }

    pub fn is_host(&self, id: Uuid) -> bool {
        self.player(id).is_some_and(|p| p.host)
    }

    /// Register a connected player. The first joiner becomes host; players
    /// joining a running match spectate until the next one.
    pub fn add_player(&mut self, id: Uuid, name: String) -> &Player {
        let planner = SpawnPlanner::new(&self.tuning, &self.obstacles);
        let (x, y) = planner.place(&mut self.rng, self.tuning.entity_radius, None);
        let color = PALETTE[self.rng.gen_range(0..PALETTE.len())];

        let mut player = Player::new(id, name, color, x, y);
        player.host = self.players.is_empty();
        if self.phase == MatchPhase::Playing {
            player.alive = false;
        }

        info!(
            room = %self.code,
            player_id = %id,
            host = player.host,
            player_count = self.players.len() + 1,
            "Player joined room"
        );

        self.players.push(player);
        &self.players[self.players.len() - 1]
    }

    /// Remove a player. Returns the outcome if the removal ended the match.
    pub fn remove_player(&mut self, id: Uuid) -> Option<MatchOutcome> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        let removed = self.players.remove(idx);

        if removed.host {
            if let Some(next) = self.players.first_mut() {
                next.host = true;
                info!(room = %self.code, player_id = %next.id, "Host reassigned");
            }
        }

        info!(
            room = %self.code,
            player_id = %id,
            player_count = self.players.len(),
            "Player left room"
        );

        if self.phase != MatchPhase::Playing {
            return None;
        }

        if self.players.len() < MIN_PLAYERS {
            Some(self.end(EndReason::NotEnoughPlayers))
        } else if removed.is_hunter() {
            Some(self.end(EndReason::HunterLeft))
        } else {
            None
        }
    }

    /// Buffer the latest intent; unknown players are ignored
    pub fn set_input(&mut self, id: Uuid, input: TickInput) {
        match self.player_mut(id) {
            Some(player) => player.input = input,
            None => debug!(player_id = %id, "Input from unknown player ignored"),
        }
    }

    /// Lobby -> Playing
    pub fn start_match(
        &mut self,
        requester: Uuid,
        overrides: Option<&RuleOverrides>,
    ) -> Result<MatchStart, MatchError> {
        if self.phase != MatchPhase::Lobby {
            return Err(MatchError::WrongPhase(self.phase));
        }
        if !self.is_host(requester) {
            return Err(MatchError::NotHost);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(MatchError::NotEnoughPlayers {
                have: self.players.len(),
                need: MIN_PLAYERS,
            });
        }

        self.rules = match overrides {
            Some(o) => self.default_rules.with_overrides(o),
            None => self.default_rules,
        };
        self.obstacles = if self.rules.obstacles {
            generate_obstacles(&mut self.rng, &self.tuning)
        } else {
            Vec::new()
        };

        let player_count = self.players.len();
        let hiders = player_count - 1;
        let hunter_idx = self.rng.gen_range(0..player_count);
        let budget = self.tuning.hunter_budget(&self.rules, hiders);
        let radius = self.tuning.entity_radius;

        let planner = SpawnPlanner::new(&self.tuning, &self.obstacles);
        let (hx, hy) = planner.place(&mut self.rng, radius, None);
        let avoid = Avoid {
            x: hx,
            y: hy,
            min_distance: self.rules.hider_min_distance,
        };

        for (idx, player) in self.players.iter_mut().enumerate() {
            if idx == hunter_idx {
                player.reset_for_match(Role::Hunter, hx, hy, budget);
            } else {
                let (x, y) = planner.place(&mut self.rng, radius, Some(avoid));
                player.reset_for_match(Role::Hider, x, y, 0);
            }
        }

        let npc_count = self.tuning.npc_count(player_count);
        self.npcs = (0..npc_count as u32)
            .map(|id| {
                let (x, y) = planner.place(&mut self.rng, radius, None);
                let color = PALETTE[self.rng.gen_range(0..PALETTE.len())];
                let mut npc = Npc::new(id, x, y, color);
                NpcController::redraw(&mut npc, &mut self.rng, &self.tuning);
                npc
            })
            .collect();

        self.projectiles.clear();
        self.next_projectile_id = 0;
        self.hiders_at_start = hiders;
        self.timer = self.tuning.match_duration(hiders);
        self.phase = MatchPhase::Playing;

        let hunter_id = self.players[hunter_idx].id;
        self.pending_events.push(GameEvent::Msg {
            text: format!("{} is the hunter!", self.players[hunter_idx].name),
        });
        self.pending_events.push(GameEvent::Sound { cue: "start" });

        info!(
            room = %self.code,
            hunter_id = %hunter_id,
            seed = self.seed,
            players = player_count,
            npcs = npc_count,
            timer = self.timer,
            fire_mode = ?self.rules.fire_mode,
            "Match started"
        );

        Ok(MatchStart {
            hunter_id,
            timer: self.timer,
            rules: self.rules,
            obstacles: self.obstacles.clone(),
        })
    }

    /// Ended -> Lobby
    pub fn return_to_lobby(&mut self, requester: Uuid) -> Result<(), MatchError> {
        if self.phase != MatchPhase::Ended {
            return Err(MatchError::WrongPhase(self.phase));
        }
        if !self.is_host(requester) {
            return Err(MatchError::NotHost);
        }

        self.npcs.clear();
        self.projectiles.clear();
        self.obstacles.clear();
        self.timer = 0.0;
        self.hiders_at_start = 0;

        let planner = SpawnPlanner::new(&self.tuning, &self.obstacles);
        for player in self.players.iter_mut() {
            let (x, y) = planner.place(&mut self.rng, self.tuning.entity_radius, None);
            player.reset_for_match(Role::Spectator, x, y, 0);
        }

        self.phase = MatchPhase::Lobby;
        info!(room = %self.code, "Room returned to lobby");
        Ok(())
    }

    /// Advance the room by one fixed step.
    ///
    /// Only a `Playing` match is mutated. The order is fixed: timer and
    /// cooldowns, players, NPCs, projectiles, then win conditions, so every
    /// effect is visible in this tick's snapshot.
    pub fn tick(&mut self, dt: f32) -> TickOutput {
        self.tick += 1;
        let mut output = TickOutput {
            events: std::mem::take(&mut self.pending_events),
            ended: None,
        };

        if self.phase != MatchPhase::Playing {
            return output;
        }

        self.timer = (self.timer - dt).max(0.0);
        for player in self.players.iter_mut() {
            player.fire_cooldown = CombatSystem::update_cooldown(player.fire_cooldown, dt);
        }

        self.update_players(dt, &mut output.events);
        self.update_npcs(dt);
        self.update_projectiles(dt, &mut output.events);
        output.ended = self.check_win_condition();

        output
    }

    fn update_players(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let obstacles: &[Obstacle] = &self.obstacles;
        for player in self.players.iter_mut() {
            if player.alive {
                player.slot = player.input.slot;
            }
            PhysicsSystem::move_player(player, &self.tuning, obstacles, dt);
        }

        let Some(idx) = self.players.iter().position(|p| p.is_hunter()) else {
            return;
        };
        let shoot = self.players[idx].input.shoot;
        let pressed = shoot && !self.players[idx].shoot_held;
        self.players[idx].shoot_held = shoot;
        if !shoot {
            return;
        }

        // The weapon repeats while held; the marker needs a fresh press
        if CombatSystem::can_fire(&self.players[idx], &self.rules) {
            let id = self.next_projectile_id;
            self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
            let projectile =
                CombatSystem::fire(&mut self.players[idx], &self.rules, &self.tuning, id);
            self.projectiles.push(projectile);
            events.push(GameEvent::Sound { cue: "shot" });
        } else if pressed && CombatSystem::can_mark(&self.players[idx]) {
            let (aim_x, aim_y) = (self.players[idx].input.aim_x, self.players[idx].input.aim_y);
            self.players[idx].fire_cooldown = self.tuning.mark_cooldown;
            let target = CombatSystem::mark(
                aim_x,
                aim_y,
                &mut self.npcs,
                &mut self.players,
                &self.tuning,
            );
            if target.is_some() {
                events.push(GameEvent::Sound { cue: "mark" });
            }
        }
    }

    fn update_npcs(&mut self, dt: f32) {
        for npc in self.npcs.iter_mut() {
            NpcController::update(npc, &mut self.rng, &self.tuning, &self.obstacles, dt);
        }
    }

    fn update_projectiles(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let hits = CombatSystem::resolve_projectiles(
            &mut self.projectiles,
            &mut self.npcs,
            &mut self.players,
            &self.obstacles,
            &self.tuning,
            dt,
        );

        for hit in hits {
            self.apply_hit(&hit, events);
        }
    }

    fn apply_hit(&mut self, hit: &HitResult, events: &mut Vec<GameEvent>) {
        events.push(GameEvent::Kill {
            x: hit.x as i32,
            y: hit.y as i32,
            color: hit.color,
        });

        match hit.target {
            Target::Npc(idx) => {
                debug!(
                    room = %self.code,
                    projectile_id = hit.projectile_id,
                    npc_id = self.npcs.get(idx).map(|n| n.id),
                    "Civilian hit"
                );
                let line = NPC_KILL_LINES[self.rng.gen_range(0..NPC_KILL_LINES.len())];
                events.push(GameEvent::Msg {
                    text: line.to_string(),
                });
                events.push(GameEvent::Shake { magnitude: 4.0 });
                events.push(GameEvent::Sound { cue: "kill" });

                if self.rules.casualty_penalty {
                    let shooter = hit.shooter_id;
                    if let Some(hunter) = self.player_mut(shooter) {
                        hunter.ammo = hunter.ammo.saturating_sub(1);
                    }
                    let text = if self.rules.counts_casualties() {
                        "Civilian casualty! You lost a life."
                    } else {
                        "Civilian casualty! That cost you a round."
                    };
                    events.push(GameEvent::Msg {
                        text: text.to_string(),
                    });
                }
            }
            Target::Player(id) => {
                let name = self.player(id).map(|p| p.name.clone()).unwrap_or_default();
                events.push(GameEvent::Msg {
                    text: format!("Target eliminated: {name}"),
                });
                events.push(GameEvent::Shake { magnitude: 10.0 });
                events.push(GameEvent::Sound { cue: "eliminated" });
                info!(
                    room = %self.code,
                    player_id = %id,
                    projectile_id = hit.projectile_id,
                    "Hider eliminated"
                );
            }
        }
    }

    /// Ending conditions, in priority order
    fn check_win_condition(&mut self) -> Option<MatchOutcome> {
        if self.phase != MatchPhase::Playing {
            return None;
        }

        if self.hiders_at_start > 0 && self.live_hiders() == 0 {
            return Some(self.end(EndReason::AllTargetsEliminated));
        }

        if self.timer <= 0.0 {
            return Some(self.end(EndReason::TimeExpired));
        }

        let budget_spent = self.hunter().is_some_and(|h| h.ammo == 0);
        if budget_spent {
            if self.rules.counts_casualties() {
                return Some(self.end(EndReason::TooManyCasualties));
            }
            if self.rules.fire_mode == FireMode::LimitedAmmo && self.projectiles.is_empty() {
                return Some(self.end(EndReason::OutOfAmmo));
            }
        }

        None
    }

    /// Force the match into `Ended`. Used by win checks and disconnects.
    pub fn end(&mut self, reason: EndReason) -> MatchOutcome {
        let outcome = MatchOutcome {
            reason,
            hunter_won: reason.hunter_won(),
        };
        self.phase = MatchPhase::Ended;
        self.projectiles.clear();
        for player in self.players.iter_mut() {
            player.input = TickInput::default();
        }

        info!(
            room = %self.code,
            reason = ?reason,
            hunter_won = outcome.hunter_won,
            tick = self.tick,
            "Match ended"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Slot;
    use crate::game::rules::FireMode;

    const DT: f32 = 1.0 / 30.0;

    fn room_with(players: usize, rules: RuleSet) -> (MatchState, Vec<Uuid>) {
        let mut state = MatchState::new("test".into(), 42, rules, Tuning::default());
        let ids: Vec<Uuid> = (0..players).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            state.add_player(*id, format!("p{i}"));
        }
        (state, ids)
    }

    fn started(players: usize, rules: RuleSet) -> (MatchState, Vec<Uuid>) {
        let (mut state, ids) = room_with(players, rules);
        state.start_match(ids[0], None).unwrap();
        (state, ids)
    }

    fn hunter_id(state: &MatchState) -> Uuid {
        state.hunter().map(|h| h.id).unwrap()
    }

    fn first_hider_id(state: &MatchState) -> Uuid {
        state
            .players
            .iter()
            .find(|p| p.role == Role::Hider)
            .map(|p| p.id)
            .unwrap()
    }

    fn place(state: &mut MatchState, id: Uuid, x: f32, y: f32) {
        let p = state.player_mut(id).unwrap();
        p.x = x;
        p.y = y;
    }

    #[test]
    fn first_joiner_is_host() {
        let (state, ids) = room_with(3, RuleSet::default());
        assert!(state.is_host(ids[0]));
        assert!(!state.is_host(ids[1]));
        assert_eq!(state.phase, MatchPhase::Lobby);
        assert!(state.hunter().is_none());
    }

    #[test]
    fn start_requires_host_and_two_players() {
        let (mut state, ids) = room_with(1, RuleSet::default());
        assert_eq!(
            state.start_match(ids[0], None).unwrap_err(),
            MatchError::NotEnoughPlayers { have: 1, need: 2 }
        );
        assert_eq!(state.phase, MatchPhase::Lobby);

        let other = Uuid::new_v4();
        state.add_player(other, "b".into());
        assert_eq!(state.start_match(other, None).unwrap_err(), MatchError::NotHost);
        assert_eq!(state.phase, MatchPhase::Lobby);

        state.start_match(ids[0], None).unwrap();
        assert_eq!(
            state.start_match(ids[0], None).unwrap_err(),
            MatchError::WrongPhase(MatchPhase::Playing)
        );
    }

    #[test]
    fn start_assigns_exactly_one_hunter() {
        for seed in 0..20 {
            let mut state = MatchState::new("t".into(), seed, RuleSet::default(), Tuning::default());
            let host = Uuid::new_v4();
            state.add_player(host, "host".into());
            for i in 0..4 {
                state.add_player(Uuid::new_v4(), format!("p{i}"));
            }
            state.start_match(host, None).unwrap();

            let hunters = state.players.iter().filter(|p| p.is_hunter()).count();
            let hiders = state.players.iter().filter(|p| p.role == Role::Hider).count();
            assert_eq!(hunters, 1);
            assert_eq!(hiders, 4);
            assert_eq!(state.npcs.len(), state.tuning.npc_count(5));
            assert_eq!(state.timer, state.tuning.match_duration(4));
            assert_eq!(state.hunter().unwrap().ammo, 6);
        }
    }

    #[test]
    fn hiders_spawn_away_from_hunter() {
        let (state, _) = started(4, RuleSet::default());
        let hunter = state.hunter().unwrap();
        for hider in state.players.iter().filter(|p| p.role == Role::Hider) {
            let d = ((hider.x - hunter.x).powi(2) + (hider.y - hunter.y).powi(2)).sqrt();
            assert!(d >= state.rules.hider_min_distance);
        }
    }

    #[test]
    fn overrides_select_rules_at_start() {
        let (mut state, ids) = room_with(2, RuleSet::default());
        let overrides = RuleOverrides {
            fire_mode: Some(FireMode::CooldownOnly),
            obstacles: Some(true),
            ..RuleOverrides::default()
        };
        let start = state.start_match(ids[0], Some(&overrides)).unwrap();
        assert_eq!(start.rules.fire_mode, FireMode::CooldownOnly);
        assert_eq!(start.obstacles.len(), state.tuning.obstacle_count);
        assert_eq!(state.default_rules, RuleSet::default());
    }

    #[test]
    fn timer_expiry_ends_with_hiders_winning() {
        let (mut state, _) = started(3, RuleSet::default());
        let duration = state.tuning.match_duration(2);
        assert_eq!(state.timer, duration);
        state.npcs.clear();

        let ticks = (duration / DT).ceil() as usize + 5;
        let mut outcome = None;
        for _ in 0..ticks {
            let out = state.tick(DT);
            if out.ended.is_some() {
                outcome = out.ended;
                break;
            }
        }

        let outcome = outcome.expect("match should end");
        assert_eq!(outcome.reason, EndReason::TimeExpired);
        assert!(!outcome.hunter_won);
        assert_eq!(state.phase, MatchPhase::Ended);
    }

    #[test]
    fn all_targets_eliminated_beats_time_expired() {
        let (mut state, _) = started(3, RuleSet::default());
        for p in state.players.iter_mut().filter(|p| p.role == Role::Hider) {
            p.alive = false;
        }
        state.timer = 0.0;

        let out = state.tick(DT);
        assert_eq!(
            out.ended,
            Some(MatchOutcome {
                reason: EndReason::AllTargetsEliminated,
                hunter_won: true,
            })
        );
    }

    #[test]
    fn hunter_shot_eliminates_hider() {
        let (mut state, _) = started(2, RuleSet::default());
        state.npcs.clear();
        let hunter = hunter_id(&state);
        let hider = first_hider_id(&state);
        place(&mut state, hunter, 400.0, 400.0);
        place(&mut state, hider, 490.0, 400.0);

        state.set_input(
            hunter,
            TickInput {
                shoot: true,
                aim_x: 490.0,
                aim_y: 400.0,
                ..TickInput::default()
            },
        );
        let ammo_before = state.hunter().unwrap().ammo;

        let out = state.tick(DT);
        assert!(out.events.contains(&GameEvent::Sound { cue: "shot" }));
        assert_eq!(state.hunter().unwrap().ammo, ammo_before - 1);

        let mut dead_at = None;
        for i in 0..5 {
            if !state.player(hider).unwrap().alive {
                dead_at = Some(i);
                break;
            }
            state.tick(DT);
        }
        assert!(dead_at.is_some());
        assert!(!state.player(hider).unwrap().alive);
    }

    #[test]
    fn shot_lands_at_minimum_tick_rate() {
        use crate::util::time::{clamp_tick_rate, tick_delta};

        let dt = tick_delta(clamp_tick_rate(1));
        let (mut state, _) = started(2, RuleSet::default());
        state.npcs.clear();
        let hunter = hunter_id(&state);
        let hider = first_hider_id(&state);
        place(&mut state, hunter, 400.0, 400.0);
        place(&mut state, hider, 460.0, 400.0);
        state.set_input(
            hunter,
            TickInput {
                shoot: true,
                aim_x: 460.0,
                aim_y: 400.0,
                ..TickInput::default()
            },
        );

        state.tick(dt);
        state.set_input(hunter, TickInput::default());
        for _ in 0..20 {
            if !state.player(hider).unwrap().alive {
                break;
            }
            state.tick(dt);
        }
        assert!(!state.player(hider).unwrap().alive);
    }

    #[test]
    fn hit_is_visible_in_same_tick_events() {
        let (mut state, _) = started(2, RuleSet::default());
        state.npcs.clear();
        let hunter = hunter_id(&state);
        let hider = first_hider_id(&state);
        place(&mut state, hunter, 400.0, 400.0);
        place(&mut state, hider, 410.0, 400.0);
        state.set_input(
            hunter,
            TickInput {
                shoot: true,
                aim_x: 410.0,
                aim_y: 400.0,
                ..TickInput::default()
            },
        );

        let out = state.tick(DT);
        assert!(!state.player(hider).unwrap().alive);
        assert!(out.events.contains(&GameEvent::Sound { cue: "eliminated" }));
        assert!(out
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::Kill { .. })));
    }

    #[test]
    fn out_of_ammo_waits_for_projectiles() {
        let (mut state, _) = started(3, RuleSet::default());
        state.npcs.clear();
        let hunter = hunter_id(&state);
        place(&mut state, hunter, 800.0, 600.0);
        for p in state.players.iter_mut().filter(|p| p.role == Role::Hider) {
            p.x = 100.0;
            p.y = 100.0;
        }
        state.player_mut(hunter).unwrap().ammo = 1;
        state.set_input(
            hunter,
            TickInput {
                shoot: true,
                aim_x: 1500.0,
                aim_y: 600.0,
                ..TickInput::default()
            },
        );

        let out = state.tick(DT);
        assert!(out.ended.is_none());
        assert_eq!(state.projectiles.len(), 1);

        let mut ended = None;
        for _ in 0..60 {
            let out = state.tick(DT);
            if out.ended.is_some() {
                ended = out.ended;
                break;
            }
        }
        assert_eq!(ended.map(|o| o.reason), Some(EndReason::OutOfAmmo));
        assert_eq!(ended.map(|o| o.hunter_won), Some(false));
    }

    #[test]
    fn casualty_penalty_ends_match() {
        let rules = RuleSet {
            fire_mode: FireMode::CooldownOnly,
            casualty_penalty: true,
            ..RuleSet::default()
        };
        let (mut state, _) = started(2, rules);
        let hunter = hunter_id(&state);
        let hider = first_hider_id(&state);
        place(&mut state, hunter, 400.0, 400.0);
        place(&mut state, hider, 1500.0, 1100.0);
        state.player_mut(hunter).unwrap().ammo = 1;
        state.npcs.truncate(1);
        state.npcs[0].x = 420.0;
        state.npcs[0].y = 400.0;
        state.npcs[0].intent_x = 0;
        state.npcs[0].intent_y = 0;
        state.npcs[0].intent_timer = 10.0;
        state.set_input(
            hunter,
            TickInput {
                shoot: true,
                aim_x: 420.0,
                aim_y: 400.0,
                ..TickInput::default()
            },
        );

        let out = state.tick(DT);
        assert!(!state.npcs[0].alive);
        assert_eq!(
            out.ended.map(|o| o.reason),
            Some(EndReason::TooManyCasualties)
        );
    }

    #[test]
    fn marker_slot_marks_instead_of_firing() {
        let (mut state, _) = started(2, RuleSet::default());
        let hunter = hunter_id(&state);
        state.npcs.truncate(1);
        state.npcs[0].x = 700.0;
        state.npcs[0].y = 700.0;
        state.npcs[0].intent_x = 0;
        state.npcs[0].intent_y = 0;
        state.npcs[0].intent_timer = 100.0;
        state.set_input(
            hunter,
            TickInput {
                shoot: true,
                slot: Slot::Marker,
                aim_x: 700.0,
                aim_y: 700.0,
                ..TickInput::default()
            },
        );

        state.tick(DT);
        assert_eq!(state.player(hunter).unwrap().slot, Slot::Marker);
        assert!(state.projectiles.is_empty());
        assert_eq!(state.npcs[0].mark.value(), 1);
    }

    #[test]
    fn held_marker_marks_once_per_press() {
        let (mut state, _) = started(2, RuleSet::default());
        let hunter = hunter_id(&state);
        state.npcs.truncate(1);
        state.npcs[0].x = 700.0;
        state.npcs[0].y = 700.0;
        state.npcs[0].intent_x = 0;
        state.npcs[0].intent_y = 0;
        state.npcs[0].intent_timer = 100.0;
        let held = TickInput {
            shoot: true,
            slot: Slot::Marker,
            aim_x: 700.0,
            aim_y: 700.0,
            ..TickInput::default()
        };

        // One second of holding spans several mark cooldowns
        state.set_input(hunter, held);
        for _ in 0..30 {
            state.tick(DT);
        }
        assert_eq!(state.npcs[0].mark.value(), 1);

        state.set_input(
            hunter,
            TickInput {
                shoot: false,
                ..held
            },
        );
        state.tick(DT);
        state.set_input(hunter, held);
        state.tick(DT);
        assert_eq!(state.npcs[0].mark.value(), 2);
    }

    #[test]
    fn last_hider_leaving_ends_match() {
        let (mut state, ids) = started(2, RuleSet::default());
        let hider = first_hider_id(&state);
        let outcome = state.remove_player(hider).unwrap();
        assert_eq!(outcome.reason, EndReason::NotEnoughPlayers);
        assert!(!outcome.hunter_won);
        assert_eq!(state.phase, MatchPhase::Ended);
        assert!(ids.contains(&hider));
    }

    #[test]
    fn host_moves_on_disconnect() {
        let (mut state, ids) = room_with(3, RuleSet::default());
        assert!(state.remove_player(ids[0]).is_none());
        assert!(state.is_host(ids[1]));
        assert_eq!(state.players.iter().filter(|p| p.host).count(), 1);
    }

    #[test]
    fn hunter_leaving_ends_match() {
        let (mut state, _) = started(3, RuleSet::default());
        let hunter = hunter_id(&state);
        let outcome = state.remove_player(hunter).unwrap();
        assert_eq!(outcome.reason, EndReason::HunterLeft);
        assert!(state.hunter().is_none());
    }

    #[test]
    fn ended_match_is_frozen_until_reset() {
        let (mut state, ids) = started(3, RuleSet::default());
        state.end(EndReason::TimeExpired);
        let positions: Vec<(f32, f32)> = state.npcs.iter().map(|n| (n.x, n.y)).collect();

        for _ in 0..10 {
            let out = state.tick(DT);
            assert!(out.ended.is_none());
        }
        let after: Vec<(f32, f32)> = state.npcs.iter().map(|n| (n.x, n.y)).collect();
        assert_eq!(positions, after);

        assert_eq!(state.return_to_lobby(ids[1]).unwrap_err(), MatchError::NotHost);
        state.return_to_lobby(ids[0]).unwrap();
        assert_eq!(state.phase, MatchPhase::Lobby);
        assert!(state.npcs.is_empty());
        assert!(state.players.iter().all(|p| p.role == Role::Spectator && p.alive));
    }

    #[test]
    fn late_joiner_spectates() {
        let (mut state, _) = started(2, RuleSet::default());
        let late = Uuid::new_v4();
        let player = state.add_player(late, "late".into());
        assert_eq!(player.role, Role::Spectator);
        assert!(!player.alive);
    }

    #[test]
    fn pending_events_are_drained_once() {
        let (mut state, _) = started(2, RuleSet::default());
        let first = state.tick(DT);
        assert!(first.events.contains(&GameEvent::Sound { cue: "start" }));
        let second = state.tick(DT);
        assert!(!second.events.contains(&GameEvent::Sound { cue: "start" }));
    }

    #[test]
    fn entities_stay_in_field() {
        let (mut state, _) = started(4, RuleSet::default());
        let ids: Vec<Uuid> = state.players.iter().map(|p| p.id).collect();
        for (i, id) in ids.iter().enumerate() {
            state.set_input(
                *id,
                TickInput {
                    dx: if i % 2 == 0 { -1.0 } else { 1.0 },
                    dy: if i < 2 { -1.0 } else { 1.0 },
                    sprint: true,
                    ..TickInput::default()
                },
            );
        }

        let r = state.tuning.entity_radius;
        for _ in 0..600 {
            state.tick(DT);
            for (x, y) in state
                .players
                .iter()
                .map(|p| (p.x, p.y))
                .chain(state.npcs.iter().map(|n| (n.x, n.y)))
            {
                assert!(x >= r && x <= state.tuning.field_width - r);
                assert!(y >= r && y <= state.tuning.field_height - r);
            }
        }
    }

    #[test]
    fn same_seed_replays_identically() {
        let run = || {
            let mut state = MatchState::new("r".into(), 9, RuleSet::default(), Tuning::default());
            let a = Uuid::from_u128(1);
            let b = Uuid::from_u128(2);
            state.add_player(a, "a".into());
            state.add_player(b, "b".into());
            state.start_match(a, None).unwrap();
            for _ in 0..90 {
                state.tick(DT);
            }
            state.npcs.iter().map(|n| (n.x, n.y)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
