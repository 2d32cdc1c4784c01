//! Fixed-rate tick loop over every room
//!
//! `GameServer` owns the room store and is the only writer of simulation
//! state. Connections talk to it through `ServerHandle`; commands are drained
//! at each tick boundary, so network tasks never mutate a room directly.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::util::time::{tick_delta, tick_duration};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::directory::{RoomDirectory, RoomSummary};
use super::r#match::{EndReason, MatchOutcome, MatchPhase, MatchState};
use super::rules::{RuleSet, Tuning};
use super::snapshot::SnapshotBuilder;
use super::TickInput;

const COMMAND_BUFFER: usize = 1024;
const FEED_BUFFER: usize = 64;

/// Settings shared by every room
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub tick_rate: u32,
    pub default_rules: RuleSet,
    pub tuning: Tuning,
    pub max_players: usize,
}

/// Join rejections
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("Room is full")]
    RoomFull,

    #[error("Game server is not running")]
    Closed,
}

impl JoinError {
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::RoomFull => "room_full",
            JoinError::Closed => "unavailable",
        }
    }
}

pub type JoinReply = Result<broadcast::Receiver<ServerMsg>, JoinError>;

/// Requests from connections to the tick loop
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        room: String,
        player_id: Uuid,
        name: String,
        /// Messages addressed only to this connection
        outbox: mpsc::Sender<ServerMsg>,
        reply: oneshot::Sender<JoinReply>,
    },
    Message {
        room: String,
        player_id: Uuid,
        msg: ClientMsg,
    },
    Leave {
        room: String,
        player_id: Uuid,
    },
}

impl RoomCommand {
    fn room(&self) -> &str {
        match self {
            RoomCommand::Join { room, .. }
            | RoomCommand::Message { room, .. }
            | RoomCommand::Leave { room, .. } => room,
        }
    }
}

/// Cloneable sender side of the tick loop
#[derive(Clone)]
pub struct ServerHandle {
    tx: mpsc::Sender<RoomCommand>,
}

impl ServerHandle {
    /// Register a player and get the room's broadcast feed
    pub async fn join(
        &self,
        room: String,
        player_id: Uuid,
        name: String,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> JoinReply {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(RoomCommand::Join {
                room,
                player_id,
                name,
                outbox,
                reply,
            })
            .await
            .map_err(|_| JoinError::Closed)?;
        response.await.map_err(|_| JoinError::Closed)?
    }

    /// Forward a client message; returns false once the loop is gone
    pub async fn send(&self, room: &str, player_id: Uuid, msg: ClientMsg) -> bool {
        self.tx
            .send(RoomCommand::Message {
                room: room.to_string(),
                player_id,
                msg,
            })
            .await
            .is_ok()
    }

    pub async fn leave(&self, room: &str, player_id: Uuid) {
        let _ = self
            .tx
            .send(RoomCommand::Leave {
                room: room.to_string(),
                player_id,
            })
            .await;
    }
}

/// One room plus its outbound channels
struct RoomSlot {
    state: MatchState,
    feed: broadcast::Sender<ServerMsg>,
    outboxes: HashMap<Uuid, mpsc::Sender<ServerMsg>>,
}

impl RoomSlot {
    fn broadcast(&self, msg: ServerMsg) {
        // No subscribers is fine
        let _ = self.feed.send(msg);
    }

    fn send_to(&self, player_id: Uuid, msg: ServerMsg) {
        if let Some(outbox) = self.outboxes.get(&player_id) {
            if outbox.try_send(msg).is_err() {
                warn!(room = %self.state.code, player_id = %player_id, "Direct message dropped");
            }
        }
    }

    fn announce_end(&self, outcome: MatchOutcome) {
        self.broadcast(ServerMsg::MatchEnded {
            reason: outcome.reason,
            hunter_won: outcome.hunter_won,
        });
    }
}

/// The authoritative tick loop
pub struct GameServer {
    rooms: HashMap<String, RoomSlot>,
    commands: mpsc::Receiver<RoomCommand>,
    directory: Arc<RoomDirectory>,
    settings: ServerSettings,
}

impl GameServer {
    pub fn new(settings: ServerSettings, directory: Arc<RoomDirectory>) -> (Self, ServerHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let server = Self {
            rooms: HashMap::new(),
            commands,
            directory,
            settings,
        };
        (server, ServerHandle { tx })
    }

    /// Run until every `ServerHandle` is dropped
    pub async fn run(mut self) {
        info!(tick_rate = self.settings.tick_rate, "Tick loop started");

        let mut tick_interval = interval(tick_duration(self.settings.tick_rate));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let dt = tick_delta(self.settings.tick_rate);

        loop {
            tick_interval.tick().await;

            if !self.drain_commands() {
                break;
            }
            self.tick_rooms(dt);
        }

        info!("Tick loop stopped");
    }

    /// Apply queued commands. Returns false when no handles remain.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Apply one command. A panic while handling it closes that room only.
    fn handle_command(&mut self, command: RoomCommand) {
        let room = command.room().to_string();
        let result = catch_unwind(AssertUnwindSafe(|| self.dispatch(command)));
        if result.is_err() {
            error!(room = %room, "Room command panicked, closing room");
            self.close_faulted(&room);
        }
    }

    fn dispatch(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                room,
                player_id,
                name,
                outbox,
                reply,
            } => {
                let result = self.handle_join(room, player_id, name, outbox);
                let _ = reply.send(result);
            }
            RoomCommand::Message {
                room,
                player_id,
                msg,
            } => self.handle_message(&room, player_id, msg),
            RoomCommand::Leave { room, player_id } => self.handle_leave(&room, player_id),
        }
    }

    fn handle_join(
        &mut self,
        room: String,
        player_id: Uuid,
        name: String,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> JoinReply {
        if let Some(slot) = self.rooms.get(&room) {
            if slot.state.players.len() >= self.settings.max_players {
                warn!(room = %room, player_id = %player_id, "Join rejected, room full");
                return Err(JoinError::RoomFull);
            }
        }

        let settings = &self.settings;
        let slot = self.rooms.entry(room.clone()).or_insert_with(|| {
            let seed = rand::random::<u64>();
            info!(room = %room, seed, "Room created");
            RoomSlot {
                state: MatchState::new(
                    room.clone(),
                    seed,
                    settings.default_rules,
                    settings.tuning.clone(),
                ),
                feed: broadcast::channel(FEED_BUFFER).0,
                outboxes: HashMap::new(),
            }
        });

        let host = slot.state.add_player(player_id, name.clone()).host;
        let feed = slot.feed.subscribe();
        slot.outboxes.insert(player_id, outbox);

        slot.send_to(
            player_id,
            ServerMsg::Init {
                id: player_id,
                field_width: slot.state.tuning.field_width,
                field_height: slot.state.tuning.field_height,
                obstacles: slot.state.obstacles.clone(),
                host,
            },
        );
        slot.broadcast(ServerMsg::PlayerJoined {
            id: player_id,
            name,
        });
        self.directory.publish(RoomSummary::of(&slot.state));

        Ok(feed)
    }

    fn handle_message(&mut self, room: &str, player_id: Uuid, msg: ClientMsg) {
        let Some(slot) = self.rooms.get_mut(room) else {
            debug!(room = %room, player_id = %player_id, "Message for unknown room ignored");
            return;
        };

        match msg {
            ClientMsg::Join { .. } => {
                debug!(room = %room, player_id = %player_id, "Duplicate join ignored");
            }
            ClientMsg::Input {
                dx,
                dy,
                sprint,
                shoot,
                aim_x,
                aim_y,
                slot: active_slot,
            } => {
                if slot.state.phase != MatchPhase::Playing {
                    return;
                }
                let tuning = &slot.state.tuning;
                let input = TickInput {
                    dx: finite_or_zero(dx).clamp(-1.0, 1.0),
                    dy: finite_or_zero(dy).clamp(-1.0, 1.0),
                    sprint,
                    shoot,
                    aim_x: finite_or_zero(aim_x).clamp(0.0, tuning.field_width),
                    aim_y: finite_or_zero(aim_y).clamp(0.0, tuning.field_height),
                    slot: active_slot,
                };
                slot.state.set_input(player_id, input);
            }
            ClientMsg::StartMatch { rules } => {
                match slot.state.start_match(player_id, rules.as_ref()) {
                    Ok(start) => slot.broadcast(ServerMsg::MatchStarted {
                        hunter_id: start.hunter_id,
                        timer: start.timer,
                        rules: start.rules,
                        obstacles: start.obstacles,
                    }),
                    Err(e) => {
                        warn!(room = %room, player_id = %player_id, error = %e, "Start rejected");
                        slot.send_to(
                            player_id,
                            ServerMsg::Error {
                                code: e.code().to_string(),
                                message: e.to_string(),
                            },
                        );
                    }
                }
            }
            ClientMsg::ReturnToLobby => {
                if let Err(e) = slot.state.return_to_lobby(player_id) {
                    warn!(room = %room, player_id = %player_id, error = %e, "Reset rejected");
                    slot.send_to(
                        player_id,
                        ServerMsg::Error {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        },
                    );
                }
            }
            ClientMsg::Leave => self.handle_leave(room, player_id),
        }
    }

    fn handle_leave(&mut self, room: &str, player_id: Uuid) {
        let Some(slot) = self.rooms.get_mut(room) else {
            return;
        };
        if slot.outboxes.remove(&player_id).is_none() {
            return;
        }

        let outcome = slot.state.remove_player(player_id);
        slot.broadcast(ServerMsg::PlayerLeft {
            id: player_id,
            reason: "disconnected".to_string(),
        });
        if let Some(outcome) = outcome {
            slot.announce_end(outcome);
        }

        if slot.state.players.is_empty() {
            self.rooms.remove(room);
            self.directory.remove(room);
            info!(room = %room, "Room closed");
        } else {
            self.directory.publish(RoomSummary::of(&slot.state));
        }
    }

    /// Tick every room. A panic in one room closes that room only.
    fn tick_rooms(&mut self, dt: f32) {
        let mut faulted = Vec::new();

        for (code, slot) in self.rooms.iter_mut() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                let output = slot.state.tick(dt);
                let snapshot = SnapshotBuilder::build(&slot.state, output.events);
                (snapshot, output.ended)
            }));

            match result {
                Ok((snapshot, ended)) => {
                    slot.broadcast(snapshot);
                    if let Some(outcome) = ended {
                        slot.announce_end(outcome);
                    }
                    self.directory.publish(RoomSummary::of(&slot.state));
                }
                Err(_) => {
                    error!(room = %code, tick = slot.state.tick, "Room tick panicked, closing room");
                    faulted.push(code.clone());
                }
            }
        }

        for code in faulted {
            self.close_faulted(&code);
        }
    }

    /// Drop a room whose state can no longer be trusted
    fn close_faulted(&mut self, code: &str) {
        if let Some(slot) = self.rooms.remove(code) {
            slot.announce_end(MatchOutcome {
                reason: EndReason::InternalError,
                hunter_won: false,
            });
        }
        self.directory.remove(code);
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
