//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::ServerHandle;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

const MAX_ROOM_CODE_LEN: usize = 32;
const MAX_NAME_LEN: usize = 24;
const DEFAULT_ROOM: &str = "lobby";
const OUTBOX_BUFFER: usize = 16;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub room: Option<String>,
    /// Display name; when absent the first message must be `join`
    #[serde(default)]
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let room = query
        .room
        .as_deref()
        .and_then(sanitize_room_code)
        .unwrap_or_else(|| DEFAULT_ROOM.to_string());
    let name = query.name.as_deref().and_then(sanitize_name);

    ws.on_upgrade(move |socket| handle_socket(socket, room, name, state.server))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, room: String, name: Option<String>, server: ServerHandle) {
    let player_id = Uuid::new_v4();
    info!(room = %room, player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let name = match name {
        Some(name) => name,
        None => match await_join(&mut ws_stream, player_id).await {
            Some(name) => name,
            None => {
                debug!(player_id = %player_id, "Connection closed before join");
                return;
            }
        },
    };

    let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_BUFFER);
    let feed = match server.join(room.clone(), player_id, name, outbox_tx).await {
        Ok(feed) => feed,
        Err(e) => {
            warn!(room = %room, player_id = %player_id, error = %e, "Join rejected");
            let reply = ServerMsg::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            };
            let _ = send_msg(&mut ws_sink, &reply).await;
            let _ = ws_sink.close().await;
            return;
        }
    };

    run_session(&room, player_id, ws_sink, ws_stream, feed, outbox_rx, &server).await;

    server.leave(&room, player_id).await;
    info!(room = %room, player_id = %player_id, "WebSocket connection closed");
}

/// Wait for a `join` message when the name was not in the query
async fn await_join(ws_stream: &mut WsStream, player_id: Uuid) -> Option<String> {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(ClientMsg::Join { name }) => {
                    return Some(
                        sanitize_name(&name).unwrap_or_else(|| fallback_name(player_id)),
                    );
                }
                Ok(_) => debug!(player_id = %player_id, "Message before join ignored"),
                Err(e) => warn!(player_id = %player_id, error = %e, "Failed to parse client message"),
            },
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

/// Run the WebSocket session with read/write split
async fn run_session(
    room: &str,
    player_id: Uuid,
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    mut feed: broadcast::Receiver<ServerMsg>,
    mut outbox: mpsc::Receiver<ServerMsg>,
    server: &ServerHandle,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: room feed and direct messages -> WebSocket
    let writer_room = room.to_string();
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                direct = outbox.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
                broadcast = feed.recv() => match broadcast {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            room = %writer_room,
                            player_id = %player_id,
                            lagged_count = n,
                            "Client lagged, skipping {} messages", n
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(room = %writer_room, player_id = %player_id, "Room feed closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader loop: WebSocket -> tick loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(room = %room, player_id = %player_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Leave) => {
                        info!(room = %room, player_id = %player_id, "Client left room");
                        break;
                    }
                    Ok(client_msg) => {
                        if !server.send(room, player_id, client_msg).await {
                            debug!(player_id = %player_id, "Game server channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

/// Room codes are case-insensitive alphanumerics, dashes and underscores
fn sanitize_room_code(raw: &str) -> Option<String> {
    let code: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_ROOM_CODE_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    (!code.is_empty()).then_some(code)
}

fn sanitize_name(raw: &str) -> Option<String> {
    let name: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn fallback_name(player_id: Uuid) -> String {
    format!("Player_{}", &player_id.simple().to_string()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_codes_are_normalized() {
        assert_eq!(sanitize_room_code(" Den-1 ").as_deref(), Some("den-1"));
        assert_eq!(sanitize_room_code("a b/c").as_deref(), Some("abc"));
        assert_eq!(sanitize_room_code("!!!"), None);
        assert_eq!(sanitize_room_code(&"x".repeat(100)).map(|c| c.len()), Some(MAX_ROOM_CODE_LEN));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(sanitize_name("  ada \n").as_deref(), Some("ada"));
        assert_eq!(sanitize_name("\u{7}"), None);
        assert_eq!(sanitize_name(&"n".repeat(80)).map(|n| n.chars().count()), Some(MAX_NAME_LEN));
    }

    #[test]
    fn fallback_name_uses_id_prefix() {
        let id = Uuid::new_v4();
        let name = fallback_name(id);
        assert!(name.starts_with("Player_"));
        assert_eq!(name.len(), "Player_".len() + 8);
    }
}
