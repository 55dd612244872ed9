use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use cat_mice_server::constants::GameRules;
use cat_mice_server::server_protocol::{parse_client_message, ParsedClientMessage};
use cat_mice_server::types::{Audience, Outbound};
use cat_mice_server::world::GameWorld;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Debug, Parser)]
#[command(name = "cat-mice-server", about = "Authoritative cat-and-mice game server")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8080, env = "PORT")]
    port: u16,

    /// Directory with the client bundle; autodetected when omitted.
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Fixed RNG seed for reproducible cat selection and spawn points.
    #[arg(long, env = "GAME_SEED")]
    seed: Option<u32>,
}

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    world: GameWorld,
}

impl ServerState {
    fn new(world: GameWorld) -> Self {
        Self {
            clients: HashMap::new(),
            world,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let world = GameWorld::new(GameRules::default(), seed);
    let state = Arc::new(Mutex::new(ServerState::new(world)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir(args.static_dir) {
        let index_file = static_dir.join("index.html");
        tracing::info!(root = %static_dir.to_string_lossy(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        tracing::warn!("static file root not found; serving websocket endpoint only");
        app
    };

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    tracing::info!(addr = %bind_addr, seed, "listening");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir(requested: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = requested {
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("public"), PathBuf::from("../public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let player_id = make_id("player");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(player_id.clone(), ClientContext { tx: tx.clone() });
        guard.world.connect_player(&player_id, now_ms());
        let out = guard.world.place_in_default_room(&player_id);
        deliver(&mut guard, out, QueuePolicy::DisconnectOnFull);
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &player_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &player_id, text).await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &player_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, player_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        tracing::debug!(player = player_id, "dropping unparseable message");
        return;
    };

    let mut guard = state.lock().await;
    let out = match message {
        ParsedClientMessage::TakeSeat { seat_index } => {
            guard.world.take_seat(player_id, seat_index)
        }
        ParsedClientMessage::SetHost { as_host } => guard.world.set_host(player_id, as_host),
        ParsedClientMessage::LeaveSeat => guard.world.leave_seat(player_id),
        ParsedClientMessage::StartGame => guard.world.start_game(player_id, now_ms()),
        ParsedClientMessage::Pos { x, y } => {
            guard.world.update_position(player_id, x, y, now_ms());
            Vec::new()
        }
    };
    deliver(&mut guard, out, QueuePolicy::DisconnectOnFull);
}

async fn handle_disconnect(state: SharedState, player_id: &str) {
    let mut guard = state.lock().await;
    guard.clients.remove(player_id);
    let out = guard.world.disconnect_player(player_id);
    deliver(&mut guard, out, QueuePolicy::DropOnFull);
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let tick_ms = state.lock().await.world.rules().tick_ms;
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            let out = guard.world.tick(now_ms());
            deliver(&mut guard, out, QueuePolicy::DropOnFull);
        }
    });
}

/// Fans world notifications out to sockets. `Audience::Room` expands to the
/// room's current members at delivery time.
fn deliver(state: &mut ServerState, outbound: Vec<Outbound>, policy: QueuePolicy) {
    let mut failed = Vec::new();
    for Outbound { to, event } in outbound {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, "failed to encode server event");
                continue;
            }
        };

        let targets = match to {
            Audience::Player(id) => vec![id],
            Audience::Room(room_id) => state.world.member_ids(&room_id),
        };

        for target in targets {
            let Some(client) = state.clients.get(&target) else {
                continue;
            };
            if client
                .tx
                .try_send(OutboundMessage::Text(payload.clone()))
                .is_err()
                && policy == QueuePolicy::DisconnectOnFull
                && !failed.contains(&target)
            {
                failed.push(target);
            }
        }
    }

    for player_id in failed {
        disconnect_client_internal(state, &player_id);
    }
}

fn disconnect_client_internal(state: &mut ServerState, player_id: &str) {
    let Some(client) = state.clients.remove(player_id) else {
        return;
    };
    let _ = client.tx.try_send(OutboundMessage::Close {
        code: 1011,
        reason: "send queue overflow".to_string(),
    });
    tracing::warn!(player = player_id, "disconnecting slow client");
    let out = state.world.disconnect_player(player_id);
    deliver(state, out, QueuePolicy::DropOnFull);
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use cat_mice_server::types::ServerEvent;

    fn state_with_members(ids: &[&str], queue_capacity: usize) -> (ServerState, Vec<mpsc::Receiver<OutboundMessage>>) {
        let mut state = ServerState::new(GameWorld::new(GameRules::default(), 1));
        let mut receivers = Vec::new();
        for id in ids {
            let (tx, rx) = mpsc::channel(queue_capacity);
            state.clients.insert(id.to_string(), ClientContext { tx });
            state.world.connect_player(id, 0);
            state.world.place_in_default_room(id);
            receivers.push(rx);
        }
        (state, receivers)
    }

    fn recv_text(rx: &mut mpsc::Receiver<OutboundMessage>) -> Option<String> {
        match rx.try_recv() {
            Ok(OutboundMessage::Text(payload)) => Some(payload),
            _ => None,
        }
    }

    #[test]
    fn room_events_reach_every_member() {
        let (mut state, mut receivers) = state_with_members(&["player_1", "player_2"], 4);
        deliver(
            &mut state,
            vec![Outbound::to_room(
                "LOBBY",
                ServerEvent::RoomError {
                    message: "test".to_string(),
                },
            )],
            QueuePolicy::DropOnFull,
        );

        for rx in &mut receivers {
            let payload = recv_text(rx).expect("member should receive room event");
            assert!(payload.contains("\"type\":\"room-error\""));
        }
    }

    #[test]
    fn player_events_reach_only_the_target() {
        let (mut state, mut receivers) = state_with_members(&["player_1", "player_2"], 4);
        deliver(
            &mut state,
            vec![Outbound::to_player(
                "player_2",
                ServerEvent::RoomError {
                    message: "just you".to_string(),
                },
            )],
            QueuePolicy::DropOnFull,
        );

        assert!(recv_text(&mut receivers[0]).is_none());
        assert!(recv_text(&mut receivers[1]).is_some());
    }

    #[test]
    fn drop_policy_keeps_slow_clients_connected() {
        let (mut state, _receivers) = state_with_members(&["player_1"], 1);
        let event = || ServerEvent::RoomError {
            message: "x".to_string(),
        };
        deliver(
            &mut state,
            vec![
                Outbound::to_player("player_1", event()),
                Outbound::to_player("player_1", event()),
            ],
            QueuePolicy::DropOnFull,
        );
        assert!(state.clients.contains_key("player_1"));
    }

    #[test]
    fn disconnect_policy_removes_slow_clients() {
        let (mut state, _receivers) = state_with_members(&["player_1", "player_2"], 1);
        let event = || ServerEvent::RoomError {
            message: "x".to_string(),
        };
        deliver(
            &mut state,
            vec![
                Outbound::to_player("player_1", event()),
                Outbound::to_player("player_1", event()),
            ],
            QueuePolicy::DisconnectOnFull,
        );
        assert!(!state.clients.contains_key("player_1"));
        assert!(state.world.player("player_1").is_none());
        assert!(state.clients.contains_key("player_2"));
    }

    #[test]
    fn make_id_is_monotonic_per_prefix() {
        let first = make_id("player");
        let second = make_id("player");
        assert_ne!(first, second);
        assert!(first.starts_with("player_"));
    }

    #[test]
    fn missing_static_dir_is_tolerated() {
        assert_eq!(
            resolve_static_dir(Some(PathBuf::from("/does/not/exist"))),
            None
        );
    }
}
