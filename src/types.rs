use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Observer,
    Cat,
    Mouse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Time,
    Caught,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeatView {
    pub index: usize,
    pub empty: bool,
    #[serde(rename = "playerId", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl SeatView {
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            empty: true,
            player_id: None,
            name: None,
            role: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomView {
    pub id: String,
    #[serde(rename = "hostId")]
    pub host_id: Option<String>,
    #[serde(rename = "targetCount")]
    pub target_count: usize,
    pub phase: Phase,
    #[serde(rename = "startedAt")]
    pub started_at: Option<u64>,
    #[serde(rename = "endsAt")]
    pub ends_at: Option<u64>,
    pub seats: Vec<SeatView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub x: f64,
    pub y: f64,
    pub caught: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    Hello {
        id: String,
        #[serde(rename = "minPlayers")]
        min_players: usize,
        #[serde(rename = "maxPlayers")]
        max_players: usize,
        #[serde(rename = "maxSeats")]
        max_seats: usize,
    },
    RoomState(RoomView),
    RoomError {
        message: String,
    },
    GameStarted {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "targetCount")]
        target_count: usize,
        #[serde(rename = "catId")]
        cat_id: String,
        #[serde(rename = "endsAt")]
        ends_at: u64,
    },
    GameEnded {
        #[serde(rename = "roomId")]
        room_id: String,
        reason: EndReason,
    },
    Caught {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "mouseId")]
        mouse_id: String,
        #[serde(rename = "byCatId")]
        by_cat_id: String,
    },
    Players {
        players: BTreeMap<String, PlayerView>,
    },
}

/// Delivery target for one outbound event. `Room` fans out to every
/// connection whose player is a member of that room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Audience {
    Room(String),
    Player(String),
}

#[derive(Clone, Debug)]
pub struct Outbound {
    pub to: Audience,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn to_room(room_id: &str, event: ServerEvent) -> Self {
        Self {
            to: Audience::Room(room_id.to_string()),
            event,
        }
    }

    pub fn to_player(player_id: &str, event: ServerEvent) -> Self {
        Self {
            to: Audience::Player(player_id.to_string()),
            event,
        }
    }
}
