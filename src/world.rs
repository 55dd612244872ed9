use std::collections::{BTreeMap, HashMap};

use crate::collision::resolve_move;
use crate::constants::{GameRules, DEFAULT_ROOM_ID};
use crate::rng::Rng;
use crate::room::Room;
use crate::types::{
    EndReason, Outbound, Phase, PlayerView, Role, RoomView, SeatView, ServerEvent,
};

#[derive(Clone, Debug)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub room_id: Option<String>,
    pub seat_index: Option<usize>,
    pub x: f64,
    pub y: f64,
    pub caught: bool,
    pub last_update_ms: u64,
}

/// One entry per cat/mouse pair currently within catch range.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProximityKey {
    pub room_id: String,
    pub cat_id: String,
    pub mouse_id: String,
}

/// Owns the three shared stores (players, rooms, proximity timers) and every
/// rule that mutates them. Methods take the current time explicitly and
/// return the notifications the transport should deliver; the world itself
/// never talks to a socket.
pub struct GameWorld {
    rules: GameRules,
    rng: Rng,
    players: HashMap<String, Player>,
    rooms: HashMap<String, Room>,
    proximity: HashMap<ProximityKey, u64>,
}

impl GameWorld {
    pub fn new(rules: GameRules, seed: u32) -> Self {
        Self {
            rules,
            rng: Rng::new(seed),
            players: HashMap::new(),
            rooms: HashMap::new(),
            proximity: HashMap::new(),
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Ids of every player currently placed in the room, seated or not.
    /// The transport uses this to fan out `Audience::Room` events.
    pub fn member_ids(&self, room_id: &str) -> Vec<String> {
        self.players
            .values()
            .filter(|player| player.room_id.as_deref() == Some(room_id))
            .map(|player| player.id.clone())
            .collect()
    }

    pub fn connect_player(&mut self, player_id: &str, now_ms: u64) {
        let player = Player {
            id: player_id.to_string(),
            name: "player".to_string(),
            role: Role::Observer,
            room_id: None,
            seat_index: None,
            x: self.rng.next_f64(),
            y: self.rng.next_f64(),
            caught: false,
            last_update_ms: now_ms,
        };
        self.players.insert(player_id.to_string(), player);
        tracing::debug!(player = player_id, "player connected");
    }

    pub fn place_in_default_room(&mut self, player_id: &str) -> Vec<Outbound> {
        self.place_in_room(player_id, DEFAULT_ROOM_ID)
    }

    pub fn place_in_room(&mut self, player_id: &str, room_id: &str) -> Vec<Outbound> {
        if !self.players.contains_key(player_id) {
            return Vec::new();
        }
        if !self.rooms.contains_key(room_id) {
            self.rooms
                .insert(room_id.to_string(), Room::new(room_id, &self.rules));
            tracing::info!(room = room_id, "room created");
        }
        if let Some(player) = self.players.get_mut(player_id) {
            player.room_id = Some(room_id.to_string());
        }

        let mut out = self.room_state_events(room_id);
        out.push(Outbound::to_player(
            player_id,
            ServerEvent::Hello {
                id: player_id.to_string(),
                min_players: self.rules.min_players,
                max_players: self.rules.max_players,
                max_seats: self.rules.max_seats,
            },
        ));
        out
    }

    pub fn take_seat(&mut self, player_id: &str, seat_index: i64) -> Vec<Outbound> {
        let Some(room_id) = self.room_of(player_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };
        if room.phase != Phase::Lobby {
            return Vec::new();
        }
        if seat_index < 0 || seat_index as usize >= self.rules.max_seats {
            return Vec::new();
        }
        let index = seat_index as usize;

        if index == 0 && room.host_id.as_deref() != Some(player_id) {
            return vec![Outbound::to_player(
                player_id,
                ServerEvent::RoomError {
                    message: "Seat 1 is reserved for host.".to_string(),
                },
            )];
        }
        if room
            .seats[index]
            .as_deref()
            .is_some_and(|occupant| occupant != player_id)
        {
            return Vec::new();
        }

        room.vacate(player_id);
        room.seats[index] = Some(player_id.to_string());
        if index != 0 && room.host_id.as_deref() == Some(player_id) {
            // Host moved off the reserved seat, so the host role lapses.
            room.host_id = None;
        }
        if let Some(player) = self.players.get_mut(player_id) {
            player.seat_index = Some(index);
            player.name = positional_name(index);
        }
        self.room_state_events(&room_id)
    }

    pub fn set_host(&mut self, player_id: &str, as_host: bool) -> Vec<Outbound> {
        let Some(room_id) = self.room_of(player_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };
        if room.phase != Phase::Lobby {
            return Vec::new();
        }

        if !as_host {
            if room.host_id.as_deref() != Some(player_id) {
                return Vec::new();
            }
            room.host_id = None;
            if let Some(player) = self.players.get_mut(player_id) {
                if let Some(index) = player.seat_index {
                    player.name = positional_name(index);
                }
            }
            return self.room_state_events(&room_id);
        }

        let occupant = room.seats[0].clone();
        let my_seat = self
            .players
            .get(player_id)
            .and_then(|player| player.seat_index);

        let mut displaced_into_my_seat = false;
        if let Some(occupant_id) = occupant.filter(|id| id != player_id) {
            if let Some(index) = my_seat {
                // Swap: the previous host takes the requester's old seat.
                room.seats[index] = Some(occupant_id.clone());
                displaced_into_my_seat = true;
                if let Some(player) = self.players.get_mut(&occupant_id) {
                    player.seat_index = Some(index);
                    player.name = positional_name(index);
                }
            } else if let Some(free) = room.first_free_seat_except(0) {
                room.seats[free] = Some(occupant_id.clone());
                if let Some(player) = self.players.get_mut(&occupant_id) {
                    player.seat_index = Some(free);
                    player.name = positional_name(free);
                }
            } else if let Some(player) = self.players.get_mut(&occupant_id) {
                player.seat_index = None;
                player.name = "player".to_string();
                player.role = Role::Observer;
            }
        }

        if let Some(index) = my_seat {
            if index != 0 && !displaced_into_my_seat {
                room.seats[index] = None;
            }
        }

        room.seats[0] = Some(player_id.to_string());
        room.host_id = Some(player_id.to_string());
        if let Some(player) = self.players.get_mut(player_id) {
            player.seat_index = Some(0);
            player.name = "Host".to_string();
        }
        self.room_state_events(&room_id)
    }

    pub fn leave_seat(&mut self, player_id: &str) -> Vec<Outbound> {
        let Some(room_id) = self.room_of(player_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };
        if room.phase != Phase::Lobby {
            return Vec::new();
        }
        let Some(index) = self
            .players
            .get(player_id)
            .and_then(|player| player.seat_index)
        else {
            return Vec::new();
        };
        if room.seats[index].as_deref() != Some(player_id) {
            return Vec::new();
        }

        if room.host_id.as_deref() == Some(player_id) {
            room.host_id = None;
        }
        room.seats[index] = None;
        if let Some(player) = self.players.get_mut(player_id) {
            player.seat_index = None;
            player.name = "player".to_string();
            player.role = Role::Observer;
        }
        self.room_state_events(&room_id)
    }

    pub fn start_game(&mut self, player_id: &str, now_ms: u64) -> Vec<Outbound> {
        let Some(room_id) = self.room_of(player_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return Vec::new();
        };

        if room.host_id.as_deref() != Some(player_id) {
            return vec![room_error(player_id, "Only host can start the game.")];
        }
        if room.phase != Phase::Lobby {
            return vec![room_error(player_id, "Game already started.")];
        }
        let seated = room.seated_ids();
        if seated.len() < self.rules.min_players || seated.len() > self.rules.max_players {
            return vec![room_error(
                player_id,
                "Need 2-4 seated players (1 cat + 1-3 mice).",
            )];
        }

        let cat_id = seated[self.rng.pick_index(seated.len())].clone();
        for id in &seated {
            let x = self.rng.next_f64();
            let y = self.rng.next_f64();
            if let Some(player) = self.players.get_mut(id) {
                player.caught = false;
                player.x = x;
                player.y = y;
                player.last_update_ms = now_ms;
                player.role = if *id == cat_id { Role::Cat } else { Role::Mouse };
            }
        }

        let ends_at = now_ms + self.rules.round_ms;
        let target_count = seated.len();
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.target_count = target_count;
            room.phase = Phase::Running;
            room.started_at = Some(now_ms);
            room.ends_at = Some(ends_at);
        }
        tracing::info!(
            room = room_id.as_str(),
            cat = cat_id.as_str(),
            players = target_count,
            "round started"
        );

        let mut out = self.room_state_events(&room_id);
        out.push(Outbound::to_room(
            &room_id,
            ServerEvent::GameStarted {
                room_id: room_id.clone(),
                target_count,
                cat_id,
                ends_at,
            },
        ));
        out
    }

    pub fn update_position(&mut self, player_id: &str, x: f64, y: f64, now_ms: u64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let Some(room_id) = self.room_of(player_id) else {
            return;
        };
        let running = self
            .rooms
            .get(&room_id)
            .is_some_and(|room| room.phase == Phase::Running);
        let Some(player) = self.players.get_mut(player_id) else {
            return;
        };
        if running && player.role == Role::Mouse && player.caught {
            return;
        }

        let from_x = if player.x.is_finite() { player.x } else { 0.5 };
        let from_y = if player.y.is_finite() { player.y } else { 0.5 };
        let (next_x, next_y) = resolve_move(
            from_x,
            from_y,
            x,
            y,
            &self.rules.walls,
            self.rules.player_radius,
        );
        player.x = next_x;
        player.y = next_y;
        player.last_update_ms = now_ms;
    }

    pub fn disconnect_player(&mut self, player_id: &str) -> Vec<Outbound> {
        let out = self.clear_player_from_room(player_id);
        self.players.remove(player_id);
        self.proximity
            .retain(|key, _| key.cat_id != player_id && key.mouse_id != player_id);
        tracing::debug!(player = player_id, "player disconnected");
        out
    }

    /// Fixed-rate pass over every running room: round deadline first, then
    /// pairwise catch detection with hold-time debouncing, then the live
    /// position broadcast. The first pair to cross the hold threshold ends
    /// the round; the room is skipped for the rest of the tick.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Outbound> {
        let mut room_ids: Vec<String> = self.rooms.keys().cloned().collect();
        room_ids.sort();

        let mut out = Vec::new();
        for room_id in room_ids {
            let (seated, ends_at) = match self.rooms.get(&room_id) {
                Some(room) if room.phase == Phase::Running => {
                    (room.seated_ids(), room.ends_at)
                }
                _ => continue,
            };

            if ends_at.is_some_and(|deadline| now_ms >= deadline) {
                out.extend(self.end_game(&room_id, EndReason::Time));
                continue;
            }

            let cats: Vec<String> = seated
                .iter()
                .filter(|id| self.role_of(id) == Some(Role::Cat))
                .cloned()
                .collect();
            let mice: Vec<String> = seated
                .iter()
                .filter(|id| {
                    self.role_of(id) == Some(Role::Mouse)
                        && self.players.get(*id).is_some_and(|p| !p.caught)
                })
                .cloned()
                .collect();

            let mut ended_by_catch = false;
            'pairs: for cat_id in &cats {
                for mouse_id in &mice {
                    let (Some(cat), Some(mouse)) =
                        (self.players.get(cat_id), self.players.get(mouse_id))
                    else {
                        continue;
                    };
                    let distance = (cat.x - mouse.x).hypot(cat.y - mouse.y);
                    let key = ProximityKey {
                        room_id: room_id.clone(),
                        cat_id: cat_id.clone(),
                        mouse_id: mouse_id.clone(),
                    };

                    if distance < self.rules.catch_dist {
                        let held_since = *self.proximity.entry(key.clone()).or_insert(now_ms);
                        if now_ms.saturating_sub(held_since) >= self.rules.catch_hold_ms {
                            if let Some(mouse) = self.players.get_mut(mouse_id) {
                                mouse.caught = true;
                            }
                            out.push(Outbound::to_room(
                                &room_id,
                                ServerEvent::Caught {
                                    room_id: room_id.clone(),
                                    mouse_id: mouse_id.clone(),
                                    by_cat_id: cat_id.clone(),
                                },
                            ));
                            self.proximity.remove(&key);
                            out.extend(self.end_game(&room_id, EndReason::Caught));
                            ended_by_catch = true;
                            break 'pairs;
                        }
                    } else {
                        self.proximity.remove(&key);
                    }
                }
            }
            if ended_by_catch {
                continue;
            }

            let players: BTreeMap<String, PlayerView> = seated
                .iter()
                .filter_map(|id| self.players.get(id).map(|p| (id.clone(), player_view(p))))
                .collect();
            out.push(Outbound::to_room(&room_id, ServerEvent::Players { players }));
        }
        out
    }

    fn end_game(&mut self, room_id: &str, reason: EndReason) -> Vec<Outbound> {
        let seated = match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.phase = Phase::Lobby;
                room.started_at = None;
                room.ends_at = None;
                room.seated_ids()
            }
            None => return Vec::new(),
        };
        for id in &seated {
            if let Some(player) = self.players.get_mut(id) {
                player.role = Role::Observer;
                player.caught = false;
            }
        }
        self.proximity.retain(|key, _| key.room_id != room_id);
        tracing::info!(room = room_id, reason = ?reason, "round ended");

        let mut out = self.room_state_events(room_id);
        out.push(Outbound::to_room(
            room_id,
            ServerEvent::GameEnded {
                room_id: room_id.to_string(),
                reason,
            },
        ));
        out
    }

    fn clear_player_from_room(&mut self, player_id: &str) -> Vec<Outbound> {
        let Some(room_id) = self.room_of(player_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            if let Some(player) = self.players.get_mut(player_id) {
                player.room_id = None;
                player.seat_index = None;
            }
            return Vec::new();
        };

        room.vacate(player_id);
        if room.host_id.as_deref() == Some(player_id) {
            room.host_id = None;
        }
        let emptied = room.is_empty();
        if let Some(player) = self.players.get_mut(player_id) {
            player.room_id = None;
            player.seat_index = None;
            player.role = Role::Observer;
        }

        if emptied && room_id != DEFAULT_ROOM_ID {
            self.rooms.remove(&room_id);
            self.proximity.retain(|key, _| key.room_id != room_id);
            tracing::info!(room = room_id.as_str(), "room deleted");
            return Vec::new();
        }
        if emptied {
            let rules = self.rules.clone();
            if let Some(room) = self.rooms.get_mut(&room_id) {
                room.reset_to_lobby(&rules);
            }
        }
        self.room_state_events(&room_id)
    }

    fn room_of(&self, player_id: &str) -> Option<String> {
        self.players.get(player_id)?.room_id.clone()
    }

    fn role_of(&self, player_id: &str) -> Option<Role> {
        self.players.get(player_id).map(|player| player.role)
    }

    fn room_state_events(&self, room_id: &str) -> Vec<Outbound> {
        match self.room_view(room_id) {
            Some(view) => vec![Outbound::to_room(room_id, ServerEvent::RoomState(view))],
            None => Vec::new(),
        }
    }

    pub fn room_view(&self, room_id: &str) -> Option<RoomView> {
        let room = self.rooms.get(room_id)?;
        let seats = room
            .seats
            .iter()
            .enumerate()
            .map(|(index, seat)| {
                let occupant = seat.as_deref().and_then(|id| self.players.get(id));
                match occupant {
                    Some(player) => SeatView {
                        index,
                        empty: false,
                        player_id: Some(player.id.clone()),
                        name: Some(player.name.clone()),
                        role: Some(player.role),
                    },
                    None => SeatView::empty(index),
                }
            })
            .collect();
        Some(RoomView {
            id: room.id.clone(),
            host_id: room.host_id.clone(),
            target_count: room.target_count,
            phase: room.phase,
            started_at: room.started_at,
            ends_at: room.ends_at,
            seats,
        })
    }
}

fn positional_name(seat_index: usize) -> String {
    format!("Player {}", seat_index + 1)
}

fn room_error(player_id: &str, message: &str) -> Outbound {
    Outbound::to_player(
        player_id,
        ServerEvent::RoomError {
            message: message.to_string(),
        },
    )
}

fn player_view(player: &Player) -> PlayerView {
    PlayerView {
        id: player.id.clone(),
        name: player.name.clone(),
        role: player.role,
        x: player.x,
        y: player.y,
        caught: player.caught,
    }
}
