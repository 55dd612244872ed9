use crate::constants::GameRules;
use crate::types::Phase;

#[derive(Clone, Debug)]
pub struct Room {
    pub id: String,
    pub host_id: Option<String>,
    pub target_count: usize,
    pub phase: Phase,
    pub seats: Vec<Option<String>>,
    pub started_at: Option<u64>,
    pub ends_at: Option<u64>,
}

impl Room {
    pub fn new(id: &str, rules: &GameRules) -> Self {
        Self {
            id: id.to_string(),
            host_id: None,
            target_count: rules.min_players,
            phase: Phase::Lobby,
            seats: vec![None; rules.max_seats],
            started_at: None,
            ends_at: None,
        }
    }

    /// Seated player ids in seat order.
    pub fn seated_ids(&self) -> Vec<String> {
        self.seats.iter().flatten().cloned().collect()
    }

    pub fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.as_deref() == Some(player_id))
    }

    /// Clears the player's seat, if any. Returns whether a seat was freed.
    pub fn vacate(&mut self, player_id: &str) -> bool {
        match self.seat_of(player_id) {
            Some(index) => {
                self.seats[index] = None;
                true
            }
            None => false,
        }
    }

    pub fn first_free_seat_except(&self, excluded: usize) -> Option<usize> {
        self.seats
            .iter()
            .enumerate()
            .find(|(index, seat)| *index != excluded && seat.is_none())
            .map(|(index, _)| index)
    }

    pub fn is_empty(&self) -> bool {
        self.seats.iter().all(|seat| seat.is_none())
    }

    pub fn reset_to_lobby(&mut self, rules: &GameRules) {
        self.host_id = None;
        self.target_count = rules.min_players;
        self.phase = Phase::Lobby;
        self.seats = vec![None; rules.max_seats];
        self.started_at = None;
        self.ends_at = None;
    }
}
