use crate::collision::WallSegment;

pub const MAX_SEATS: usize = 6;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;
pub const DEFAULT_ROOM_ID: &str = "LOBBY";

pub const CATCH_DIST: f64 = 0.06;
pub const CATCH_HOLD_MS: u64 = 1_200;
pub const ROUND_MS: u64 = 5 * 60 * 1000;
pub const TICK_MS: u64 = 150;

pub const PLAYER_RADIUS: f64 = 0.028;

pub fn default_wall_segments() -> Vec<WallSegment> {
    [
        (0.12, 0.14, 0.12, 0.34),
        (0.34, 0.18, 0.34, 0.38),
        (0.56, 0.12, 0.56, 0.30),
        (0.78, 0.52, 0.78, 0.72),
        (0.90, 0.20, 0.90, 0.44),
        (0.04, 0.58, 0.24, 0.58),
        (0.30, 0.70, 0.50, 0.70),
        (0.58, 0.62, 0.74, 0.62),
        (0.16, 0.46, 0.28, 0.46),
    ]
    .into_iter()
    .map(|(x1, y1, x2, y2)| WallSegment { x1, y1, x2, y2 })
    .collect()
}

#[derive(Clone, Debug)]
pub struct GameRules {
    pub max_seats: usize,
    pub min_players: usize,
    pub max_players: usize,
    pub catch_dist: f64,
    pub catch_hold_ms: u64,
    pub round_ms: u64,
    pub tick_ms: u64,
    pub player_radius: f64,
    pub walls: Vec<WallSegment>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_seats: MAX_SEATS,
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            catch_dist: CATCH_DIST,
            catch_hold_ms: CATCH_HOLD_MS,
            round_ms: ROUND_MS,
            tick_ms: TICK_MS,
            player_radius: PLAYER_RADIUS,
            walls: default_wall_segments(),
        }
    }
}
