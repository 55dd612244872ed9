const AXIS_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// True when a disk of `radius` at (x, y) overlaps the padded strip of any
/// wall segment. Only axis-aligned segments are considered.
pub fn is_blocked(x: f64, y: f64, walls: &[WallSegment], radius: f64) -> bool {
    for wall in walls {
        if (wall.x1 - wall.x2).abs() < AXIS_EPSILON {
            let min_y = wall.y1.min(wall.y2) - radius;
            let max_y = wall.y1.max(wall.y2) + radius;
            if y >= min_y && y <= max_y && (x - wall.x1).abs() <= radius {
                return true;
            }
        } else if (wall.y1 - wall.y2).abs() < AXIS_EPSILON {
            let min_x = wall.x1.min(wall.x2) - radius;
            let max_x = wall.x1.max(wall.x2) + radius;
            if x >= min_x && x <= max_x && (y - wall.y1).abs() <= radius {
                return true;
            }
        }
    }
    false
}

/// Axis-separated slide resolution: full move, then X only, then Y only,
/// then stay put. X is tried first, so diagonal approaches slide along
/// walls with an X bias instead of freezing.
pub fn resolve_move(
    from_x: f64,
    from_y: f64,
    to_x: f64,
    to_y: f64,
    walls: &[WallSegment],
    radius: f64,
) -> (f64, f64) {
    let tx = clamp01(to_x);
    let ty = clamp01(to_y);

    if !is_blocked(tx, ty, walls, radius) {
        return (tx, ty);
    }

    let sy = clamp01(from_y);
    if !is_blocked(tx, sy, walls, radius) {
        return (tx, sy);
    }

    let sx = clamp01(from_x);
    if !is_blocked(sx, ty, walls, radius) {
        return (sx, ty);
    }

    (clamp01(from_x), clamp01(from_y))
}
