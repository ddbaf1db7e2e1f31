//! Planar navigation math: bearings, distances, compass points and
//! blocked-sector checks.
//!
//! Bearings are degrees with 0 = North, increasing clockwise. Coordinates are
//! meters with `y` pointing North, so a bearing of 90 moves along `+x`.

mod compass;

pub use compass::*;

use crate::locations::{Coordinates, Location};

/// Default angular slack for [`is_bearing_blocked`].
pub const BLOCK_TOLERANCE_DEG: f64 = 5.0;

/// Normalize any angle into `[0, 360)`.
pub fn normalize_bearing(degrees: f64) -> f64 {
    let b = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negatives.
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// The opposite direction.
pub fn reverse_bearing(bearing: f64) -> f64 {
    normalize_bearing(bearing + 180.0)
}

/// Point reached by travelling `distance_m` along `bearing_deg`, rounded to
/// whole meters.
pub fn coordinates_from(origin: Coordinates, distance_m: f64, bearing_deg: f64) -> Coordinates {
    let rad = bearing_deg.to_radians();
    let dx = distance_m * rad.sin();
    let dy = distance_m * rad.cos();
    Coordinates::new((origin.x + dx).round(), (origin.y + dy).round())
}

/// Straight-line distance in meters.
pub fn direct_distance(a: Coordinates, b: Coordinates) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Bearing from `a` towards `b` in `[0, 360)`.
pub fn bearing_between(a: Coordinates, b: Coordinates) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    normalize_bearing(dx.atan2(dy).to_degrees())
}

/// Round a distance the way stored edges record it.
pub fn round_meters(meters: f64) -> f64 {
    meters.round()
}

/// Round a bearing the way stored edges record it (0.1 degree).
pub fn round_bearing(bearing: f64) -> f64 {
    normalize_bearing((bearing * 10.0).round() / 10.0)
}

/// Result of a blocked-sector check.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockCheck {
    Clear,
    /// The bearing itself lies in a blocked arc.
    Blocked { reason: String },
    /// Only `bearing ± tolerance` touches a blocked arc.
    NearBlocked { reason: String },
}

impl BlockCheck {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, BlockCheck::Clear)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            BlockCheck::Clear => None,
            BlockCheck::Blocked { reason } => Some(reason.clone()),
            BlockCheck::NearBlocked { reason } => {
                Some(format!("{} (close to a blocked direction)", reason))
            }
        }
    }
}

/// Test `bearing` against the location's blocked ranges. Locations without
/// ranges are never blocked.
pub fn is_bearing_blocked(location: &Location, bearing: f64, tolerance: f64) -> BlockCheck {
    let bearing = normalize_bearing(bearing);

    for range in &location.blocked_ranges {
        if range.contains(bearing) {
            return BlockCheck::Blocked {
                reason: range.reason_or_default().to_string(),
            };
        }
        for offset in [-tolerance, tolerance] {
            if range.contains(normalize_bearing(bearing + offset)) {
                return BlockCheck::NearBlocked {
                    reason: range.reason_or_default().to_string(),
                };
            }
        }
    }

    BlockCheck::Clear
}

/// Clamped-projection distance from point `p` to the segment `a`–`b`.
pub fn point_to_segment_distance(p: Coordinates, a: Coordinates, b: Coordinates) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return direct_distance(p, a);
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    direct_distance(p, Coordinates::new(a.x + t * dx, a.y + t * dy))
}

/// Point at `ratio` (0..=1) of the way from `a` to `b`.
pub fn lerp(a: Coordinates, b: Coordinates, ratio: f64) -> Coordinates {
    Coordinates::new(a.x + (b.x - a.x) * ratio, a.y + (b.y - a.y) * ratio)
}
