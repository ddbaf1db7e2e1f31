//! 16-point compass rose.

use super::normalize_bearing;

/// (label, abbreviation) for each 22.5 degree bucket, starting at North.
const COMPASS_POINTS: [(&str, &str); 16] = [
    ("North", "N"),
    ("North-northeast", "NNE"),
    ("Northeast", "NE"),
    ("East-northeast", "ENE"),
    ("East", "E"),
    ("East-southeast", "ESE"),
    ("Southeast", "SE"),
    ("South-southeast", "SSE"),
    ("South", "S"),
    ("South-southwest", "SSW"),
    ("Southwest", "SW"),
    ("West-southwest", "WSW"),
    ("West", "W"),
    ("West-northwest", "WNW"),
    ("Northwest", "NW"),
    ("North-northwest", "NNW"),
];

/// A compass point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompassPoint {
    pub label: &'static str,
    pub abbreviation: &'static str,
}

impl std::fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.abbreviation)
    }
}

/// Nearest of the 16 compass points to `bearing`.
pub fn compass_of(bearing: f64) -> CompassPoint {
    let idx = (normalize_bearing(bearing) / 22.5).round() as usize % COMPASS_POINTS.len();
    let (label, abbreviation) = COMPASS_POINTS[idx];
    CompassPoint {
        label,
        abbreviation,
    }
}
