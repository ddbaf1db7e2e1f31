//! Location definitions for the campaign map.
//!
//! A location is a world point, a compound (a building, ship, or camp with
//! nested rooms) or an interior room of a compound. Vehicle and waypoint
//! metadata are optional records attached to the common fields.

mod connection;
mod record;

pub use connection::*;

use serde::{Deserialize, Serialize};

/// Footprint assumed when a location does not declare `diameter_meters`.
pub const DEFAULT_DIAMETER_METERS: f64 = 10.0;

/// Planar position in meters. `y` grows northwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift by a delta.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// An angular sector in which travel from a location is obstructed.
/// `from_deg > to_deg` means the arc wraps through North.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedRange {
    #[serde(rename = "from", alias = "from_deg")]
    pub from_deg: f64,
    #[serde(rename = "to", alias = "to_deg")]
    pub to_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BlockedRange {
    pub fn new(from_deg: f64, to_deg: f64, reason: impl Into<String>) -> Self {
        Self {
            from_deg,
            to_deg,
            reason: Some(reason.into()),
        }
    }

    /// Whether a normalized bearing lies inside the arc (bounds inclusive).
    pub fn contains(&self, bearing: f64) -> bool {
        if self.from_deg > self.to_deg {
            bearing >= self.from_deg || bearing <= self.to_deg
        } else {
            self.from_deg <= bearing && bearing <= self.to_deg
        }
    }

    pub fn overlaps(&self, from_deg: f64, to_deg: f64) -> bool {
        from_deg <= self.to_deg && to_deg >= self.from_deg
    }

    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("Blocked")
    }
}

/// Which map the player is currently looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MapContext {
    #[default]
    Global,
    Local,
}

/// Serialized discriminant of [`LocationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    World,
    Compound,
    Interior,
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LocationType::World => "world",
            LocationType::Compound => "compound",
            LocationType::Interior => "interior",
        };
        write!(f, "{}", name)
    }
}

/// Data carried only by compounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundInfo {
    /// Subset of the compound's children reachable directly from outside.
    pub entry_points: Vec<String>,
    pub mobile: bool,
}

/// The three location states.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationKind {
    World,
    Compound(CompoundInfo),
    Interior,
}

/// Vehicle metadata attached to an anchor or to one of its rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTag {
    pub vehicle_id: String,
    #[serde(rename = "is_vehicle_anchor", alias = "is_anchor", default)]
    pub is_anchor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dock_room: Option<String>,
    #[serde(
        rename = "proximity_radius_meters",
        alias = "proximity_radius_m",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub proximity_radius_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dock_connections: Option<u32>,
    /// Docked permanently; refuses `move_vehicle`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stationary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_context: Option<MapContext>,
}

impl VehicleTag {
    /// Tag for a room aboard `vehicle_id`.
    pub fn room(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            is_anchor: false,
            vehicle_type: None,
            dock_room: None,
            proximity_radius_m: None,
            max_dock_connections: None,
            stationary: false,
            map_context: Some(MapContext::Local),
        }
    }
}

/// Journey bookkeeping for a transient waypoint location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointInfo {
    pub from: String,
    pub to: String,
    pub segment: u32,
    pub total_segments: u32,
    pub progress_meters: f64,
    pub remaining_meters: f64,
    pub terrain: String,
}

/// A named place on the campaign map. The name is the key under which the
/// location is stored in [`LocationGraph`](crate::LocationGraph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "record::LocationRecord", into = "record::LocationRecord")]
pub struct Location {
    pub description: String,
    pub coordinates: Option<Coordinates>,
    pub diameter_meters: Option<f64>,
    pub terrain: Option<String>,
    pub parent: Option<String>,
    /// Locations whose `parent` names this one. World regions may hold
    /// children without becoming compounds.
    pub children: Vec<String>,
    pub kind: LocationKind,
    pub blocked_ranges: Vec<BlockedRange>,
    pub vehicle: Option<VehicleTag>,
    pub waypoint: Option<WaypointInfo>,

    /// Edges owned by this location. Mutated only by the graph store.
    pub(crate) connections: Vec<Connection>,

    /// Attributes this crate does not interpret, kept for round-tripping.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Location {
    fn with_kind(kind: LocationKind) -> Self {
        Self {
            description: String::new(),
            coordinates: None,
            diameter_meters: None,
            terrain: None,
            parent: None,
            children: Vec::new(),
            kind,
            blocked_ranges: Vec::new(),
            vehicle: None,
            waypoint: None,
            connections: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// A plain world location.
    pub fn world() -> Self {
        Self::with_kind(LocationKind::World)
    }

    /// An empty compound.
    pub fn compound() -> Self {
        Self::with_kind(LocationKind::Compound(CompoundInfo::default()))
    }

    /// An interior room owned by `parent`.
    pub fn interior(parent: impl Into<String>) -> Self {
        let mut location = Self::with_kind(LocationKind::Interior);
        location.parent = Some(parent.into());
        location
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_coordinates(mut self, x: f64, y: f64) -> Self {
        self.coordinates = Some(Coordinates::new(x, y));
        self
    }

    pub fn with_diameter(mut self, meters: f64) -> Self {
        self.diameter_meters = Some(meters);
        self
    }

    pub fn with_terrain(mut self, terrain: impl Into<String>) -> Self {
        self.terrain = Some(terrain.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_blocked_range(mut self, range: BlockedRange) -> Self {
        self.blocked_ranges.push(range);
        self
    }

    pub fn with_vehicle(mut self, tag: VehicleTag) -> Self {
        self.vehicle = Some(tag);
        self
    }

    /// Edges owned by this location (not the reverse ones).
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn location_type(&self) -> LocationType {
        match self.kind {
            LocationKind::World => LocationType::World,
            LocationKind::Compound(_) => LocationType::Compound,
            LocationKind::Interior => LocationType::Interior,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, LocationKind::Compound(_))
    }

    pub fn compound_info(&self) -> Option<&CompoundInfo> {
        match &self.kind {
            LocationKind::Compound(info) => Some(info),
            _ => None,
        }
    }

    pub fn compound_info_mut(&mut self) -> Option<&mut CompoundInfo> {
        match &mut self.kind {
            LocationKind::Compound(info) => Some(info),
            _ => None,
        }
    }

    /// Turn this location into a compound if it is not one already and
    /// return its compound data.
    pub fn promote_to_compound(&mut self) -> &mut CompoundInfo {
        if !self.is_compound() {
            self.kind = LocationKind::Compound(CompoundInfo::default());
        }
        match &mut self.kind {
            LocationKind::Compound(info) => info,
            // Just assigned above.
            _ => unreachable!("location was promoted to a compound"),
        }
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Append `child` unless it is already listed. The kind is left alone.
    pub fn add_child(&mut self, child: &str) -> bool {
        if self.children.iter().any(|c| c == child) {
            return false;
        }
        self.children.push(child.to_string());
        true
    }

    pub fn entry_points(&self) -> &[String] {
        self.compound_info()
            .map(|c| c.entry_points.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_mobile(&self) -> bool {
        self.compound_info().map(|c| c.mobile).unwrap_or(false)
    }

    /// Footprint radius, using the default diameter when none is recorded.
    pub fn radius(&self) -> f64 {
        self.diameter_meters.unwrap_or(DEFAULT_DIAMETER_METERS) / 2.0
    }

    pub fn is_vehicle_anchor(&self) -> bool {
        self.vehicle.as_ref().is_some_and(|v| v.is_anchor)
    }

    pub fn is_vehicle_room(&self) -> bool {
        self.vehicle.as_ref().is_some_and(|v| !v.is_anchor)
    }

    pub fn belongs_to_vehicle(&self, vehicle_id: &str) -> bool {
        self.vehicle
            .as_ref()
            .is_some_and(|v| v.vehicle_id == vehicle_id)
    }

    pub fn is_waypoint(&self) -> bool {
        self.waypoint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrapping_blocked_range() {
        let range = BlockedRange::new(350.0, 10.0, "Cliff");
        assert!(range.contains(355.0));
        assert!(range.contains(0.0));
        assert!(range.contains(10.0));
        assert!(!range.contains(180.0));
    }

    #[test]
    fn test_plain_blocked_range() {
        let range = BlockedRange::new(160.0, 200.0, "River");
        assert!(range.contains(180.0));
        assert!(!range.contains(159.0));
    }

    #[test]
    fn test_promote_keeps_common_fields() {
        let mut location = Location::world()
            .with_description("Old mill")
            .with_coordinates(10.0, 20.0);
        location.promote_to_compound().entry_points.push("Hall".into());

        assert!(location.is_compound());
        assert_eq!(location.entry_points(), ["Hall".to_string()]);
        assert_eq!(location.description, "Old mill");
        assert_eq!(location.coordinates, Some(Coordinates::new(10.0, 20.0)));
    }

    #[test]
    fn test_missing_type_reads_as_world() {
        let location: Location = serde_json::from_value(json!({
            "coordinates": {"x": 0, "y": 0},
            "position": "north of the river"
        }))
        .unwrap();
        assert_eq!(location.location_type(), LocationType::World);
        assert_eq!(location.extra["position"], "north of the river");
    }

    #[test]
    fn test_compound_round_trip() {
        let raw = json!({
            "type": "compound",
            "description": "Keep",
            "children": ["Gate", "Hall"],
            "entry_points": ["Gate"],
            "mobile": true,
            "connections": [{"to": "Village", "distance_meters": 300.0}]
        });
        let location: Location = serde_json::from_value(raw).unwrap();
        assert_eq!(location.children().len(), 2);
        assert!(location.is_mobile());
        assert_eq!(location.connections().len(), 1);

        let back = serde_json::to_value(&location).unwrap();
        assert_eq!(back["type"], "compound");
        assert_eq!(back["entry_points"], json!(["Gate"]));
    }

    #[test]
    fn test_vehicle_tag_original_keys() {
        let location: Location = serde_json::from_value(json!({
            "type": "compound",
            "_vehicle": {
                "vehicle_id": "ship-01",
                "is_vehicle_anchor": true,
                "dock_room": "Bridge",
                "proximity_radius_meters": 5000
            }
        }))
        .unwrap();
        assert!(location.is_vehicle_anchor());
        let tag = location.vehicle.as_ref().unwrap();
        assert_eq!(tag.proximity_radius_m, Some(5000.0));
    }

    #[test]
    fn test_default_radius() {
        assert_eq!(Location::world().radius(), 5.0);
        assert_eq!(Location::world().with_diameter(150.0).radius(), 75.0);
    }
}
