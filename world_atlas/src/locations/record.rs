//! Flat on-disk shape of a location, as written by the campaign tools.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    BlockedRange, CompoundInfo, Connection, Coordinates, Location, LocationKind, LocationType,
    VehicleTag, WaypointInfo,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub(crate) struct LocationRecord {
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diameter_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    terrain: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    location_type: Option<LocationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    entry_points: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    mobile: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    blocked_ranges: Vec<BlockedRange>,
    #[serde(default)]
    connections: Vec<Connection>,
    #[serde(
        rename = "_vehicle",
        alias = "vehicle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    vehicle: Option<VehicleTag>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_waypoint: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_journey: Option<WaypointInfo>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<LocationRecord> for Location {
    fn from(mut record: LocationRecord) -> Self {
        let location_type = record.location_type.unwrap_or(LocationType::World);

        let kind = match location_type {
            LocationType::World | LocationType::Interior => {
                // Compound-only attributes on other kinds are kept aside so
                // the next save writes them back unchanged.
                if !record.entry_points.is_empty() {
                    warn!(%location_type, "entry_points on a non-compound location kept as-is");
                    record.extra.insert(
                        "entry_points".to_string(),
                        serde_json::Value::from(std::mem::take(&mut record.entry_points)),
                    );
                }
                if record.mobile {
                    warn!(%location_type, "mobile flag on a non-compound location kept as-is");
                    record
                        .extra
                        .insert("mobile".to_string(), serde_json::Value::Bool(true));
                }
                if location_type == LocationType::World {
                    LocationKind::World
                } else {
                    LocationKind::Interior
                }
            }
            LocationType::Compound => LocationKind::Compound(CompoundInfo {
                entry_points: record.entry_points,
                mobile: record.mobile,
            }),
        };

        let waypoint = if record.is_waypoint {
            record.original_journey
        } else {
            None
        };

        Location {
            description: record.description,
            coordinates: record.coordinates,
            diameter_meters: record.diameter_meters,
            terrain: record.terrain,
            parent: record.parent,
            children: record.children,
            kind,
            blocked_ranges: record.blocked_ranges,
            vehicle: record.vehicle,
            waypoint,
            connections: record.connections,
            extra: record.extra,
        }
    }
}

impl From<Location> for LocationRecord {
    fn from(mut location: Location) -> Self {
        let location_type = location.location_type();
        let (entry_points, mobile) = match location.kind {
            LocationKind::Compound(info) => {
                // Values set aside before a promotion are superseded.
                location.extra.remove("entry_points");
                location.extra.remove("mobile");
                (info.entry_points, info.mobile)
            }
            _ => (Vec::new(), false),
        };

        LocationRecord {
            description: location.description,
            coordinates: location.coordinates,
            diameter_meters: location.diameter_meters,
            terrain: location.terrain,
            location_type: match location_type {
                LocationType::World => None,
                other => Some(other),
            },
            parent: location.parent,
            children: location.children,
            entry_points,
            mobile,
            blocked_ranges: location.blocked_ranges,
            connections: location.connections,
            vehicle: location.vehicle,
            is_waypoint: location.waypoint.is_some(),
            original_journey: location.waypoint,
            extra: location.extra,
        }
    }
}
