//! Transient waypoints for interrupted journeys.
//!
//! A waypoint sits at the midpoint of the segment where the party stopped,
//! with a "turn back" edge to the origin and a "continue forward" edge to the
//! destination. The two partial distances always sum to the leg's total.

use serde::{Deserialize, Serialize};
use tracing::info;

use world_atlas::{lerp, Coordinates, EdgeMeta, Location, LocationGraph, NavError, WaypointInfo};

use super::{JourneyReport, SegmentReport};

/// Name of the waypoint for `segment` of the leg `from` -> `to`.
pub fn waypoint_name(from: &str, to: &str, segment: u32) -> String {
    let slug = |s: &str| s.to_lowercase().replace(' ', "_");
    format!("waypoint_{}_{}_seg{}", slug(from), slug(to), segment)
}

/// Materialize a waypoint for `segment` of `journey` and return its name.
pub fn create_waypoint_location(
    graph: &mut LocationGraph,
    journey: &JourneyReport,
    segment: &SegmentReport,
    diameter_meters: f64,
) -> Result<String, NavError> {
    let from = journey.from_location.as_str();
    let to = journey.to_location.as_str();
    let start = graph.require(from)?.coordinates.unwrap_or(Coordinates::ORIGIN);
    let end = graph.require(to)?.coordinates.unwrap_or(Coordinates::ORIGIN);

    let name = waypoint_name(from, to, segment.segment);
    if graph.contains(&name) {
        return Err(NavError::AlreadyExists(name));
    }

    let total_segments = segment.check.total_segments.max(1);
    let index = segment.segment.clamp(1, total_segments);
    let halves = f64::from(2 * index - 1);
    let whole = f64::from(2 * total_segments);
    let midpoint = lerp(start, end, halves / whole);
    let traveled = (journey.total_distance_m * halves / whole).trunc();
    let remaining = journey.total_distance_m - traveled;

    let mut location = Location::world()
        .with_description(format!("Stopped midway between {} and {}", from, to))
        .with_coordinates(midpoint.x.trunc(), midpoint.y.trunc())
        .with_diameter(diameter_meters);
    location.waypoint = Some(WaypointInfo {
        from: from.to_string(),
        to: to.to_string(),
        segment: segment.segment,
        total_segments,
        progress_meters: traveled,
        remaining_meters: remaining,
        terrain: journey.terrain.clone(),
    });
    graph.insert_location(name.as_str(), location)?;

    graph.add_connection(
        &name,
        from,
        EdgeMeta::new()
            .with_path("turn back")
            .with_distance(traveled)
            .with_bearing(180.0)
            .with_terrain(journey.terrain.as_str()),
    );
    graph.add_connection(
        &name,
        to,
        EdgeMeta::new()
            .with_path("continue forward")
            .with_distance(remaining)
            .with_bearing(0.0)
            .with_terrain(journey.terrain.as_str()),
    );

    info!(waypoint = %name, traveled, remaining, "waypoint created");
    Ok(name)
}

pub fn is_waypoint(graph: &LocationGraph, name: &str) -> bool {
    graph.location(name).is_some_and(Location::is_waypoint)
}

/// Delete a waypoint and its edges. Ordinary locations are refused.
pub fn cleanup_waypoint(graph: &mut LocationGraph, name: &str) -> Result<(), NavError> {
    if !graph.require(name)?.is_waypoint() {
        return Err(NavError::NotAWaypoint(name.to_string()));
    }
    graph.remove_location(name);
    info!(waypoint = name, "waypoint removed");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointExit {
    pub to: String,
    pub distance_m: f64,
    /// Segment to resume from when continuing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_start: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointOptions {
    pub forward: WaypointExit,
    pub back: WaypointExit,
}

pub fn get_waypoint_options(graph: &LocationGraph, name: &str) -> Result<WaypointOptions, NavError> {
    let info = graph
        .require(name)?
        .waypoint
        .as_ref()
        .ok_or_else(|| NavError::NotAWaypoint(name.to_string()))?;

    Ok(WaypointOptions {
        forward: WaypointExit {
            to: info.to.clone(),
            distance_m: info.remaining_meters,
            segment_start: Some(info.segment),
        },
        back: WaypointExit {
            to: info.from.clone(),
            distance_m: info.progress_meters,
            segment_start: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::JourneyEngine;
    use world_atlas::{EncounterRules, FixedDice};

    fn leg() -> (LocationGraph, JourneyReport) {
        let mut graph = LocationGraph::new();
        graph
            .insert_location("Old Mill", Location::world().with_coordinates(0.0, 0.0))
            .unwrap();
        graph
            .insert_location("Stone Bridge", Location::world().with_coordinates(0.0, 9000.0))
            .unwrap();
        let report = JourneyEngine::new(EncounterRules::default(), FixedDice::always(1))
            .check_journey("Old Mill", "Stone Bridge", 9000.0, "forest", 4.0)
            .unwrap();
        (graph, report)
    }

    #[test]
    fn test_waypoint_at_segment_midpoint() {
        let (mut graph, report) = leg();
        let name = create_waypoint_location(&mut graph, &report, &report.segments[1], 10.0).unwrap();
        assert_eq!(name, "waypoint_old_mill_stone_bridge_seg2");

        let waypoint = graph.location(&name).unwrap();
        assert_eq!(waypoint.coordinates, Some(Coordinates::new(0.0, 4500.0)));
        assert_eq!(waypoint.diameter_meters, Some(10.0));
        assert!(is_waypoint(&graph, &name));

        let back = graph.connection_between(&name, "Old Mill").unwrap();
        let forward = graph.connection_between(&name, "Stone Bridge").unwrap();
        assert_eq!(back.path.as_deref(), Some("turn back"));
        assert_eq!(forward.path.as_deref(), Some("continue forward"));
        assert_eq!(
            back.distance_meters.unwrap() + forward.distance_meters.unwrap(),
            9000.0
        );
    }

    #[test]
    fn test_waypoint_options() {
        let (mut graph, report) = leg();
        let name = create_waypoint_location(&mut graph, &report, &report.segments[0], 10.0).unwrap();
        let options = get_waypoint_options(&graph, &name).unwrap();
        assert_eq!(options.back.to, "Old Mill");
        assert_eq!(options.back.distance_m, 1500.0);
        assert_eq!(options.forward.to, "Stone Bridge");
        assert_eq!(options.forward.distance_m, 7500.0);
        assert_eq!(options.forward.segment_start, Some(1));
    }

    #[test]
    fn test_cleanup_only_removes_waypoints() {
        let (mut graph, report) = leg();
        let name = create_waypoint_location(&mut graph, &report, &report.segments[0], 10.0).unwrap();

        assert!(matches!(
            cleanup_waypoint(&mut graph, "Old Mill"),
            Err(NavError::NotAWaypoint(_))
        ));
        cleanup_waypoint(&mut graph, &name).unwrap();
        assert!(!graph.contains(&name));
        assert!(graph.neighbors("Old Mill").is_empty());
        assert!(graph.neighbors("Stone Bridge").is_empty());
    }

    #[test]
    fn test_duplicate_waypoint_rejected() {
        let (mut graph, report) = leg();
        create_waypoint_location(&mut graph, &report, &report.segments[0], 10.0).unwrap();
        let err = create_waypoint_location(&mut graph, &report, &report.segments[0], 10.0).unwrap_err();
        assert!(matches!(err, NavError::AlreadyExists(_)));
    }
}
