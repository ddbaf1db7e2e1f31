//! Intersection Detector - finds locations whose footprint a straight
//! path crosses, and rewires edges to pass through them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use world_atlas::{
    bearing_between, direct_distance, point_to_segment_distance, round_bearing, round_meters,
    Coordinates, EdgeMeta, LocationGraph, NavError, NavigationConfig, DEFAULT_TERRAIN,
};

/// Footprint test parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintRules {
    /// Multiplier applied to each footprint radius.
    pub buffer: f64,
    pub default_diameter_meters: f64,
}

impl Default for FootprintRules {
    fn default() -> Self {
        Self::from(&NavigationConfig::default())
    }
}

impl From<&NavigationConfig> for FootprintRules {
    fn from(config: &NavigationConfig) -> Self {
        Self {
            buffer: config.intersection_buffer,
            default_diameter_meters: config.default_diameter_meters,
        }
    }
}

fn endpoint_coordinates(graph: &LocationGraph, name: &str) -> Result<Coordinates, NavError> {
    graph
        .require(name)?
        .coordinates
        .ok_or_else(|| NavError::MissingCoordinates(name.to_string()))
}

/// Locations (other than the endpoints) whose buffered footprint circle
/// touches the segment `start -> end`, in name order.
///
/// Locations without coordinates and vehicle rooms, which live on a
/// vehicle's local map, are never considered.
pub fn check_path_intersection(
    graph: &LocationGraph,
    start: &str,
    end: &str,
    rules: FootprintRules,
) -> Result<Vec<String>, NavError> {
    let a = endpoint_coordinates(graph, start)?;
    let b = endpoint_coordinates(graph, end)?;

    let hits = graph
        .iter()
        .filter(|(name, _)| *name != start && *name != end)
        .filter(|(_, location)| !location.is_vehicle_room())
        .filter_map(|(name, location)| {
            let center = location.coordinates?;
            let diameter = location
                .diameter_meters
                .unwrap_or(rules.default_diameter_meters);
            let radius = diameter / 2.0 * rules.buffer;
            (point_to_segment_distance(center, a, b) <= radius).then(|| name.to_string())
        })
        .collect();

    Ok(hits)
}

/// `start`, then every intersected location ordered by distance from
/// `start`, then `end`.
pub fn route_with_waypoints(
    graph: &LocationGraph,
    start: &str,
    end: &str,
    rules: FootprintRules,
) -> Result<Vec<String>, NavError> {
    let origin = endpoint_coordinates(graph, start)?;
    let mut stops: Vec<(f64, String)> = check_path_intersection(graph, start, end, rules)?
        .into_iter()
        .filter_map(|name| {
            let coords = graph.location(&name)?.coordinates?;
            Some((direct_distance(origin, coords), name))
        })
        .collect();
    stops.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut route = Vec::with_capacity(stops.len() + 2);
    route.push(start.to_string());
    route.extend(stops.into_iter().map(|(_, name)| name));
    route.push(end.to_string());
    Ok(route)
}

/// One edge that was (or would be) replaced by a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSplit {
    pub from: String,
    pub to: String,
    /// The full replacement chain including both endpoints.
    pub route: Vec<String>,
    /// Legs created by the split.
    pub added: Vec<(String, String)>,
    /// Legs that already existed and were left alone.
    pub kept: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitReport {
    pub dry_run: bool,
    pub splits: Vec<PathSplit>,
}

impl SplitReport {
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }
}

/// Replace every edge whose straight segment crosses a third location's
/// footprint with a chain of legs through the crossed locations.
///
/// With `dry_run` the graph is left untouched and the report describes what
/// would change. A graph without crossing edges is left unchanged.
pub fn split_intersecting_paths(
    graph: &mut LocationGraph,
    dry_run: bool,
    rules: FootprintRules,
) -> SplitReport {
    let snapshot: Vec<(String, String, String)> = graph
        .unique_edges()
        .into_iter()
        .map(|e| {
            (
                e.owner.to_string(),
                e.other().to_string(),
                e.connection.terrain_or_default().to_string(),
            )
        })
        .collect();

    let mut report = SplitReport {
        dry_run,
        splits: Vec::new(),
    };

    for (from, to, terrain) in snapshot {
        if !graph.contains(&to) || graph.connection_between(&from, &to).is_none() {
            continue;
        }
        let route = match route_with_waypoints(graph, &from, &to, rules) {
            Ok(route) => route,
            Err(err) => {
                debug!(%from, %to, %err, "edge skipped by split pass");
                continue;
            }
        };
        if route.len() <= 2 {
            continue;
        }

        info!(%from, %to, through = ?&route[1..route.len() - 1], dry_run, "splitting path");

        if !dry_run {
            graph.remove_connection(&from, &to);
        }

        let mut split = PathSplit {
            from: from.clone(),
            to: to.clone(),
            route: route.clone(),
            added: Vec::new(),
            kept: Vec::new(),
        };

        for leg in route.windows(2) {
            let (a, b) = (leg[0].as_str(), leg[1].as_str());
            let pair = (a.to_string(), b.to_string());
            if graph.connection_between(a, b).is_some() {
                split.kept.push(pair);
                continue;
            }
            if dry_run || add_measured_leg(graph, a, b, &terrain) {
                split.added.push(pair);
            }
        }

        report.splits.push(split);
    }

    report
}

/// Add an edge whose distance and bearing come from the endpoints'
/// coordinates. Returns `false` when either endpoint lacks coordinates.
pub(crate) fn add_measured_leg(graph: &mut LocationGraph, a: &str, b: &str, terrain: &str) -> bool {
    let (Some(pa), Some(pb)) = (
        graph.location(a).and_then(|l| l.coordinates),
        graph.location(b).and_then(|l| l.coordinates),
    ) else {
        return false;
    };

    let distance = round_meters(direct_distance(pa, pb));
    let bearing = round_bearing(bearing_between(pa, pb));
    let terrain = if terrain.is_empty() {
        DEFAULT_TERRAIN
    } else {
        terrain
    };

    graph.add_connection(
        a,
        b,
        EdgeMeta::new()
            .with_distance(distance)
            .with_bearing(bearing)
            .with_terrain(terrain)
            .with_path(format!("{}m at {}°", distance, bearing)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_atlas::Location;

    fn place(graph: &mut LocationGraph, name: &str, x: f64, y: f64, d: f64) {
        graph
            .insert_location(name, Location::world().with_coordinates(x, y).with_diameter(d))
            .unwrap();
    }

    fn sample() -> LocationGraph {
        let mut graph = LocationGraph::new();
        place(&mut graph, "A", 0.0, 0.0, 100.0);
        place(&mut graph, "B", 1000.0, 0.0, 100.0);
        place(&mut graph, "C", 500.0, 50.0, 150.0);
        place(&mut graph, "D", 500.0, 500.0, 50.0);
        graph
    }

    #[test]
    fn test_intersection_includes_crossed_footprint() {
        let hits = check_path_intersection(&sample(), "A", "B", FootprintRules::default()).unwrap();
        assert_eq!(hits, ["C"]);
    }

    #[test]
    fn test_buffer_widens_footprint() {
        let rules = FootprintRules {
            buffer: 30.0,
            ..FootprintRules::default()
        };
        let hits = check_path_intersection(&sample(), "A", "B", rules).unwrap();
        assert!(hits.contains(&"D".to_string()));
    }

    #[test]
    fn test_missing_coordinates_is_error() {
        let mut graph = sample();
        graph.insert_location("Fog", Location::world()).unwrap();
        let err = check_path_intersection(&graph, "A", "Fog", FootprintRules::default()).unwrap_err();
        assert!(matches!(err, NavError::MissingCoordinates(_)));
    }

    #[test]
    fn test_route_with_waypoints_orders_by_distance() {
        let mut graph = sample();
        place(&mut graph, "Ford", 200.0, -10.0, 40.0);
        let route = route_with_waypoints(&graph, "B", "A", FootprintRules::default()).unwrap();
        assert_eq!(route, ["B", "C", "Ford", "A"]);
    }

    #[test]
    fn test_split_replaces_edge_with_chain() {
        let mut graph = sample();
        graph.add_connection("A", "B", EdgeMeta::new().with_distance(1000.0).with_terrain("road"));

        let report = split_intersecting_paths(&mut graph, false, FootprintRules::default());
        assert_eq!(report.splits.len(), 1);
        assert_eq!(report.splits[0].route, ["A", "C", "B"]);

        assert!(graph.connection_between("A", "B").is_none());
        let leg = graph.connection_between("A", "C").unwrap();
        assert_eq!(leg.distance_meters, Some(502.0));
        assert_eq!(leg.terrain.as_deref(), Some("road"));
        assert!(graph.connection_between("B", "C").is_some());
    }

    #[test]
    fn test_split_dry_run_leaves_graph() {
        let mut graph = sample();
        graph.add_connection("A", "B", EdgeMeta::new().with_distance(1000.0));
        let before = graph.clone();

        let report = split_intersecting_paths(&mut graph, true, FootprintRules::default());
        assert!(report.dry_run);
        assert_eq!(report.splits[0].added.len(), 2);
        assert_eq!(graph, before);
    }

    #[test]
    fn test_split_is_fixed_point_without_crossings() {
        let mut graph = sample();
        graph.add_connection("A", "C", EdgeMeta::new().with_distance(502.0));
        graph.add_connection("A", "D", EdgeMeta::new().with_distance(707.0));
        let before = graph.clone();

        let report = split_intersecting_paths(&mut graph, false, FootprintRules::default());
        assert!(report.is_empty());
        assert_eq!(graph, before);
    }
}
