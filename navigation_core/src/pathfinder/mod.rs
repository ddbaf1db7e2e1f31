//! Route discovery over the location graph.
//!
//! [`find_route`] is a fewest-hops breadth-first search: it returns the
//! first path discovered by hop count and merely reports the summed edge
//! distance. Use [`find_shortest_route`] when distance-optimal routing is
//! wanted.
//!
//! Traversal only follows edges with a positive `distance_meters`, except
//! for [`is_reachable`] which treats any stored edge as passable.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use tracing::debug;

use world_atlas::{canonical_pair, LocationGraph};

/// A discovered path with its accumulated cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<String>,
    pub distance_meters: f64,
    pub hops: usize,
    /// Terrain of each hop, in travel order.
    pub terrains: Vec<String>,
}

impl Route {
    fn start(from: &str) -> Self {
        Self {
            path: vec![from.to_string()],
            distance_meters: 0.0,
            hops: 0,
            terrains: Vec::new(),
        }
    }

    fn extended(&self, next: &str, distance: f64, terrain: &str) -> Self {
        let mut path = self.path.clone();
        path.push(next.to_string());
        let mut terrains = self.terrains.clone();
        terrains.push(terrain.to_string());
        Self {
            hops: path.len() - 1,
            path,
            distance_meters: self.distance_meters + distance,
            terrains,
        }
    }

    pub fn last(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// Locations strictly between the endpoints.
    pub fn intermediate_count(&self) -> usize {
        self.path.len().saturating_sub(2)
    }
}

/// Fewest-hops path from `from` to `to`.
pub fn find_route(graph: &LocationGraph, from: &str, to: &str) -> Option<Route> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }

    let mut queue = VecDeque::from([Route::start(from)]);
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(route) = queue.pop_front() {
        let current = route.last().to_string();
        if current == to {
            debug!(from, to, hops = route.hops, distance = route.distance_meters, "route found");
            return Some(route);
        }
        if !visited.insert(current.clone()) {
            continue;
        }

        for conn in graph.connections_of(&current) {
            let Some(distance) = conn.traversable_distance() else {
                continue;
            };
            if !visited.contains(&conn.to) {
                queue.push_back(route.extended(&conn.to, distance, conn.terrain_or_default()));
            }
        }
    }

    None
}

/// Up to `max_routes` simple paths, sorted ascending by distance.
///
/// Candidates never revisit a node or reuse an edge. Enumeration is
/// breadth-first, so the routes collected are the ones with the fewest hops
/// before they are ordered by distance.
pub fn find_all_routes(
    graph: &LocationGraph,
    from: &str,
    to: &str,
    max_routes: usize,
) -> Vec<Route> {
    if !graph.contains(from) || !graph.contains(to) || max_routes == 0 {
        return Vec::new();
    }

    let mut found: Vec<Route> = Vec::new();
    let mut queue: VecDeque<(Route, HashSet<(String, String)>)> =
        VecDeque::from([(Route::start(from), HashSet::new())]);

    while let Some((route, used_edges)) = queue.pop_front() {
        if found.len() >= max_routes {
            break;
        }
        let current = route.last().to_string();
        if current == to {
            found.push(route);
            continue;
        }

        for conn in graph.connections_of(&current) {
            let Some(distance) = conn.traversable_distance() else {
                continue;
            };
            if route.path.contains(&conn.to) {
                continue;
            }
            let (a, b) = canonical_pair(&current, &conn.to);
            let edge = (a.to_string(), b.to_string());
            if used_edges.contains(&edge) {
                continue;
            }

            let mut next_edges = used_edges.clone();
            next_edges.insert(edge);
            queue.push_back((
                route.extended(&conn.to, distance, conn.terrain_or_default()),
                next_edges,
            ));
        }
    }

    found.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    debug!(from, to, count = found.len(), "routes enumerated");
    found
}

#[derive(Debug, PartialEq)]
struct Frontier {
    cost: f64,
    name: String,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Distance-optimal path (Dijkstra over positive edge distances).
pub fn find_shortest_route(graph: &LocationGraph, from: &str, to: &str) -> Option<Route> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }

    let mut best: HashMap<String, f64> = HashMap::from([(from.to_string(), 0.0)]);
    let mut previous: HashMap<String, (String, String)> = HashMap::new();
    let mut heap = BinaryHeap::from([Frontier {
        cost: 0.0,
        name: from.to_string(),
    }]);

    while let Some(Frontier { cost, name }) = heap.pop() {
        if name == to {
            break;
        }
        if best.get(&name).is_some_and(|&known| cost > known) {
            continue;
        }

        for conn in graph.connections_of(&name) {
            let Some(distance) = conn.traversable_distance() else {
                continue;
            };
            let candidate = cost + distance;
            if best.get(&conn.to).map_or(true, |&known| candidate < known) {
                best.insert(conn.to.clone(), candidate);
                previous.insert(
                    conn.to.clone(),
                    (name.clone(), conn.terrain_or_default().to_string()),
                );
                heap.push(Frontier {
                    cost: candidate,
                    name: conn.to,
                });
            }
        }
    }

    let total = *best.get(to)?;

    let mut path = vec![to.to_string()];
    let mut terrains = Vec::new();
    let mut cursor = to.to_string();
    while let Some((prev, terrain)) = previous.get(&cursor) {
        path.push(prev.clone());
        terrains.push(terrain.clone());
        cursor = prev.clone();
    }
    path.reverse();
    terrains.reverse();

    Some(Route {
        hops: path.len() - 1,
        path,
        distance_meters: total,
        terrains,
    })
}

/// Whether `to` can be reached from `from` along any stored edges.
pub fn is_reachable(graph: &LocationGraph, from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }

    let mut visited: HashSet<String> = HashSet::from([from.to_string()]);
    let mut queue = VecDeque::from([from.to_string()]);

    while let Some(current) = queue.pop_front() {
        for neighbor in graph.neighbors(&current) {
            if neighbor == to {
                return true;
            }
            if graph.contains(&neighbor) && visited.insert(neighbor.clone()) {
                queue.push_back(neighbor);
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_atlas::{EdgeMeta, Location};

    fn graph(names: &[&str], edges: &[(&str, &str, f64)]) -> LocationGraph {
        let mut graph = LocationGraph::new();
        for name in names {
            graph.insert_location(*name, Location::world()).unwrap();
        }
        for (a, b, d) in edges {
            graph.add_connection(a, b, EdgeMeta::new().with_distance(*d));
        }
        graph
    }

    #[test]
    fn test_find_route_chain() {
        let g = graph(&["A", "B", "C"], &[("A", "B", 100.0), ("B", "C", 100.0)]);
        let route = find_route(&g, "A", "C").unwrap();
        assert_eq!(route.path, ["A", "B", "C"]);
        assert_eq!(route.distance_meters, 200.0);
        assert_eq!(route.hops, 2);
    }

    #[test]
    fn test_find_route_prefers_fewer_hops_over_distance() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[
                ("A", "D", 10_000.0),
                ("A", "B", 10.0),
                ("B", "C", 10.0),
                ("C", "D", 10.0),
            ],
        );
        let route = find_route(&g, "A", "D").unwrap();
        assert_eq!(route.path, ["A", "D"]);

        let shortest = find_shortest_route(&g, "A", "D").unwrap();
        assert_eq!(shortest.path, ["A", "B", "C", "D"]);
        assert_eq!(shortest.distance_meters, 30.0);
        assert_eq!(shortest.terrains.len(), 3);
    }

    #[test]
    fn test_zero_distance_edges_not_followed() {
        let g = graph(&["A", "B"], &[("A", "B", 0.0)]);
        assert!(find_route(&g, "A", "B").is_none());
        assert!(is_reachable(&g, "A", "B"));
    }

    #[test]
    fn test_missing_endpoint() {
        let g = graph(&["A"], &[]);
        assert!(find_route(&g, "A", "Nowhere").is_none());
        assert!(find_all_routes(&g, "A", "Nowhere", 3).is_empty());
        assert!(find_shortest_route(&g, "Nowhere", "A").is_none());
    }

    #[test]
    fn test_all_routes_sorted_and_simple() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[
                ("A", "B", 500.0),
                ("B", "D", 500.0),
                ("A", "C", 100.0),
                ("C", "D", 100.0),
                ("A", "D", 900.0),
            ],
        );
        let routes = find_all_routes(&g, "A", "D", 5);
        assert_eq!(routes.len(), 3);
        assert!(routes
            .windows(2)
            .all(|w| w[0].distance_meters <= w[1].distance_meters));
        assert_eq!(routes[0].path, ["A", "C", "D"]);
        for route in &routes {
            let unique: HashSet<_> = route.path.iter().collect();
            assert_eq!(unique.len(), route.path.len());
        }
    }

    #[test]
    fn test_all_routes_respects_limit() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[
                ("A", "B", 1.0),
                ("B", "D", 1.0),
                ("A", "C", 1.0),
                ("C", "D", 1.0),
                ("A", "D", 1.0),
            ],
        );
        assert_eq!(find_all_routes(&g, "A", "D", 2).len(), 2);
    }

    #[test]
    fn test_route_terrains() {
        let mut g = graph(&["A", "B", "C"], &[]);
        g.add_connection("A", "B", EdgeMeta::new().with_distance(1.0).with_terrain("forest"));
        g.add_connection("B", "C", EdgeMeta::new().with_distance(1.0));
        let routes = find_all_routes(&g, "A", "C", 1);
        assert_eq!(routes[0].terrains, ["forest", "open"]);
    }

    #[test]
    fn test_is_reachable_disconnected() {
        let g = graph(&["A", "B", "C"], &[("A", "B", 5.0)]);
        assert!(is_reachable(&g, "B", "A"));
        assert!(!is_reachable(&g, "A", "C"));
        assert!(is_reachable(&g, "C", "C"));
    }
}
