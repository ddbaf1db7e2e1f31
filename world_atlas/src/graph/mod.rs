//! Location Graph - canonical connection storage over the location mapping.
//!
//! Every edge is stored exactly once, on the endpoint whose name sorts
//! first (the canonical owner). The stored bearing always points from the
//! owner to the other endpoint; readers asking from the other side receive a
//! synthesized copy with the endpoints swapped and the bearing reversed.
//!
//! All edge mutation goes through this type. Other components can read a
//! location's owned edges but cannot splice them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::NavError;
use crate::geometry::reverse_bearing;
use crate::locations::{Connection, EdgeMeta, Location};

/// The two endpoints of an edge in canonical (lexicographic) order.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A deduplicated edge as stored by its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<'a> {
    pub owner: &'a str,
    pub connection: &'a Connection,
}

impl Edge<'_> {
    pub fn other(&self) -> &str {
        &self.connection.to
    }
}

/// All locations of a campaign keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationGraph {
    locations: BTreeMap<String, Location>,
}

impl LocationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.get(name)
    }

    /// Mutable access to everything except the owned edge list.
    pub fn location_mut(&mut self, name: &str) -> Option<&mut Location> {
        self.locations.get_mut(name)
    }

    /// Like [`location`](Self::location) but failing with `LocationNotFound`.
    pub fn require(&self, name: &str) -> Result<&Location, NavError> {
        self.locations
            .get(name)
            .ok_or_else(|| NavError::LocationNotFound(name.to_string()))
    }

    pub fn require_mut(&mut self, name: &str) -> Result<&mut Location, NavError> {
        self.locations
            .get_mut(name)
            .ok_or_else(|| NavError::LocationNotFound(name.to_string()))
    }

    /// All location names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Location)> {
        self.locations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add a new location.
    pub fn insert_location(
        &mut self,
        name: impl Into<String>,
        location: Location,
    ) -> Result<(), NavError> {
        let name = name.into();
        if self.locations.contains_key(&name) {
            return Err(NavError::AlreadyExists(name));
        }
        self.locations.insert(name, location);
        Ok(())
    }

    /// Delete a location together with every edge that names it.
    pub fn remove_location(&mut self, name: &str) -> Option<Location> {
        let removed = self.locations.remove(name)?;
        for location in self.locations.values_mut() {
            location.connections.retain(|c| c.to != name);
        }
        Some(removed)
    }

    /// Every edge touching `name`: owned edges as stored plus reversed
    /// copies of edges owned by the other endpoint.
    pub fn connections_of(&self, name: &str) -> Vec<Connection> {
        let Some(location) = self.locations.get(name) else {
            return Vec::new();
        };

        let mut result: Vec<Connection> = location.connections.clone();

        for (other_name, other) in &self.locations {
            if other_name == name {
                continue;
            }
            for conn in other.connections.iter().filter(|c| c.to == name) {
                let mut reverse = conn.clone();
                reverse.to = other_name.clone();
                reverse.bearing = conn.bearing.map(reverse_bearing);
                result.push(reverse);
            }
        }

        result
    }

    /// Names of all locations sharing an edge with `name`.
    pub fn neighbors(&self, name: &str) -> Vec<String> {
        self.connections_of(name).into_iter().map(|c| c.to).collect()
    }

    /// The raw stored record between `a` and `b`, wherever it lives.
    pub fn connection_between(&self, a: &str, b: &str) -> Option<&Connection> {
        let (first, second) = canonical_pair(a, b);
        self.find_owned(first, second)
            .or_else(|| self.find_owned(second, first))
    }

    fn find_owned(&self, owner: &str, to: &str) -> Option<&Connection> {
        self.locations
            .get(owner)?
            .connections
            .iter()
            .find(|c| c.to == to)
    }

    /// Store an edge between `a` and `b` on the canonical owner.
    ///
    /// `meta.bearing` is read as "from `a`" and flipped when `b` owns the
    /// edge. Returns `false` without changes when either endpoint is missing,
    /// `a == b`, or an edge already exists.
    pub fn add_connection(&mut self, a: &str, b: &str, meta: EdgeMeta) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        if self.connection_between(a, b).is_some() {
            return false;
        }

        let (first, second) = canonical_pair(a, b);
        let mut conn = meta.into_connection(second);
        if a != first {
            conn.bearing = conn.bearing.map(reverse_bearing);
        }

        match self.locations.get_mut(first) {
            Some(owner) => {
                owner.connections.push(conn);
                true
            }
            None => false,
        }
    }

    /// Delete the edge between `a` and `b` from wherever it is stored.
    /// Returns whether anything was removed.
    pub fn remove_connection(&mut self, a: &str, b: &str) -> bool {
        let mut removed = false;
        for (owner, other) in [(a, b), (b, a)] {
            if let Some(location) = self.locations.get_mut(owner) {
                let before = location.connections.len();
                location.connections.retain(|c| c.to != other);
                removed |= location.connections.len() != before;
            }
        }
        removed
    }

    /// Each edge once, for rendering and whole-graph scans.
    pub fn unique_edges(&self) -> Vec<Edge<'_>> {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut edges = Vec::new();

        for (owner, location) in &self.locations {
            for conn in &location.connections {
                if conn.to.is_empty() {
                    continue;
                }
                if seen.insert(canonical_pair(owner.as_str(), conn.to.as_str())) {
                    edges.push(Edge {
                        owner: owner.as_str(),
                        connection: conn,
                    });
                }
            }
        }

        edges
    }

    /// Edges naming locations that do not exist.
    pub fn dangling_edges(&self) -> Vec<(String, String)> {
        self.unique_edges()
            .into_iter()
            .filter(|e| !self.contains(e.other()))
            .map(|e| (e.owner.to_string(), e.other().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(names: &[&str]) -> LocationGraph {
        let mut graph = LocationGraph::new();
        for name in names {
            graph.insert_location(*name, Location::world()).unwrap();
        }
        graph
    }

    #[test]
    fn test_canonical_pair() {
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
    }

    #[test]
    fn test_edge_stored_on_first_name() {
        let mut graph = graph_with(&["Alder", "Birch"]);
        assert!(graph.add_connection("Birch", "Alder", EdgeMeta::new().with_distance(100.0)));

        assert_eq!(graph.location("Alder").unwrap().connections().len(), 1);
        assert!(graph.location("Birch").unwrap().connections().is_empty());
    }

    #[test]
    fn test_bearing_flipped_when_caller_is_not_owner() {
        let mut graph = graph_with(&["Alder", "Birch"]);
        graph.add_connection("Birch", "Alder", EdgeMeta::new().with_bearing(90.0));

        let stored = graph.connection_between("Alder", "Birch").unwrap();
        assert_eq!(stored.bearing, Some(270.0));
    }

    #[test]
    fn test_both_sides_see_complementary_bearings() {
        let mut graph = graph_with(&["Alder", "Birch"]);
        graph.add_connection("Alder", "Birch", EdgeMeta::new().with_bearing(30.0));

        let from_a = graph.connections_of("Alder");
        let from_b = graph.connections_of("Birch");
        assert_eq!(from_a[0].to, "Birch");
        assert_eq!(from_a[0].bearing, Some(30.0));
        assert_eq!(from_b[0].to, "Alder");
        assert_eq!(from_b[0].bearing, Some(210.0));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut graph = graph_with(&["Alder", "Birch"]);
        assert!(graph.add_connection("Alder", "Birch", EdgeMeta::new().with_distance(5.0)));
        let snapshot = graph.clone();
        assert!(!graph.add_connection("Birch", "Alder", EdgeMeta::new().with_distance(9.0)));
        assert_eq!(graph, snapshot);
    }

    #[test]
    fn test_add_with_missing_endpoint_is_noop() {
        let mut graph = graph_with(&["Alder"]);
        assert!(!graph.add_connection("Alder", "Ghost", EdgeMeta::new()));
        assert!(graph.connections_of("Alder").is_empty());
    }

    #[test]
    fn test_remove_from_either_side() {
        let mut graph = graph_with(&["Alder", "Birch"]);
        graph.add_connection("Alder", "Birch", EdgeMeta::new());
        assert!(graph.remove_connection("Birch", "Alder"));
        assert!(graph.connection_between("Alder", "Birch").is_none());
        assert!(!graph.remove_connection("Alder", "Birch"));
    }

    #[test]
    fn test_unique_edges_deduplicates_legacy_double_storage() {
        let raw = serde_json::json!({
            "A": {"connections": [{"to": "B", "distance_meters": 10.0}]},
            "B": {"connections": [{"to": "A", "distance_meters": 10.0}]},
            "C": {"connections": []}
        });
        let graph: LocationGraph = serde_json::from_value(raw).unwrap();
        assert_eq!(graph.unique_edges().len(), 1);
    }

    #[test]
    fn test_remove_location_purges_edges() {
        let mut graph = graph_with(&["Alder", "Birch", "Cedar"]);
        graph.add_connection("Alder", "Cedar", EdgeMeta::new());
        graph.add_connection("Birch", "Cedar", EdgeMeta::new());

        graph.remove_location("Cedar");
        assert!(graph.dangling_edges().is_empty());
        assert!(graph.connections_of("Alder").is_empty());
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let mut graph = graph_with(&["Alder"]);
        let err = graph.insert_location("Alder", Location::world()).unwrap_err();
        assert!(matches!(err, NavError::AlreadyExists(_)));
    }
}
