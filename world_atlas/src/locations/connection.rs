//! Connection (edge) records.

use serde::{Deserialize, Serialize};

/// Terrain assumed when an edge does not name one.
pub const DEFAULT_TERRAIN: &str = "open";

/// An edge as stored on its canonical owner, or as synthesized for the
/// other endpoint by [`LocationGraph::connections_of`].
///
/// `bearing` always points from the location holding this record towards
/// `to`.
///
/// [`LocationGraph::connections_of`]: crate::LocationGraph::connections_of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    /// Degrees, 0 = North, clockwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain: Option<String>,
    /// Free-text description of the way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Connection {
    /// Terrain of this edge, falling back to [`DEFAULT_TERRAIN`].
    pub fn terrain_or_default(&self) -> &str {
        self.terrain.as_deref().unwrap_or(DEFAULT_TERRAIN)
    }

    /// Distance usable for traversal (present and positive).
    pub fn traversable_distance(&self) -> Option<f64> {
        self.distance_meters.filter(|d| *d > 0.0)
    }

    /// Edge metadata without the target name.
    pub fn meta(&self) -> EdgeMeta {
        EdgeMeta {
            distance_meters: self.distance_meters,
            bearing: self.bearing,
            terrain: self.terrain.clone(),
            path: self.path.clone(),
        }
    }
}

/// Metadata for a new edge. The bearing is expressed from the first
/// endpoint passed to [`LocationGraph::add_connection`].
///
/// [`LocationGraph::add_connection`]: crate::LocationGraph::add_connection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeMeta {
    pub distance_meters: Option<f64>,
    pub bearing: Option<f64>,
    pub terrain: Option<String>,
    pub path: Option<String>,
}

impl EdgeMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.distance_meters = Some(meters);
        self
    }

    pub fn with_bearing(mut self, degrees: f64) -> Self {
        self.bearing = Some(degrees);
        self
    }

    pub fn with_terrain(mut self, terrain: impl Into<String>) -> Self {
        self.terrain = Some(terrain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub(crate) fn into_connection(self, to: impl Into<String>) -> Connection {
        Connection {
            to: to.into(),
            distance_meters: self.distance_meters,
            bearing: self.bearing,
            terrain: self.terrain,
            path: self.path,
        }
    }
}
