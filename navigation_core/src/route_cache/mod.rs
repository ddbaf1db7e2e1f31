//! Route Preference Cache - remembers how the operator wants travel
//! between two locations handled and suggests a travel method.
//!
//! Suggestion order:
//! 1. a cached preference, honored verbatim;
//! 2. a stored edge with a distance, used without prompting;
//! 3. otherwise a `NeedsDecision` result listing the options.

mod decision;

pub use decision::*;

use chrono::Utc;
use tracing::{debug, info};

use world_atlas::{
    bearing_between, compass_of, direct_distance, is_bearing_blocked, preference_key,
    round_bearing, round_meters, BlockCheck, CampaignState, CompassPoint, NavError,
    RouteDecision, RoutePreference, BLOCK_TOLERANCE_DEG,
};

use crate::pathfinder::{find_all_routes, Route};

/// Straight-line travel computed from coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectPath {
    pub distance_meters: f64,
    pub bearing: f64,
    pub compass: CompassPoint,
    pub block: BlockCheck,
}

impl DirectPath {
    pub fn is_blocked(&self) -> bool {
        self.block.is_blocked()
    }
}

/// Everything known about getting from one location to another.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteAnalysis {
    pub from: String,
    pub to: String,
    /// `None` when either endpoint lacks coordinates.
    pub direct: Option<DirectPath>,
    /// Candidate routes over stored edges, shortest first.
    pub routes: Vec<Route>,
}

/// Choices offered to the operator when no decision exists yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecisionOptions {
    /// Offered only when the straight line is not blocked.
    pub direct: Option<DirectPath>,
    /// The shortest known route.
    pub use_route: Option<Route>,
    pub blocked_reason: Option<String>,
}

/// Where a direct suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectSource {
    CachedDecision,
    StoredEdge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationSuggestion {
    Direct {
        source: DirectSource,
        distance_meters: Option<f64>,
        bearing: Option<f64>,
        terrain: Option<String>,
    },
    Route {
        route: Vec<String>,
    },
    Blocked {
        reason: String,
    },
    NeedsDecision {
        options: DecisionOptions,
        analysis: RouteAnalysis,
    },
}

impl NavigationSuggestion {
    pub fn needs_decision(&self) -> bool {
        matches!(self, NavigationSuggestion::NeedsDecision { .. })
    }

    /// Operator-facing summary.
    pub fn message(&self) -> String {
        match self {
            NavigationSuggestion::Direct {
                source: DirectSource::CachedDecision,
                ..
            } => "Going direct (saved decision)".to_string(),
            NavigationSuggestion::Direct {
                distance_meters, ..
            } => match distance_meters {
                Some(d) => format!("Direct path: {}m", d),
                None => "Direct path".to_string(),
            },
            NavigationSuggestion::Route { route } => format!(
                "Using the known route through {} intermediate stops",
                route.len().saturating_sub(2)
            ),
            NavigationSuggestion::Blocked { reason } => format!("Path is blocked: {}", reason),
            NavigationSuggestion::NeedsDecision { analysis, .. } => format!(
                "Operator decision needed: how to get from {} to {}?",
                analysis.from, analysis.to
            ),
        }
    }
}

/// Route preferences and suggestions over a loaded campaign.
pub struct RouteCache<'a> {
    state: &'a mut CampaignState,
    route_count: usize,
}

impl<'a> RouteCache<'a> {
    /// `route_count` bounds how many candidate routes analysis enumerates.
    pub fn new(state: &'a mut CampaignState, route_count: usize) -> Self {
        Self { state, route_count }
    }

    pub fn get_cached_decision(&self, from: &str, to: &str) -> Option<&RoutePreference> {
        self.state
            .overview
            .path_preferences
            .get(&preference_key(from, to))
    }

    /// Store (or overwrite) the decision for this pair.
    pub fn cache_decision(&mut self, from: &str, to: &str, decision: RouteDecision) {
        let key = preference_key(from, to);
        info!(%key, ?decision, "route decision cached");
        self.state.overview.path_preferences.insert(
            key,
            RoutePreference {
                decision,
                decided_at: Utc::now(),
            },
        );
    }

    /// Straight-line geometry between two known locations, `None` when
    /// either lacks coordinates.
    pub fn direct_path(&self, from: &str, to: &str) -> Result<Option<DirectPath>, NavError> {
        let graph = &self.state.locations;
        let origin = graph.require(from)?;
        let target = graph.require(to)?;

        Ok(match (origin.coordinates, target.coordinates) {
            (Some(a), Some(b)) => {
                let bearing = round_bearing(bearing_between(a, b));
                Some(DirectPath {
                    distance_meters: round_meters(direct_distance(a, b)),
                    bearing,
                    compass: compass_of(bearing),
                    block: is_bearing_blocked(origin, bearing, BLOCK_TOLERANCE_DEG),
                })
            }
            _ => None,
        })
    }

    pub fn analyze_route_options(&self, from: &str, to: &str) -> Result<RouteAnalysis, NavError> {
        let direct = self.direct_path(from, to)?;
        Ok(self.analysis_with(from, to, direct))
    }

    /// Route enumeration grows quickly with graph density, so it runs last.
    fn analysis_with(&self, from: &str, to: &str, direct: Option<DirectPath>) -> RouteAnalysis {
        let routes = find_all_routes(&self.state.locations, from, to, self.route_count);
        debug!(from, to, routes = routes.len(), has_direct = direct.is_some(), "route analysis");

        RouteAnalysis {
            from: from.to_string(),
            to: to.to_string(),
            direct,
            routes,
        }
    }

    pub fn suggest_navigation(&self, from: &str, to: &str) -> Result<NavigationSuggestion, NavError> {
        if let Some(pref) = self.get_cached_decision(from, to) {
            return match &pref.decision {
                RouteDecision::Blocked { reason } => Ok(NavigationSuggestion::Blocked {
                    reason: reason.clone().unwrap_or_else(|| "unknown reason".to_string()),
                }),
                RouteDecision::UseRoute { route } => Ok(NavigationSuggestion::Route {
                    route: route.clone(),
                }),
                RouteDecision::Direct => {
                    let direct = self.direct_path(from, to)?;
                    Ok(NavigationSuggestion::Direct {
                        source: DirectSource::CachedDecision,
                        distance_meters: direct.as_ref().map(|d| d.distance_meters),
                        bearing: direct.as_ref().map(|d| d.bearing),
                        terrain: None,
                    })
                }
            };
        }

        let direct = self.direct_path(from, to)?;

        if let Some(conn) = self.state.locations.connection_between(from, to) {
            if let Some(distance) = conn.traversable_distance() {
                return Ok(NavigationSuggestion::Direct {
                    source: DirectSource::StoredEdge,
                    distance_meters: Some(distance),
                    bearing: conn.bearing,
                    terrain: Some(conn.terrain_or_default().to_string()),
                });
            }
        }

        let analysis = self.analysis_with(from, to, direct);
        let mut options = DecisionOptions {
            use_route: analysis.routes.first().cloned(),
            ..Default::default()
        };
        if let Some(direct) = &analysis.direct {
            if direct.is_blocked() {
                options.blocked_reason = direct.block.reason();
            } else if direct.distance_meters > 0.0 {
                options.direct = Some(direct.clone());
            }
        }

        Ok(NavigationSuggestion::NeedsDecision { options, analysis })
    }
}
