//! Navigator - the façade over a campaign store.
//!
//! Every operation is one full cycle: load the campaign, run the operation,
//! save. A failing operation returns before anything is written, so the
//! store never sees a half-applied change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

use world_atlas::{
    bearing_between, compass_of, coordinates_from, direct_distance, load_character,
    round_bearing, BlockedRange, CampaignState, CampaignStore, CompassPoint, Coordinates,
    DiceRoller, EdgeMeta, EncounterRules, Location, LocationType, NavError, NavigationConfig,
    RouteDecision, RoutePreference,
};

use crate::hierarchy::{
    ancestors_of, CompoundOptions, EntryPoint, HierarchyManager, HierarchyReport,
    InteriorOptions, PositionChange, Resolution, TreeNode,
};
use crate::intersection::{
    check_path_intersection, route_with_waypoints, split_intersecting_paths, FootprintRules,
    SplitReport,
};
use crate::journey::{
    cleanup_waypoint, create_waypoint_location, get_waypoint_options, is_waypoint, require_speed,
    JourneyEngine, JourneyReport, WaypointOptions,
};
use crate::layout::{Canvas, Layout, LayoutCache};
use crate::pathfinder::{find_all_routes, find_route, find_shortest_route, is_reachable, Route};
use crate::route_cache::{decide_route, DecisionOutcome, NavigationSuggestion, RouteAnalysis, RouteCache};
use crate::vehicle::{
    VehicleDestination, VehicleManager, VehicleMove, VehicleSpec, VehicleStatus, VehicleSummary,
};

/// Result of [`Navigator::add_location_with_coordinates`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedLocation {
    pub name: String,
    pub coordinates: Coordinates,
    pub direction: String,
    pub direction_abbr: String,
}

/// Result of [`Navigator::move_with_navigation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelOutcome {
    pub location: String,
    pub distance_meters: Option<f64>,
    pub elapsed_hours: f64,
}

pub struct Navigator<S: CampaignStore> {
    store: S,
    config: NavigationConfig,
}

impl<S: CampaignStore> Navigator<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, NavigationConfig::default())
    }

    pub fn with_config(store: S, config: NavigationConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn load_state(&self) -> Result<CampaignState, NavError> {
        Ok(CampaignState::load(&self.store)?)
    }

    /// Run `op` on a fresh copy of the campaign and save it on success.
    fn update<T>(
        &mut self,
        op: impl FnOnce(&mut CampaignState, &NavigationConfig) -> Result<T, NavError>,
    ) -> Result<T, NavError> {
        let mut state = self.load_state()?;
        let out = op(&mut state, &self.config)?;
        state.save(&mut self.store)?;
        Ok(out)
    }

    /// Run `op` on a copy of the campaign that is thrown away afterwards.
    fn inspect<T>(
        &self,
        op: impl FnOnce(&mut CampaignState, &NavigationConfig) -> Result<T, NavError>,
    ) -> Result<T, NavError> {
        let mut state = self.load_state()?;
        op(&mut state, &self.config)
    }

    fn footprint(&self) -> FootprintRules {
        FootprintRules::from(&self.config)
    }

    // --- map editing ---

    /// Place a new location `distance` meters along `bearing` from `from`
    /// and connect the two.
    pub fn add_location_with_coordinates(
        &mut self,
        name: &str,
        position: &str,
        from: &str,
        bearing: f64,
        distance: f64,
        terrain: &str,
    ) -> Result<PlacedLocation, NavError> {
        self.update(|state, _| {
            if state.locations.contains(name) {
                return Err(NavError::AlreadyExists(name.to_string()));
            }
            let origin = state
                .locations
                .require(from)?
                .coordinates
                .ok_or_else(|| NavError::MissingCoordinates(from.to_string()))?;
            let coords = coordinates_from(origin, distance, bearing);

            let mut location = Location::world().with_coordinates(coords.x, coords.y);
            location
                .extra
                .insert("position".to_string(), position.into());
            state.locations.insert_location(name, location)?;
            state.locations.add_connection(
                from,
                name,
                EdgeMeta::new()
                    .with_path(format!("{}m at {}°", distance, bearing))
                    .with_distance(distance.trunc())
                    .with_bearing(bearing)
                    .with_terrain(terrain),
            );

            let compass: CompassPoint = compass_of(bearing);
            info!(name, from, x = coords.x, y = coords.y, "location placed");
            Ok(PlacedLocation {
                name: name.to_string(),
                coordinates: coords,
                direction: compass.label.to_string(),
                direction_abbr: compass.abbreviation.to_string(),
            })
        })
    }

    /// Mark an arc around `location` as impassable. Overlapping an existing
    /// arc is allowed and only logged.
    pub fn block_direction(
        &mut self,
        location: &str,
        from_deg: f64,
        to_deg: f64,
        reason: &str,
    ) -> Result<(), NavError> {
        self.update(|state, _| {
            let target = state.locations.require_mut(location)?;
            for existing in target
                .blocked_ranges
                .iter()
                .filter(|r| r.overlaps(from_deg, to_deg))
            {
                warn!(
                    location,
                    from = existing.from_deg,
                    to = existing.to_deg,
                    "blocked range overlaps an existing one"
                );
            }
            target
                .blocked_ranges
                .push(BlockedRange::new(from_deg, to_deg, reason));
            info!(location, from_deg, to_deg, reason, "direction blocked");
            Ok(())
        })
    }

    /// Remove the arc with exactly these bounds.
    pub fn unblock_direction(&mut self, location: &str, from_deg: f64, to_deg: f64) -> Result<(), NavError> {
        self.update(|state, _| {
            let target = state.locations.require_mut(location)?;
            let before = target.blocked_ranges.len();
            target
                .blocked_ranges
                .retain(|r| !(r.from_deg == from_deg && r.to_deg == to_deg));
            if target.blocked_ranges.len() == before {
                return Err(NavError::BlockedRangeNotFound {
                    location: location.to_string(),
                    from_deg,
                    to_deg,
                });
            }
            info!(location, from_deg, to_deg, "direction unblocked");
            Ok(())
        })
    }

    /// Connect two existing locations. The bearing is derived from
    /// coordinates when both endpoints have them.
    pub fn connect_with_metadata(
        &mut self,
        from: &str,
        to: &str,
        path: &str,
        terrain: Option<&str>,
        distance: Option<f64>,
    ) -> Result<(), NavError> {
        self.update(|state, _| {
            let a = state.locations.require(from)?.coordinates;
            let b = state.locations.require(to)?.coordinates;
            if state.locations.connection_between(from, to).is_some() {
                return Err(NavError::ConnectionExists {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }

            let mut meta = EdgeMeta::new().with_path(path);
            if let Some(terrain) = terrain {
                meta = meta.with_terrain(terrain);
            }
            if let Some(distance) = distance {
                meta = meta.with_distance(distance.trunc());
            }
            if let (Some(a), Some(b)) = (a, b) {
                meta = meta.with_bearing(round_bearing(bearing_between(a, b)));
            }

            if !state.locations.add_connection(from, to, meta) {
                return Err(NavError::NoConnection {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            info!(from, to, "locations connected");
            Ok(())
        })
    }

    /// Travel along a stored edge from the current location to `target`.
    /// Elapsed time uses the character's speed, or the configured default,
    /// scaled by `speed_multiplier`. A resulting speed that is not positive
    /// is an error.
    pub fn move_with_navigation(
        &mut self,
        target: &str,
        speed_multiplier: f64,
    ) -> Result<TravelOutcome, NavError> {
        let character = load_character(&self.store)?;
        self.update(|state, config| {
            let base = character
                .as_ref()
                .and_then(|c| c.speed_kmh)
                .unwrap_or(config.travel_speed_kmh);
            let speed = require_speed(base * speed_multiplier)?;

            let current = state.position().current()?.to_string();
            state.locations.require(target)?;
            if current == target {
                return Err(NavError::AlreadyAtLocation(target.to_string()));
            }
            let distance = state
                .locations
                .connection_between(&current, target)
                .ok_or_else(|| NavError::NoConnection {
                    from: current.clone(),
                    to: target.to_string(),
                })?
                .traversable_distance();

            let elapsed_hours = match distance {
                Some(meters) => meters / 1000.0 / speed,
                None => {
                    warn!(from = %current, to = target, "edge has no distance, travel time not computed");
                    0.0
                }
            };

            let stack = ancestors_of(&state.locations, target);
            let position = state.position_mut();
            position.current_location = Some(target.to_string());
            position.location_stack = stack;

            info!(from = %current, to = target, elapsed_hours, "party moved");
            Ok(TravelOutcome {
                location: target.to_string(),
                distance_meters: distance,
                elapsed_hours,
            })
        })
    }

    // --- pathfinding and intersections ---

    pub fn find_route(&self, from: &str, to: &str) -> Result<Option<Route>, NavError> {
        self.inspect(|state, _| Ok(find_route(&state.locations, from, to)))
    }

    pub fn find_shortest_route(&self, from: &str, to: &str) -> Result<Option<Route>, NavError> {
        self.inspect(|state, _| Ok(find_shortest_route(&state.locations, from, to)))
    }

    pub fn find_all_routes(&self, from: &str, to: &str, max_routes: usize) -> Result<Vec<Route>, NavError> {
        self.inspect(|state, _| Ok(find_all_routes(&state.locations, from, to, max_routes)))
    }

    pub fn is_reachable(&self, from: &str, to: &str) -> Result<bool, NavError> {
        self.inspect(|state, _| Ok(is_reachable(&state.locations, from, to)))
    }

    pub fn check_path_intersection(&self, from: &str, to: &str) -> Result<Vec<String>, NavError> {
        let rules = self.footprint();
        self.inspect(|state, _| check_path_intersection(&state.locations, from, to, rules))
    }

    /// The straight path from `from` to `to` with every location it crosses
    /// inserted as a stop.
    pub fn route_with_waypoints(&self, from: &str, to: &str) -> Result<Vec<String>, NavError> {
        let rules = self.footprint();
        self.inspect(|state, _| route_with_waypoints(&state.locations, from, to, rules))
    }

    pub fn split_intersecting_paths(&mut self, dry_run: bool) -> Result<SplitReport, NavError> {
        let rules = self.footprint();
        if dry_run {
            return self.inspect(|state, _| Ok(split_intersecting_paths(&mut state.locations, true, rules)));
        }
        self.update(|state, _| Ok(split_intersecting_paths(&mut state.locations, false, rules)))
    }

    // --- route preferences ---

    pub fn analyze_route_options(&self, from: &str, to: &str) -> Result<RouteAnalysis, NavError> {
        self.inspect(|state, config| {
            RouteCache::new(state, config.analysis_route_count).analyze_route_options(from, to)
        })
    }

    pub fn suggest_navigation(&self, from: &str, to: &str) -> Result<NavigationSuggestion, NavError> {
        self.inspect(|state, config| {
            RouteCache::new(state, config.analysis_route_count).suggest_navigation(from, to)
        })
    }

    pub fn get_cached_decision(&self, from: &str, to: &str) -> Result<Option<RoutePreference>, NavError> {
        self.inspect(|state, config| {
            Ok(RouteCache::new(state, config.analysis_route_count)
                .get_cached_decision(from, to)
                .cloned())
        })
    }

    pub fn cache_decision(&mut self, from: &str, to: &str, decision: RouteDecision) -> Result<(), NavError> {
        self.update(|state, config| {
            state.locations.require(from)?;
            state.locations.require(to)?;
            RouteCache::new(state, config.analysis_route_count).cache_decision(from, to, decision);
            Ok(())
        })
    }

    /// Prompt the operator on `output`, read the answer from `input` and
    /// persist the decision.
    pub fn decide_route<R: BufRead, W: Write>(
        &mut self,
        from: &str,
        to: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<DecisionOutcome, NavError> {
        self.update(|state, config| {
            let mut cache = RouteCache::new(state, config.analysis_route_count);
            decide_route(&mut cache, from, to, input, output)
        })
    }

    // --- hierarchy ---

    pub fn create_compound(&mut self, name: &str, options: CompoundOptions) -> Result<(), NavError> {
        self.update(|state, _| HierarchyManager::new(state).create_compound(name, options))
    }

    pub fn add_interior(&mut self, name: &str, parent: &str, options: InteriorOptions) -> Result<(), NavError> {
        self.update(|state, _| HierarchyManager::new(state).add_interior(name, parent, options))
    }

    pub fn enter_compound(&mut self, compound: &str, entry_point: Option<&str>) -> Result<PositionChange, NavError> {
        self.update(|state, _| HierarchyManager::new(state).enter_compound(compound, entry_point))
    }

    pub fn exit_compound(&mut self) -> Result<PositionChange, NavError> {
        self.update(|state, _| HierarchyManager::new(state).exit_compound())
    }

    pub fn move_interior(&mut self, target: &str) -> Result<PositionChange, NavError> {
        self.update(|state, _| HierarchyManager::new(state).move_interior(target))
    }

    pub fn resolve_player_position(&mut self) -> Result<Resolution, NavError> {
        self.update(|state, _| HierarchyManager::new(state).resolve_player_position())
    }

    pub fn get_ancestors(&self, name: &str) -> Result<Vec<String>, NavError> {
        self.inspect(|state, _| Ok(ancestors_of(&state.locations, name)))
    }

    pub fn get_children(&self, name: &str) -> Result<Vec<String>, NavError> {
        self.inspect(|state, _| Ok(HierarchyManager::new(state).get_children(name)))
    }

    pub fn get_entry_points(&self, compound: &str) -> Result<Vec<EntryPoint>, NavError> {
        self.inspect(|state, _| Ok(HierarchyManager::new(state).get_entry_points(compound)))
    }

    pub fn location_kind(&self, name: &str) -> Result<Option<LocationType>, NavError> {
        self.inspect(|state, _| Ok(HierarchyManager::new(state).location_kind(name)))
    }

    pub fn get_tree(&self, root: Option<&str>) -> Result<Vec<TreeNode>, NavError> {
        self.inspect(|state, _| HierarchyManager::new(state).get_tree(root))
    }

    pub fn validate_hierarchy(&self) -> Result<HierarchyReport, NavError> {
        self.inspect(|state, _| Ok(HierarchyManager::new(state).validate_hierarchy()))
    }

    /// Lay out the children of `compound` and the edges between them.
    pub fn interior_layout(
        &self,
        compound: &str,
        cache: &mut LayoutCache,
        canvas: Canvas,
    ) -> Result<Layout, NavError> {
        let state = self.load_state()?;
        let location = state.locations.require(compound)?;
        if !location.is_compound() {
            return Err(NavError::NotACompound(compound.to_string()));
        }

        let rooms = location.children().to_vec();
        let edges: Vec<(String, String)> = state
            .locations
            .unique_edges()
            .into_iter()
            .filter(|e| rooms.iter().any(|r| r == e.owner) && rooms.iter().any(|r| r == e.other()))
            .map(|e| (e.owner.to_string(), e.other().to_string()))
            .collect();

        debug!(compound, rooms = rooms.len(), edges = edges.len(), "interior layout");
        Ok(cache.get_or_compute(&rooms, &edges, location.entry_points(), canvas))
    }

    // --- vehicles ---

    pub fn register_vehicle(&mut self, anchor: &str, spec: VehicleSpec) -> Result<(), NavError> {
        self.update(|state, config| VehicleManager::new(state, config).register_vehicle(anchor, spec))
    }

    pub fn add_room(
        &mut self,
        vehicle_id: &str,
        room: &str,
        description: Option<&str>,
        from_room: &str,
        bearing: f64,
        distance: f64,
    ) -> Result<Coordinates, NavError> {
        self.update(|state, config| {
            VehicleManager::new(state, config).add_room(vehicle_id, room, description, from_room, bearing, distance)
        })
    }

    pub fn board_vehicle(&mut self, vehicle_id: &str, room: Option<&str>) -> Result<PositionChange, NavError> {
        self.update(|state, config| VehicleManager::new(state, config).board_vehicle(vehicle_id, room))
    }

    pub fn exit_vehicle(&mut self) -> Result<String, NavError> {
        self.update(|state, config| VehicleManager::new(state, config).exit_vehicle())
    }

    pub fn move_internal(&mut self, room: &str) -> Result<PositionChange, NavError> {
        self.update(|state, config| VehicleManager::new(state, config).move_internal(room))
    }

    pub fn move_vehicle(&mut self, vehicle_id: &str, destination: VehicleDestination) -> Result<VehicleMove, NavError> {
        self.update(|state, config| VehicleManager::new(state, config).move_vehicle(vehicle_id, destination))
    }

    pub fn is_vehicle_room(&self, name: &str) -> Result<bool, NavError> {
        self.inspect(|state, config| Ok(VehicleManager::new(state, config).is_room(name)))
    }

    pub fn vehicle_status(&self, vehicle_id: &str) -> Result<VehicleStatus, NavError> {
        self.inspect(|state, config| VehicleManager::new(state, config).get_status(vehicle_id))
    }

    pub fn list_vehicles(&self) -> Result<Vec<VehicleSummary>, NavError> {
        self.inspect(|state, config| Ok(VehicleManager::new(state, config).list_vehicles()))
    }

    pub fn vehicle_internal_map(&self, vehicle_id: &str) -> Result<BTreeMap<String, Location>, NavError> {
        self.inspect(|state, config| Ok(VehicleManager::new(state, config).get_internal_map_data(vehicle_id)))
    }

    // --- journeys ---

    /// Rules from the campaign overview, falling back to the configuration.
    pub fn encounter_rules(&self) -> Result<EncounterRules, NavError> {
        let state = self.load_state()?;
        Ok(state
            .overview
            .encounter_rules()?
            .unwrap_or_else(|| self.config.encounters.clone()))
    }

    /// Simulate travel from `from` to `to` with encounter checks. The leg's
    /// length and terrain come from the stored edge, or from coordinates
    /// when there is no edge.
    pub fn check_journey<D: DiceRoller>(&self, from: &str, to: &str, dice: D) -> Result<JourneyReport, NavError> {
        let state = self.load_state()?;
        let rules = state
            .overview
            .encounter_rules()?
            .unwrap_or_else(|| self.config.encounters.clone());
        let character = load_character(&self.store)?;
        let speed = require_speed(
            character
                .as_ref()
                .and_then(|c| c.speed_kmh)
                .unwrap_or(self.config.travel_speed_kmh),
        )?;

        let origin = state.locations.require(from)?;
        let target = state.locations.require(to)?;
        let edge = state.locations.connection_between(from, to);
        let distance = match (edge.and_then(|e| e.traversable_distance()), origin.coordinates, target.coordinates) {
            (Some(d), _, _) => d,
            (None, Some(a), Some(b)) => direct_distance(a, b).round(),
            _ => {
                return Err(NavError::NoConnection {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
        };
        let terrain = edge
            .map(|e| e.terrain_or_default().to_string())
            .or_else(|| target.terrain.clone())
            .unwrap_or_else(|| world_atlas::DEFAULT_TERRAIN.to_string());

        if !rules.enabled {
            return Ok(JourneyReport::skipped(from, to, distance, &terrain, speed, "Encounters disabled"));
        }

        let mut engine = JourneyEngine::new(rules, dice)
            .with_clock(state.overview.clock())
            .with_time_of_day(state.overview.time_of_day_or_default());
        if let Some(sheet) = character {
            engine = engine.with_character(sheet);
        }
        engine.check_journey(from, to, distance, &terrain, speed)
    }

    /// Stop the party at a waypoint in `segment` of `journey`.
    pub fn interrupt_journey(&mut self, journey: &JourneyReport, segment: u32) -> Result<String, NavError> {
        let report = journey
            .segments
            .iter()
            .find(|s| s.segment == segment)
            .ok_or_else(|| NavError::SegmentNotFound {
                journey: journey.id.to_string(),
                segment,
            })?;
        self.update(|state, config| {
            let name = create_waypoint_location(&mut state.locations, journey, report, config.waypoint_diameter_meters)?;
            let stack = ancestors_of(&state.locations, &name);
            let position = state.position_mut();
            position.current_location = Some(name.clone());
            position.location_stack = stack;
            Ok(name)
        })
    }

    pub fn cleanup_waypoint(&mut self, name: &str) -> Result<(), NavError> {
        self.update(|state, _| cleanup_waypoint(&mut state.locations, name))
    }

    pub fn is_waypoint(&self, name: &str) -> Result<bool, NavError> {
        self.inspect(|state, _| Ok(is_waypoint(&state.locations, name)))
    }

    pub fn waypoint_options(&self, name: &str) -> Result<WaypointOptions, NavError> {
        self.inspect(|state, _| get_waypoint_options(&state.locations, name))
    }
}
