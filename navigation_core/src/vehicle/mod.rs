//! Vehicle Manager - mobile compounds with a local interior map.
//!
//! A vehicle is one anchor location on the global map plus rooms tagged with
//! the same `vehicle_id`. Moving the vehicle translates the anchor and every
//! room by the same delta, then rebuilds the anchor's external edges from
//! scratch against whatever lies within its proximity radius.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use world_atlas::{
    bearing_between, coordinates_from, direct_distance, lerp, round_bearing, round_meters,
    CampaignState, Coordinates, EdgeMeta, Location, MapContext, NavError, NavigationConfig,
    PlayerPosition, VehicleTag,
};

use crate::hierarchy::{ancestors_of, HierarchyManager, PositionChange};

/// Terrain recorded on edges between rooms of the same vehicle.
pub const INTERNAL_TERRAIN: &str = "internal";
/// Terrain of an external edge when the neighbor has none.
pub const OPEN_SPACE_TERRAIN: &str = "space";

/// Registration parameters for [`VehicleManager::register_vehicle`].
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSpec {
    pub vehicle_id: String,
    pub vehicle_type: String,
    pub dock_room: Option<String>,
    pub proximity_radius_m: Option<f64>,
    pub max_dock_connections: u32,
}

impl VehicleSpec {
    pub fn new(vehicle_id: impl Into<String>, vehicle_type: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            vehicle_type: vehicle_type.into(),
            dock_room: None,
            proximity_radius_m: None,
            max_dock_connections: 3,
        }
    }

    pub fn with_dock_room(mut self, room: impl Into<String>) -> Self {
        self.dock_room = Some(room.into());
        self
    }

    pub fn with_proximity_radius(mut self, meters: f64) -> Self {
        self.proximity_radius_m = Some(meters);
        self
    }

    pub fn with_max_dock_connections(mut self, max: u32) -> Self {
        self.max_dock_connections = max;
        self
    }
}

/// Where to move a vehicle.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleDestination {
    /// Approach a named location, stopping short of it.
    Location(String),
    /// Go exactly to these coordinates (rounded to whole meters).
    Coordinates(Coordinates),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleMove {
    pub vehicle_id: String,
    pub anchor: String,
    pub new_coordinates: Coordinates,
    pub delta: Coordinates,
    /// Locations the anchor is now connected to.
    pub new_connections: Vec<String>,
    pub player_inside: bool,
    pub destination: Option<String>,
    /// Gap left before the destination; 0 when the vehicle arrived on it.
    pub stopping_distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub vehicle_id: String,
    pub anchor: String,
    pub rooms: Vec<String>,
    pub vehicle_type: Option<String>,
    pub player_position: PlayerPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub vehicle_id: String,
    pub anchor: String,
    pub vehicle_type: Option<String>,
    pub room_count: usize,
}

pub struct VehicleManager<'a> {
    state: &'a mut CampaignState,
    default_proximity_m: f64,
    fallback_stop_m: f64,
}

impl<'a> VehicleManager<'a> {
    pub fn new(state: &'a mut CampaignState, config: &NavigationConfig) -> Self {
        Self {
            state,
            default_proximity_m: config.proximity_radius_meters,
            fallback_stop_m: config.fallback_stopping_distance_meters,
        }
    }

    pub fn anchor_of(&self, vehicle_id: &str) -> Option<String> {
        self.state
            .locations
            .iter()
            .find(|(_, l)| l.is_vehicle_anchor() && l.belongs_to_vehicle(vehicle_id))
            .map(|(name, _)| name.to_string())
    }

    fn require_anchor(&self, vehicle_id: &str) -> Result<String, NavError> {
        self.anchor_of(vehicle_id)
            .ok_or_else(|| NavError::VehicleNotFound(vehicle_id.to_string()))
    }

    pub fn rooms_of(&self, vehicle_id: &str) -> Vec<String> {
        self.state
            .locations
            .iter()
            .filter(|(_, l)| l.is_vehicle_room() && l.belongs_to_vehicle(vehicle_id))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Whether `name` is a room aboard some vehicle.
    pub fn is_room(&self, name: &str) -> bool {
        self.state
            .locations
            .location(name)
            .is_some_and(Location::is_vehicle_room)
    }

    /// Turn `anchor` into a mobile compound carrying vehicle metadata.
    pub fn register_vehicle(&mut self, anchor: &str, spec: VehicleSpec) -> Result<(), NavError> {
        let location = self.state.locations.require_mut(anchor)?;

        let tag = VehicleTag {
            vehicle_id: spec.vehicle_id.clone(),
            is_anchor: true,
            vehicle_type: Some(spec.vehicle_type),
            dock_room: spec.dock_room.clone(),
            proximity_radius_m: Some(spec.proximity_radius_m.unwrap_or(self.default_proximity_m)),
            max_dock_connections: Some(spec.max_dock_connections),
            stationary: false,
            map_context: None,
        };
        location.vehicle = Some(tag);

        let info = location.promote_to_compound();
        info.mobile = true;
        if let Some(dock) = spec.dock_room {
            if !info.entry_points.contains(&dock) {
                info.entry_points.push(dock);
            }
        }

        info!(anchor, vehicle_id = %spec.vehicle_id, "vehicle registered");
        Ok(())
    }

    /// Add a room placed `distance` meters along `bearing` from `from_room`.
    pub fn add_room(
        &mut self,
        vehicle_id: &str,
        room: &str,
        description: Option<&str>,
        from_room: &str,
        bearing: f64,
        distance: f64,
    ) -> Result<Coordinates, NavError> {
        let anchor = self.require_anchor(vehicle_id)?;
        if self.state.locations.contains(room) {
            return Err(NavError::AlreadyExists(room.to_string()));
        }
        let origin = self
            .state
            .locations
            .require(from_room)?
            .coordinates
            .unwrap_or(Coordinates::ORIGIN);
        let coords = coordinates_from(origin, distance, bearing);

        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("Room aboard {}", vehicle_id));
        let location = Location::interior(anchor.as_str())
            .with_description(description)
            .with_coordinates(coords.x, coords.y)
            .with_vehicle(VehicleTag::room(vehicle_id));
        self.state.locations.insert_location(room, location)?;

        let anchor_location = self.state.locations.require_mut(&anchor)?;
        anchor_location.promote_to_compound();
        anchor_location.add_child(room);

        self.state.locations.add_connection(
            from_room,
            room,
            EdgeMeta::new()
                .with_distance(distance)
                .with_bearing(bearing)
                .with_terrain(INTERNAL_TERRAIN),
        );

        info!(vehicle_id, room, x = coords.x, y = coords.y, "vehicle room added");
        Ok(coords)
    }

    fn set_player(&mut self, location: &str, context: MapContext, vehicle_id: Option<&str>) {
        let position = self.state.position_mut();
        position.current_location = Some(location.to_string());
        position.map_context = context;
        position.vehicle_id = vehicle_id.map(str::to_string);
    }

    fn stack_through(&self, anchor: &str, room: &str) -> Vec<String> {
        let mut stack = ancestors_of(&self.state.locations, anchor);
        if room != anchor {
            stack.push(room.to_string());
        }
        stack
    }

    /// Step aboard, into `room` or the dock room. Entering through an entry
    /// point goes through the hierarchy like any compound.
    pub fn board_vehicle(
        &mut self,
        vehicle_id: &str,
        room: Option<&str>,
    ) -> Result<PositionChange, NavError> {
        let anchor = self.require_anchor(vehicle_id)?;
        let anchor_location = self.state.locations.require(&anchor)?;
        let target = room
            .map(str::to_string)
            .or_else(|| anchor_location.vehicle.as_ref().and_then(|v| v.dock_room.clone()))
            .unwrap_or_else(|| anchor.clone());
        let through_entry = anchor_location.entry_points().contains(&target);

        if target != anchor && !self.rooms_of(vehicle_id).contains(&target) {
            return Err(NavError::RoomNotInVehicle {
                room: target,
                vehicle_id: vehicle_id.to_string(),
            });
        }

        let change = if through_entry {
            HierarchyManager::new(&mut *self.state).enter_compound(&anchor, Some(&target))?
        } else {
            let stack = self.stack_through(&anchor, &target);
            self.state.position_mut().location_stack = stack.clone();
            PositionChange {
                location: target.clone(),
                location_stack: stack,
            }
        };
        self.set_player(&target, MapContext::Local, Some(vehicle_id));

        info!(vehicle_id, room = %target, "boarded vehicle");
        Ok(change)
    }

    /// Leave the vehicle onto the global map at the anchor.
    pub fn exit_vehicle(&mut self) -> Result<String, NavError> {
        let position = self.state.position();
        if position.map_context != MapContext::Local {
            return Err(NavError::NotInsideVehicle);
        }
        let vehicle_id = position
            .vehicle_id
            .clone()
            .ok_or(NavError::NotInsideVehicle)?;
        let anchor = self.require_anchor(&vehicle_id)?;

        let stack = self.stack_through(&anchor, &anchor);
        self.set_player(&anchor, MapContext::Global, None);
        self.state.position_mut().location_stack = stack;

        info!(vehicle_id = %vehicle_id, %anchor, "left vehicle");
        Ok(anchor)
    }

    /// Walk to another room of the boarded vehicle.
    pub fn move_internal(&mut self, room: &str) -> Result<PositionChange, NavError> {
        let position = self.state.position();
        if position.map_context != MapContext::Local {
            return Err(NavError::NotInsideVehicle);
        }
        let vehicle_id = position
            .vehicle_id
            .clone()
            .ok_or(NavError::NotInsideVehicle)?;
        let anchor = self.require_anchor(&vehicle_id)?;

        if room != anchor && !self.rooms_of(&vehicle_id).iter().any(|r| r == room) {
            return Err(NavError::RoomNotInVehicle {
                room: room.to_string(),
                vehicle_id,
            });
        }

        let stack = self.stack_through(&anchor, room);
        self.set_player(room, MapContext::Local, Some(&vehicle_id));
        self.state.position_mut().location_stack = stack.clone();

        debug!(vehicle_id = %vehicle_id, room, "moved inside vehicle");
        Ok(PositionChange {
            location: room.to_string(),
            location_stack: stack,
        })
    }

    /// Gap to leave before `destination`: the larger of the summed footprint
    /// radii and the destination's proximity radius, falling back to the
    /// vehicle's own proximity radius and then a fixed default.
    fn stopping_distance(&self, anchor: &Location, destination: &Location) -> f64 {
        let footprints = destination.diameter_meters.unwrap_or(0.0) / 2.0
            + anchor.diameter_meters.unwrap_or(0.0) / 2.0;
        let proximity = destination
            .vehicle
            .as_ref()
            .and_then(|v| v.proximity_radius_m)
            .unwrap_or(0.0);
        let stop = footprints.max(proximity);
        if stop > 0.0 {
            stop
        } else {
            anchor
                .vehicle
                .as_ref()
                .and_then(|v| v.proximity_radius_m)
                .unwrap_or(self.fallback_stop_m)
        }
    }

    pub fn move_vehicle(
        &mut self,
        vehicle_id: &str,
        destination: VehicleDestination,
    ) -> Result<VehicleMove, NavError> {
        let anchor = self.require_anchor(vehicle_id)?;
        let anchor_location = self.state.locations.require(&anchor)?;
        if anchor_location.vehicle.as_ref().is_some_and(|v| v.stationary) {
            return Err(NavError::VehicleStationary(anchor));
        }
        let old = anchor_location.coordinates.unwrap_or(Coordinates::ORIGIN);

        let (new_coords, destination_name, stopping_distance) = match destination {
            VehicleDestination::Location(name) => {
                let target = self.state.locations.require(&name)?;
                let target_coords = target
                    .coordinates
                    .ok_or_else(|| NavError::MissingCoordinates(name.clone()))?;
                let dist = round_meters(direct_distance(old, target_coords));
                let stop = self.stopping_distance(anchor_location, target);

                if dist > stop {
                    let moved = lerp(old, target_coords, (dist - stop) / dist);
                    (
                        Coordinates::new(moved.x.round(), moved.y.round()),
                        Some(name),
                        Some(stop),
                    )
                } else {
                    (target_coords, Some(name), Some(0.0))
                }
            }
            VehicleDestination::Coordinates(c) => (Coordinates::new(c.x.round(), c.y.round()), None, None),
        };

        let delta = Coordinates::new(new_coords.x - old.x, new_coords.y - old.y);
        self.state.locations.require_mut(&anchor)?.coordinates = Some(new_coords);
        for room in self.rooms_of(vehicle_id) {
            if let Some(location) = self.state.locations.location_mut(&room) {
                if let Some(c) = location.coordinates {
                    location.coordinates = Some(c.translated(delta.x, delta.y));
                }
            }
        }

        let new_connections = self.rebuild_external_connections(&anchor)?;

        let position = self.state.position();
        let player_inside = position.map_context == MapContext::Local
            && position.vehicle_id.as_deref() == Some(vehicle_id);

        info!(
            vehicle_id,
            %anchor,
            x = new_coords.x,
            y = new_coords.y,
            neighbors = new_connections.len(),
            "vehicle moved"
        );
        Ok(VehicleMove {
            vehicle_id: vehicle_id.to_string(),
            anchor,
            new_coordinates: new_coords,
            delta,
            new_connections,
            player_inside,
            destination: destination_name,
            stopping_distance,
        })
    }

    /// Drop every external edge of `anchor` and reconnect it to each
    /// non-vehicle location within its proximity radius. Returns the new
    /// neighbors.
    pub fn rebuild_external_connections(&mut self, anchor: &str) -> Result<Vec<String>, NavError> {
        let location = self.state.locations.require(anchor)?;
        let tag = location
            .vehicle
            .as_ref()
            .filter(|v| v.is_anchor)
            .ok_or_else(|| NavError::VehicleNotFound(anchor.to_string()))?;
        let vehicle_id = tag.vehicle_id.clone();
        let radius = tag.proximity_radius_m.unwrap_or(self.default_proximity_m);
        let center = location.coordinates.unwrap_or(Coordinates::ORIGIN);

        let mut own: HashSet<String> = self.rooms_of(&vehicle_id).into_iter().collect();
        own.insert(anchor.to_string());

        for neighbor in self.state.locations.neighbors(anchor) {
            if !own.contains(&neighbor) {
                self.state.locations.remove_connection(anchor, &neighbor);
            }
        }

        let nearby: Vec<(String, f64, f64, String)> = self
            .state
            .locations
            .iter()
            .filter(|(name, l)| !own.contains(*name) && l.vehicle.is_none())
            .filter_map(|(name, l)| {
                let coords = l.coordinates?;
                let dist = round_meters(direct_distance(center, coords));
                (dist <= radius).then(|| {
                    (
                        name.to_string(),
                        dist,
                        round_bearing(bearing_between(center, coords)),
                        l.terrain
                            .clone()
                            .unwrap_or_else(|| OPEN_SPACE_TERRAIN.to_string()),
                    )
                })
            })
            .collect();

        let mut connected = Vec::with_capacity(nearby.len());
        for (name, dist, bearing, terrain) in nearby {
            let meta = EdgeMeta::new()
                .with_distance(dist)
                .with_bearing(bearing)
                .with_terrain(terrain);
            if self.state.locations.add_connection(anchor, &name, meta) {
                connected.push(name);
            }
        }

        debug!(anchor, radius, connected = connected.len(), "external connections rebuilt");
        Ok(connected)
    }

    pub fn get_status(&self, vehicle_id: &str) -> Result<VehicleStatus, NavError> {
        let anchor = self.require_anchor(vehicle_id)?;
        let vehicle_type = self
            .state
            .locations
            .location(&anchor)
            .and_then(|l| l.vehicle.as_ref())
            .and_then(|v| v.vehicle_type.clone());

        Ok(VehicleStatus {
            vehicle_id: vehicle_id.to_string(),
            rooms: self.rooms_of(vehicle_id),
            anchor,
            vehicle_type,
            player_position: self.state.position().clone(),
        })
    }

    pub fn list_vehicles(&self) -> Vec<VehicleSummary> {
        self.state
            .locations
            .iter()
            .filter_map(|(name, l)| {
                let tag = l.vehicle.as_ref().filter(|v| v.is_anchor)?;
                Some(VehicleSummary {
                    vehicle_id: tag.vehicle_id.clone(),
                    anchor: name.to_string(),
                    vehicle_type: tag.vehicle_type.clone(),
                    room_count: self.rooms_of(&tag.vehicle_id).len(),
                })
            })
            .collect()
    }

    /// The anchor and rooms of one vehicle, nothing from the global map.
    pub fn get_internal_map_data(&self, vehicle_id: &str) -> BTreeMap<String, Location> {
        self.state
            .locations
            .iter()
            .filter(|(_, l)| l.belongs_to_vehicle(vehicle_id))
            .map(|(name, l)| (name.to_string(), l.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_atlas::LocationGraph;

    fn harbor() -> CampaignState {
        let mut graph = LocationGraph::new();
        graph
            .insert_location("Harbor", Location::world().with_coordinates(0.0, 0.0).with_diameter(200.0))
            .unwrap();
        graph
            .insert_location("Lighthouse", Location::world().with_coordinates(1000.0, 0.0))
            .unwrap();
        graph
            .insert_location("Reef", Location::world().with_coordinates(20_000.0, 0.0).with_terrain("reef"))
            .unwrap();
        graph
            .insert_location("Ship", Location::world().with_coordinates(0.0, -500.0).with_diameter(60.0))
            .unwrap();
        graph.add_connection("Harbor", "Ship", EdgeMeta::new().with_distance(500.0));

        let mut state = CampaignState::new(graph);
        let config = NavigationConfig::default();
        let mut vm = VehicleManager::new(&mut state, &config);
        vm.register_vehicle(
            "Ship",
            VehicleSpec::new("ship-01", "sailing ship")
                .with_dock_room("Deck")
                .with_proximity_radius(3000.0),
        )
        .unwrap();
        vm.add_room("ship-01", "Deck", None, "Ship", 0.0, 0.0).unwrap();
        vm.add_room("ship-01", "Cabin", Some("Captain's cabin"), "Deck", 180.0, 20.0)
            .unwrap();
        state
    }

    #[test]
    fn test_register_promotes_anchor() {
        let state = harbor();
        let ship = state.locations.location("Ship").unwrap();
        assert!(ship.is_vehicle_anchor());
        assert!(ship.is_mobile());
        assert_eq!(ship.entry_points(), ["Deck".to_string()]);
        assert_eq!(ship.children(), ["Deck".to_string(), "Cabin".to_string()]);
    }

    #[test]
    fn test_room_geometry_and_internal_edge() {
        let state = harbor();
        let cabin = state.locations.location("Cabin").unwrap();
        assert_eq!(cabin.coordinates, Some(Coordinates::new(0.0, -520.0)));
        assert_eq!(cabin.parent.as_deref(), Some("Ship"));
        let edge = state.locations.connection_between("Deck", "Cabin").unwrap();
        assert_eq!(edge.terrain.as_deref(), Some(INTERNAL_TERRAIN));
    }

    #[test]
    fn test_move_is_rigid() {
        let mut state = harbor();
        let before: Vec<Coordinates> = ["Ship", "Deck", "Cabin"]
            .iter()
            .map(|n| state.locations.location(n).unwrap().coordinates.unwrap())
            .collect();

        let config = NavigationConfig::default();
        let moved = VehicleManager::new(&mut state, &config)
            .move_vehicle(
                "ship-01",
                VehicleDestination::Coordinates(Coordinates::new(5000.0, 7000.0)),
            )
            .unwrap();
        assert_eq!(moved.delta, Coordinates::new(5000.0, 7500.0));

        for (name, old) in ["Ship", "Deck", "Cabin"].iter().zip(before) {
            let now = state.locations.location(name).unwrap().coordinates.unwrap();
            assert_eq!(now, old.translated(5000.0, 7500.0));
        }
    }

    #[test]
    fn test_move_rebuilds_external_connections() {
        let mut state = harbor();
        let config = NavigationConfig::default();
        let mut vm = VehicleManager::new(&mut state, &config);

        let moved = vm
            .move_vehicle(
                "ship-01",
                VehicleDestination::Coordinates(Coordinates::new(19_000.0, 0.0)),
            )
            .unwrap();
        assert_eq!(moved.new_connections, ["Reef"]);
        assert!(!moved.player_inside);

        let neighbors: HashSet<String> = state.locations.neighbors("Ship").into_iter().collect();
        assert!(neighbors.contains("Reef"));
        assert!(neighbors.contains("Deck"));
        assert!(!neighbors.contains("Harbor"));
        let edge = state.locations.connection_between("Reef", "Ship").unwrap();
        assert_eq!(edge.terrain.as_deref(), Some("reef"));
    }

    #[test]
    fn test_move_to_location_stops_short() {
        let mut state = harbor();
        let config = NavigationConfig::default();
        let moved = VehicleManager::new(&mut state, &config)
            .move_vehicle("ship-01", VehicleDestination::Location("Reef".into()))
            .unwrap();

        // The reef has no footprint or proximity, leaving half the ship.
        assert_eq!(moved.stopping_distance, Some(30.0));
        assert_eq!(moved.new_coordinates.x.round(), 19_970.0);
        assert_eq!(moved.destination.as_deref(), Some("Reef"));
    }

    #[test]
    fn test_stationary_vehicle_refuses() {
        let mut state = harbor();
        state
            .locations
            .location_mut("Ship")
            .unwrap()
            .vehicle
            .as_mut()
            .unwrap()
            .stationary = true;
        let config = NavigationConfig::default();
        let err = VehicleManager::new(&mut state, &config)
            .move_vehicle("ship-01", VehicleDestination::Location("Harbor".into()))
            .unwrap_err();
        assert!(matches!(err, NavError::VehicleStationary(_)));
    }

    #[test]
    fn test_board_move_and_exit() {
        let mut state = harbor();
        let config = NavigationConfig::default();
        let mut vm = VehicleManager::new(&mut state, &config);

        let boarded = vm.board_vehicle("ship-01", None).unwrap();
        assert_eq!(boarded.location, "Deck");
        assert_eq!(boarded.location_stack, ["Ship", "Deck"]);

        let walked = vm.move_internal("Cabin").unwrap();
        assert_eq!(walked.location_stack, ["Ship", "Cabin"]);
        assert!(matches!(
            vm.move_internal("Harbor"),
            Err(NavError::RoomNotInVehicle { .. })
        ));

        let moved = vm
            .move_vehicle("ship-01", VehicleDestination::Coordinates(Coordinates::new(0.0, 0.0)))
            .unwrap();
        assert!(moved.player_inside);

        assert_eq!(vm.exit_vehicle().unwrap(), "Ship");
        let position = state.position();
        assert_eq!(position.map_context, MapContext::Global);
        assert_eq!(position.vehicle_id, None);
        assert_eq!(position.current_location.as_deref(), Some("Ship"));
    }

    #[test]
    fn test_exit_when_outside_fails() {
        let mut state = harbor();
        let config = NavigationConfig::default();
        let err = VehicleManager::new(&mut state, &config).exit_vehicle().unwrap_err();
        assert!(matches!(err, NavError::NotInsideVehicle));
    }

    #[test]
    fn test_read_projections() {
        let mut state = harbor();
        let config = NavigationConfig::default();
        let vm = VehicleManager::new(&mut state, &config);

        let listed = vm.list_vehicles();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].room_count, 2);

        let status = vm.get_status("ship-01").unwrap();
        assert_eq!(status.anchor, "Ship");
        assert_eq!(status.vehicle_type.as_deref(), Some("sailing ship"));

        let internal = vm.get_internal_map_data("ship-01");
        assert_eq!(internal.len(), 3);
        assert!(!internal.contains_key("Harbor"));
        assert!(vm.is_room("Cabin"));
        assert!(!vm.is_room("Ship"));

        assert!(matches!(
            vm.get_status("ghost-ship"),
            Err(NavError::VehicleNotFound(_))
        ));
    }
}
