use proptest::prelude::*;

use navigation_core::{
    create_waypoint_location, segments_for, JourneyEngine, VehicleDestination, VehicleManager,
    VehicleSpec,
};
use world_atlas::{
    canonical_pair, CampaignState, Coordinates, EdgeMeta, EncounterRules, FixedDice, Location,
    LocationGraph, NavigationConfig,
};

/// Smallest angle between two bearings.
fn angular_gap(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

fn pair_graph(a: &str, b: &str) -> LocationGraph {
    let mut graph = LocationGraph::new();
    graph.insert_location(a, Location::world()).unwrap();
    graph.insert_location(b, Location::world()).unwrap();
    graph
}

proptest! {
    /// Property: an edge is stored exactly once, on the name that sorts first
    #[test]
    fn edge_stored_on_canonical_owner(a in "[a-z]{1,8}", b in "[a-z]{1,8}", bearing in 0.0f64..360.0) {
        prop_assume!(a != b);
        let mut graph = pair_graph(&a, &b);
        prop_assert!(graph.add_connection(&a, &b, EdgeMeta::new().with_bearing(bearing)));

        let (owner, other) = canonical_pair(&a, &b);
        let edges = graph.unique_edges();
        prop_assert_eq!(edges.len(), 1);
        prop_assert_eq!(edges[0].owner, owner);
        prop_assert_eq!(edges[0].other(), other);
        prop_assert!(graph.location(other).unwrap().connections().is_empty());
    }

    /// Property: each endpoint reads the bearing pointing away from itself
    #[test]
    fn bearing_reads_from_either_side(a in "[a-z]{1,8}", b in "[a-z]{1,8}", bearing in 0.0f64..360.0) {
        prop_assume!(a != b);
        let mut graph = pair_graph(&a, &b);
        graph.add_connection(&a, &b, EdgeMeta::new().with_bearing(bearing));

        let from_a = graph.connections_of(&a)[0].bearing.unwrap();
        let from_b = graph.connections_of(&b)[0].bearing.unwrap();
        prop_assert!(angular_gap(from_a, bearing) < 1e-9, "{} vs {}", from_a, bearing);
        prop_assert!(angular_gap(from_b, bearing + 180.0) < 1e-9, "{} vs {}", from_b, bearing);
    }

    /// Property: adding the same pair again, in either order, changes nothing
    #[test]
    fn add_connection_is_idempotent(a in "[a-z]{1,8}", b in "[a-z]{1,8}", reversed in any::<bool>()) {
        prop_assume!(a != b);
        let mut graph = pair_graph(&a, &b);
        graph.add_connection(&a, &b, EdgeMeta::new().with_distance(100.0));
        let before = graph.clone();

        let again = if reversed {
            graph.add_connection(&b, &a, EdgeMeta::new().with_distance(5.0))
        } else {
            graph.add_connection(&a, &b, EdgeMeta::new().with_distance(5.0))
        };
        prop_assert!(!again);
        prop_assert_eq!(graph, before);
    }

    /// Property: moving a vehicle keeps every room's offset from the anchor
    #[test]
    fn vehicle_moves_rigidly(
        rooms in prop::collection::vec((0.0f64..360.0, 1.0f64..200.0), 1..6),
        x in -50_000.0f64..50_000.0,
        y in -50_000.0f64..50_000.0,
    ) {
        let mut graph = LocationGraph::new();
        graph
            .insert_location("Caravan", Location::world().with_coordinates(100.0, 100.0))
            .unwrap();
        let mut state = CampaignState::new(graph);
        let config = NavigationConfig::default();
        {
            let mut vm = VehicleManager::new(&mut state, &config);
            vm.register_vehicle("Caravan", VehicleSpec::new("wagon", "caravan")).unwrap();
            let mut previous = "Caravan".to_string();
            for (i, (bearing, distance)) in rooms.iter().enumerate() {
                let room = format!("Wagon {}", i);
                vm.add_room("wagon", &room, None, &previous, *bearing, *distance).unwrap();
                previous = room;
            }
        }

        let offsets = |state: &CampaignState| -> Vec<(f64, f64)> {
            let anchor = state.locations.location("Caravan").unwrap().coordinates.unwrap();
            (0..rooms.len())
                .map(|i| {
                    let c = state.locations.location(&format!("Wagon {}", i)).unwrap().coordinates.unwrap();
                    (c.x - anchor.x, c.y - anchor.y)
                })
                .collect()
        };
        let before = offsets(&state);

        let moved = VehicleManager::new(&mut state, &config)
            .move_vehicle("wagon", VehicleDestination::Coordinates(Coordinates::new(x, y)))
            .unwrap();
        prop_assert_eq!(moved.new_coordinates, Coordinates::new(x.round(), y.round()));
        prop_assert_eq!(offsets(&state), before);
    }

    /// Property: a waypoint splits its leg into parts that sum to the whole
    #[test]
    fn waypoint_partial_distances_sum(distance in 300u32..120_000, pick in any::<prop::sample::Index>()) {
        let distance = f64::from(distance);
        let mut graph = LocationGraph::new();
        graph.insert_location("Gate", Location::world().with_coordinates(0.0, 0.0)).unwrap();
        graph.insert_location("Pass", Location::world().with_coordinates(0.0, distance)).unwrap();

        let report = JourneyEngine::new(EncounterRules::default(), FixedDice::always(20))
            .check_journey("Gate", "Pass", distance, "mountain", 4.0)
            .unwrap();
        prop_assert_eq!(report.segments.len() as u32, segments_for(distance));

        let segment = &report.segments[pick.index(report.segments.len())];
        let name = create_waypoint_location(&mut graph, &report, segment, 10.0).unwrap();

        let back = graph.connection_between(&name, "Gate").unwrap().distance_meters.unwrap();
        let forward = graph.connection_between(&name, "Pass").unwrap().distance_meters.unwrap();
        prop_assert_eq!(back + forward, distance);
        prop_assert!(back > 0.0 && forward > 0.0);
    }
}
