mod fixtures;

use fleet_dispatch::haversine::HaversineMatrix;
use fleet_dispatch::intake::IntakeOptions;
use fleet_dispatch::traits::{TravelMatrix, TravelMatrixProvider};
use fleet_dispatch::{Coordinate, DispatchOptions, DispatchStatus, solve};

use fixtures::{TestOrder, assert_plan_invariants, vehicle, vid};

/// Manhattan distance on raw degrees: 1 degree = 1000 m = 10 minutes.
struct ManhattanMatrix;

impl TravelMatrixProvider for ManhattanMatrix {
    fn matrix_for(&self, locations: &[Coordinate]) -> TravelMatrix {
        let mut matrix = TravelMatrix {
            distances: vec![vec![0; locations.len()]; locations.len()],
            durations: vec![vec![0; locations.len()]; locations.len()],
        };
        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                let degrees = (from.lat - to.lat).abs() + (from.lon - to.lon).abs();
                matrix.distances[i][j] = (degrees * 1000.0).round() as i64;
                matrix.durations[i][j] = (degrees * 10.0).round() as i64;
            }
        }
        matrix
    }
}

#[test]
fn smoke_custom_matrix_provider() {
    let vehicles = vec![vehicle("alice", 20, 0.0, 0.0), vehicle("bob", 20, 10.0, 10.0)];
    let orders = vec![
        TestOrder::new("near_alice").quantity(5).pickup(1.0, 0.0).delivery(2.0, 0.0).build(),
        TestOrder::new("near_bob").quantity(5).pickup(10.0, 11.0).delivery(10.0, 12.0).build(),
    ];

    let plan = solve(&vehicles, &orders, &ManhattanMatrix, &DispatchOptions::default()).unwrap();

    assert_eq!(plan.status, DispatchStatus::Planned);
    assert_eq!(plan.route_for(&vid("alice"))[0].order_id.as_str(), "near_alice");
    assert_eq!(plan.route_for(&vid("bob"))[0].order_id.as_str(), "near_bob");
    assert_eq!(plan.total_distance, 4000);
    // 10 minutes to the pickup, 5 of service, 10 to the drop-off.
    assert_eq!(plan.route_for(&vid("alice"))[0].estimated_arrival, 10);
    assert_eq!(plan.route_for(&vid("alice"))[1].estimated_arrival, 25);
    assert_plan_invariants(&plan, &vehicles, &orders);
}

#[test]
fn smoke_options_load_from_json() {
    let options: DispatchOptions =
        serde_json::from_str(r#"{ "urgency_weight": 5, "time_budget_ms": 250 }"#).unwrap();

    assert_eq!(options.urgency_weight, 5);
    assert_eq!(options.time_budget_ms, 250);
    // Unspecified fields keep their defaults.
    assert_eq!(options.horizon, DispatchOptions::default().horizon);
    assert_eq!(options.span_coefficient, DispatchOptions::default().span_coefficient);

    let matrix: HaversineMatrix = serde_json::from_str(r#"{ "speed_m_per_min": 500.0 }"#).unwrap();
    assert_eq!(matrix.speed_m_per_min, 500.0);

    let intake: IntakeOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(intake, IntakeOptions::default());
}

#[test]
fn smoke_route_steps_serialize_for_clients() {
    let vehicles = vec![vehicle("v1", 100, 25.10, 75.80)];
    let orders = vec![TestOrder::new("o1").build()];
    let plan = solve(&vehicles, &orders, &HaversineMatrix::default(), &DispatchOptions::default())
        .unwrap();

    let json = serde_json::to_value(plan.route_for(&vid("v1"))).unwrap();
    assert_eq!(json[0]["order_id"], "o1");
    assert_eq!(json[0]["kind"], "pickup");
    assert_eq!(json[1]["kind"], "delivery");
    assert!(json[1]["estimated_arrival"].as_i64().unwrap() > 0);
}
