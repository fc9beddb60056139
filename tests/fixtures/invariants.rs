//! Checks every plan must pass regardless of input.

use std::collections::{HashMap, HashSet};

use fleet_dispatch::{DispatchPlan, Order, OrderId, StopKind, Vehicle};

/// Capacity, precedence, deadline and no-duplication checks over a plan.
pub fn assert_plan_invariants(plan: &DispatchPlan, vehicles: &[Vehicle], orders: &[Order]) {
    let by_id: HashMap<&OrderId, &Order> = orders.iter().map(|o| (&o.id, o)).collect();
    let mut seen_orders: HashSet<&OrderId> = HashSet::new();

    for (vehicle_id, steps) in &plan.routes {
        let vehicle = vehicles
            .iter()
            .find(|v| &v.id == vehicle_id)
            .unwrap_or_else(|| panic!("route for unknown vehicle {}", vehicle_id));
        assert!(!steps.is_empty(), "vehicles without work should have no route entry");

        let mut load = 0;
        let mut last_arrival = i64::MIN;
        let mut pickup_at: HashMap<&OrderId, (usize, i64)> = HashMap::new();

        for (position, step) in steps.iter().enumerate() {
            let order = by_id
                .get(&step.order_id)
                .unwrap_or_else(|| panic!("step for unknown order {}", step.order_id));

            assert!(
                step.estimated_arrival >= last_arrival,
                "arrivals must not go backwards on {}",
                vehicle_id
            );
            last_arrival = step.estimated_arrival;

            match step.kind {
                StopKind::Pickup => {
                    assert!(
                        order.pickup_window.contains(step.estimated_arrival),
                        "pickup of {} at {} outside {:?}",
                        order.id,
                        step.estimated_arrival,
                        order.pickup_window
                    );
                    assert!(
                        seen_orders.insert(&order.id),
                        "order {} appears more than once in the plan",
                        order.id
                    );
                    pickup_at.insert(&order.id, (position, step.estimated_arrival));
                    load += order.quantity;
                }
                StopKind::Delivery => {
                    assert!(
                        order.delivery_window.contains(step.estimated_arrival),
                        "delivery of {} at {} outside {:?}",
                        order.id,
                        step.estimated_arrival,
                        order.delivery_window
                    );
                    let (pickup_position, pickup_arrival) = pickup_at
                        .remove(&order.id)
                        .unwrap_or_else(|| panic!("delivery of {} before its pickup", order.id));
                    assert!(pickup_position < position);
                    assert!(pickup_arrival <= step.estimated_arrival);
                    load -= order.quantity;
                }
            }

            assert!(
                (0..=vehicle.capacity).contains(&load),
                "load {} out of [0, {}] on {}",
                load,
                vehicle.capacity,
                vehicle_id
            );
        }

        assert!(pickup_at.is_empty(), "undelivered pickups on {}", vehicle_id);
    }

    for dropped in &plan.dropped {
        assert!(
            !seen_orders.contains(&dropped.order_id),
            "dropped order {} is also routed",
            dropped.order_id
        );
    }
}
