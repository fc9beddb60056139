//! Task graph: the visitable nodes of one dispatch invocation.
//!
//! Layout is fixed: nodes `0..V` are vehicle starts, followed by one
//! pickup/delivery pair per order in submission order, so order `k` owns
//! nodes `V + 2k` (pickup) and `V + 2k + 1` (delivery).

use crate::error::DispatchError;
use crate::model::{Coordinate, Order, TimeWindow, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    VehicleStart { vehicle: usize },
    Pickup { order: usize },
    Delivery { order: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub location: Coordinate,
    /// `+quantity` at pickups, `-quantity` at deliveries, zero at starts.
    pub demand: i64,
    pub window: TimeWindow,
    pub service_time: i64,
    /// Urgency of the node's order. Higher means closer to expiry.
    pub priority: i64,
}

impl Node {
    pub fn order(&self) -> Option<usize> {
        match self.kind {
            NodeKind::VehicleStart { .. } => None,
            NodeKind::Pickup { order } | NodeKind::Delivery { order } => Some(order),
        }
    }
}

/// Priority of an order given its delivery deadline: `max(0, horizon - deadline)`.
pub fn priority_score(delivery_deadline: i64, horizon: i64) -> i64 {
    horizon.saturating_sub(delivery_deadline).max(0)
}

#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: Vec<Node>,
    pairs: Vec<(usize, usize)>,
    vehicle_count: usize,
}

impl TaskGraph {
    /// Build the graph for positioned, validated vehicles and orders.
    pub fn build(
        vehicles: &[Vehicle],
        orders: &[Order],
        horizon: i64,
    ) -> Result<Self, DispatchError> {
        let vehicle_count = vehicles.len();
        let mut nodes = Vec::with_capacity(vehicle_count + 2 * orders.len());

        for (index, vehicle) in vehicles.iter().enumerate() {
            let location = vehicle
                .start_location
                .ok_or_else(|| DispatchError::UnpositionedVehicle(vehicle.id.clone()))?;
            if vehicle.capacity < 0 {
                return Err(DispatchError::NegativeCapacity {
                    vehicle: vehicle.id.clone(),
                    capacity: vehicle.capacity,
                });
            }
            nodes.push(Node {
                kind: NodeKind::VehicleStart { vehicle: index },
                location,
                demand: 0,
                window: TimeWindow::new(0, horizon),
                service_time: 0,
                priority: 0,
            });
        }

        let mut total_demand: i64 = 0;
        let mut pairs = Vec::with_capacity(orders.len());
        for (index, order) in orders.iter().enumerate() {
            if order.quantity <= 0 {
                return Err(DispatchError::NonPositiveQuantity {
                    order: order.id.clone(),
                    quantity: order.quantity,
                });
            }
            total_demand = total_demand
                .checked_add(order.quantity)
                .ok_or_else(|| DispatchError::DemandOverflow(order.id.clone()))?;

            let priority = priority_score(order.delivery_deadline(), horizon);
            let pickup = nodes.len();
            nodes.push(Node {
                kind: NodeKind::Pickup { order: index },
                location: order.pickup_location,
                demand: order.quantity,
                window: order.pickup_window,
                service_time: order.service_time,
                priority,
            });
            let delivery = nodes.len();
            nodes.push(Node {
                kind: NodeKind::Delivery { order: index },
                location: order.delivery_location,
                demand: -order.quantity,
                window: order.delivery_window,
                service_time: order.service_time,
                priority,
            });
            pairs.push((pickup, delivery));
        }

        let graph = Self {
            nodes,
            pairs,
            vehicle_count,
        };
        graph.check_pairs()?;
        Ok(graph)
    }

    fn check_pairs(&self) -> Result<(), DispatchError> {
        for (order, &(pickup, delivery)) in self.pairs.iter().enumerate() {
            let paired = matches!(
                (self.nodes.get(pickup).map(|n| n.kind), self.nodes.get(delivery).map(|n| n.kind)),
                (Some(NodeKind::Pickup { order: p }), Some(NodeKind::Delivery { order: d }))
                    if p == order && d == order
            );
            if !paired || self.nodes[pickup].demand + self.nodes[delivery].demand != 0 {
                return Err(DispatchError::PairingMismatch { pickup, delivery });
            }
        }
        Ok(())
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(pickup, delivery)` node indices, one per order.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn pair(&self, order: usize) -> (usize, usize) {
        self.pairs[order]
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicle_count
    }

    pub fn order_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn start_node(&self, vehicle: usize) -> usize {
        vehicle
    }

    pub fn locations(&self) -> Vec<Coordinate> {
        self.nodes.iter().map(|node| node.location).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderId, VehicleId};

    fn order(id: &str, quantity: i64, deadline: i64) -> Order {
        Order {
            id: OrderId::new(id),
            quantity,
            pickup_location: Coordinate::new(25.10, 75.80),
            pickup_window: TimeWindow::until(deadline),
            delivery_location: Coordinate::new(25.20, 75.90),
            delivery_window: TimeWindow::until(deadline),
            service_time: 5,
        }
    }

    #[test]
    fn test_node_layout() {
        let vehicles = vec![
            Vehicle::new("a", 10, Coordinate::new(25.0, 75.0)),
            Vehicle::new("b", 10, Coordinate::new(25.1, 75.1)),
        ];
        let orders = vec![order("o1", 3, 100), order("o2", 4, 200)];
        let graph = TaskGraph::build(&vehicles, &orders, 1440).unwrap();

        assert_eq!(graph.len(), 6);
        assert_eq!(graph.vehicle_count(), 2);
        assert_eq!(graph.pairs(), &[(2, 3), (4, 5)]);
        assert_eq!(graph.node(0).kind, NodeKind::VehicleStart { vehicle: 0 });
        assert_eq!(graph.node(4).demand, 4);
        assert_eq!(graph.node(5).demand, -4);
        assert_eq!(graph.node(3).order(), Some(0));
        assert_eq!(graph.node(1).window, TimeWindow::new(0, 1440));
    }

    #[test]
    fn test_priority_decreases_with_deadline() {
        assert!(priority_score(10, 1440) > priority_score(600, 1440));
        assert_eq!(priority_score(2000, 1440), 0);
        let orders = vec![order("soon", 1, 10)];
        let vehicles = vec![Vehicle::new("a", 10, Coordinate::new(25.0, 75.0))];
        let graph = TaskGraph::build(&vehicles, &orders, 1440).unwrap();
        assert_eq!(graph.node(1).priority, 1430);
        assert_eq!(graph.node(2).priority, 1430);
    }

    #[test]
    fn test_unpositioned_vehicle_is_fatal() {
        let vehicles = vec![Vehicle {
            id: VehicleId::new("ghost"),
            capacity: 10,
            start_location: None,
        }];
        let err = TaskGraph::build(&vehicles, &[order("o1", 1, 100)], 1440).unwrap_err();
        assert_eq!(err, DispatchError::UnpositionedVehicle(VehicleId::new("ghost")));
    }

    #[test]
    fn test_demand_overflow_is_fatal() {
        let vehicles = vec![Vehicle::new("a", 10, Coordinate::new(25.0, 75.0))];
        let orders = vec![order("big", i64::MAX, 100), order("more", 1, 100)];
        let err = TaskGraph::build(&vehicles, &orders, 1440).unwrap_err();
        assert_eq!(err, DispatchError::DemandOverflow(OrderId::new("more")));
    }

    #[test]
    fn test_negative_capacity_is_fatal() {
        let vehicles = vec![Vehicle::new("a", -5, Coordinate::new(25.0, 75.0))];
        let err = TaskGraph::build(&vehicles, &[order("o1", 1, 100)], 1440).unwrap_err();
        assert!(matches!(err, DispatchError::NegativeCapacity { capacity: -5, .. }));
    }
}
