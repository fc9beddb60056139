//! Seams between the dispatch engine and its collaborators.
//!
//! The engine owns neither orders nor driver state. Embedders implement these
//! traits over their own stores; [`crate::store`] has in-memory versions.

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::model::{Coordinate, Order, OrderId, Vehicle, VehicleId};

/// Pairwise travel costs for a set of locations.
///
/// Both matrices are indexed by the order of the locations passed to
/// [`TravelMatrixProvider::matrix_for`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelMatrix {
    /// Metres.
    pub distances: Vec<Vec<i64>>,
    /// Minutes.
    pub durations: Vec<Vec<i64>>,
}

impl TravelMatrix {
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn distance(&self, from: usize, to: usize) -> i64 {
        self.distances[from][to]
    }

    pub fn duration(&self, from: usize, to: usize) -> i64 {
        self.durations[from][to]
    }

    /// True if both matrices are `n x n`.
    pub fn is_square(&self, n: usize) -> bool {
        self.distances.len() == n
            && self.durations.len() == n
            && self.distances.iter().all(|row| row.len() == n)
            && self.durations.iter().all(|row| row.len() == n)
    }
}

/// Provides a distance/time matrix for a set of locations.
///
/// Implementations must return non-negative, symmetric values with a zero
/// diagonal.
pub trait TravelMatrixProvider {
    fn matrix_for(&self, locations: &[Coordinate]) -> TravelMatrix;
}

/// Source of pending orders and sink for the assignments computed from them.
pub trait OrderStore {
    /// Accept a new order in the pending state.
    fn submit(&self, order: Order) -> Result<(), InputError>;

    /// Every order still waiting for delivery, in submission order.
    fn pending_orders(&self) -> Vec<Order>;

    /// Persist the latest plan's owner (or lack of one) for each order.
    fn record_assignments(&self, assignments: &[(OrderId, Option<VehicleId>)]);
}

/// Source of the vehicles currently on duty.
pub trait FleetStore {
    /// Snapshot of on-duty vehicles. Vehicles that never reported a position
    /// carry `start_location: None` and are left out of the solve.
    fn on_duty_vehicles(&self) -> Vec<Vehicle>;
}

/// Why an order was left out of the plan this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The order is larger than the capacity of every vehicle.
    ExceedsCapacity,
    /// No vehicle can fit the pickup and delivery within the deadlines.
    NoFeasibleSlot,
    /// No vehicle with a known position was on duty.
    NoVehicleAvailable,
}
