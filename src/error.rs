//! Error types for dispatch input, solving and donation intake.

use thiserror::Error;

use crate::model::{OrderId, VehicleId};

/// A problem with one vehicle or order in a dispatch snapshot.
///
/// Input errors never fail a whole dispatch: the offending entity is left out
/// of the solve and reported back as a [`crate::solver::Rejection`].
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum InputError {
    /// Latitude outside [-90, 90], longitude outside [-180, 180], or non-finite.
    #[error("coordinate ({lat}, {lon}) is out of range")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("vehicle capacity {capacity} is negative")]
    NegativeCapacity { capacity: i64 },
    #[error("order quantity {quantity} must be positive")]
    NonPositiveQuantity { quantity: i64 },
    /// The pickup deadline falls after the delivery deadline.
    #[error("pickup deadline {pickup} is after delivery deadline {delivery}")]
    DeadlineOrder { pickup: i64, delivery: i64 },
    #[error("time window [{start}, {end}] is empty or negative")]
    InvalidWindow { start: i64, end: i64 },
    #[error("service time {minutes} is negative")]
    NegativeServiceTime { minutes: i64 },
    #[error("vehicle {0} appears more than once")]
    DuplicateVehicle(VehicleId),
    #[error("order {0} appears more than once")]
    DuplicateOrder(OrderId),
}

/// Malformed solver input that aborts a single dispatch invocation.
///
/// Validation in [`crate::solver::solve`] filters these cases out, so they
/// only surface when the lower-level builders are driven directly.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("vehicle {0} has no known position")]
    UnpositionedVehicle(VehicleId),
    #[error("vehicle {vehicle} has negative capacity {capacity}")]
    NegativeCapacity { vehicle: VehicleId, capacity: i64 },
    #[error("order {order} has non-positive quantity {quantity}")]
    NonPositiveQuantity { order: OrderId, quantity: i64 },
    /// Summing node demands would overflow.
    #[error("total demand overflows at order {0}")]
    DemandOverflow(OrderId),
    #[error("pickup node {pickup} is not paired with delivery node {delivery}")]
    PairingMismatch { pickup: usize, delivery: usize },
    #[error("travel matrix is {rows}x{cols}, expected {expected}x{expected}")]
    MatrixShape {
        rows: usize,
        cols: usize,
        expected: usize,
    },
}

/// Errors raised while turning a donation request into an order.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IntakeError {
    #[error("no relief centers are registered")]
    NoReliefCenters,
    #[error("donation expires immediately")]
    AlreadyExpired,
    #[error(transparent)]
    Input(#[from] InputError),
}
