//! Donation intake: turn a donor's request into a dispatchable order bound
//! for the nearest relief center.

use serde::{Deserialize, Serialize};

use crate::error::{InputError, IntakeError};
use crate::haversine::HaversineMatrix;
use crate::model::{Coordinate, Order, OrderId, TimeWindow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliefCenter {
    pub name: String,
    pub city: String,
    pub location: Coordinate,
}

impl ReliefCenter {
    pub fn new(name: impl Into<String>, city: impl Into<String>, location: Coordinate) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            location,
        }
    }
}

/// What a donor submits: where the food is, how much, and when it spoils.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub pickup: Coordinate,
    pub quantity: i64,
    pub expiry_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeOptions {
    /// Dwell at pickup and at drop-off, in minutes.
    pub service_time: i64,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        Self { service_time: 5 }
    }
}

/// Closest center by great-circle distance. Ties go to the earlier entry.
pub fn nearest_center(centers: &[ReliefCenter], from: Coordinate) -> Option<&ReliefCenter> {
    centers.iter().min_by(|a, b| {
        HaversineMatrix::distance_m(from, a.location)
            .total_cmp(&HaversineMatrix::distance_m(from, b.location))
    })
}

/// Build the order for `request`, delivering to the nearest center.
///
/// Both stops must be completed before the donation expires.
pub fn order_from_donation<'c>(
    id: OrderId,
    request: &DonationRequest,
    centers: &'c [ReliefCenter],
    options: &IntakeOptions,
) -> Result<(Order, &'c ReliefCenter), IntakeError> {
    request.pickup.validate()?;
    if request.quantity <= 0 {
        return Err(InputError::NonPositiveQuantity {
            quantity: request.quantity,
        }
        .into());
    }
    if request.expiry_hours <= 0 {
        return Err(IntakeError::AlreadyExpired);
    }
    let center = nearest_center(centers, request.pickup).ok_or(IntakeError::NoReliefCenters)?;

    let deadline = request.expiry_hours.saturating_mul(60);
    let order = Order {
        id,
        quantity: request.quantity,
        pickup_location: request.pickup,
        pickup_window: TimeWindow::until(deadline),
        delivery_location: center.location,
        delivery_window: TimeWindow::until(deadline),
        service_time: options.service_time,
    };
    order.validate()?;

    Ok((order, center))
}
