//! Dispatch domain records: vehicles, orders and the route steps handed back
//! to drivers.
//!
//! All times are whole minutes measured from the moment dispatch runs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Stable identifier of a vehicle (e.g. the driver's account phone number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a donation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(InputError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

/// Permissible arrival interval `[start, end]`, in minutes from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Window open from now until `deadline`.
    pub const fn until(deadline: i64) -> Self {
        Self {
            start: 0,
            end: deadline,
        }
    }

    pub fn contains(&self, minute: i64) -> bool {
        self.start <= minute && minute <= self.end
    }

    fn validate(&self) -> Result<(), InputError> {
        if self.start < 0 || self.end < self.start {
            return Err(InputError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// An on-duty courier as reported by the driver location store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub capacity: i64,
    /// Last reported position. `None` if the driver never reported one.
    pub start_location: Option<Coordinate>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, capacity: i64, start_location: Coordinate) -> Self {
        Self {
            id: VehicleId::new(id),
            capacity,
            start_location: Some(start_location),
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.capacity < 0 {
            return Err(InputError::NegativeCapacity {
                capacity: self.capacity,
            });
        }
        if let Some(location) = &self.start_location {
            location.validate()?;
        }
        Ok(())
    }
}

/// A pending donation: pick up `quantity` units and deliver them before expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub quantity: i64,
    pub pickup_location: Coordinate,
    pub pickup_window: TimeWindow,
    pub delivery_location: Coordinate,
    pub delivery_window: TimeWindow,
    /// Dwell time at each of the two stops, in minutes.
    pub service_time: i64,
}

impl Order {
    pub fn pickup_deadline(&self) -> i64 {
        self.pickup_window.end
    }

    pub fn delivery_deadline(&self) -> i64 {
        self.delivery_window.end
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.quantity <= 0 {
            return Err(InputError::NonPositiveQuantity {
                quantity: self.quantity,
            });
        }
        self.pickup_location.validate()?;
        self.delivery_location.validate()?;
        self.pickup_window.validate()?;
        self.delivery_window.validate()?;
        if self.pickup_deadline() > self.delivery_deadline() {
            return Err(InputError::DeadlineOrder {
                pickup: self.pickup_deadline(),
                delivery: self.delivery_deadline(),
            });
        }
        if self.service_time < 0 {
            return Err(InputError::NegativeServiceTime {
                minutes: self.service_time,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Pickup,
    Delivery,
}

impl StopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopKind::Pickup => "pickup",
            StopKind::Delivery => "delivery",
        }
    }
}

/// One stop in a vehicle's planned route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub order_id: OrderId,
    pub kind: StopKind,
    pub location: Coordinate,
    /// Minute at which service is expected to begin.
    pub estimated_arrival: i64,
}

impl RouteStep {
    /// Stop label shown to drivers, e.g. `"a1b2_pickup"`.
    pub fn location_id(&self) -> String {
        format!("{}_{}", self.order_id, self.kind.as_str())
    }
}
