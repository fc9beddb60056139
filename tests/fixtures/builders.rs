//! Builders for orders and vehicles with sensible defaults.

use fleet_dispatch::{Coordinate, Order, OrderId, TimeWindow, Vehicle, VehicleId};

/// Builder for test orders. Defaults: quantity 10, five minutes of service,
/// deadlines at the end of the day (no urgency).
#[derive(Clone, Debug)]
pub struct TestOrder {
    order: Order,
}

impl TestOrder {
    pub fn new(id: &str) -> Self {
        Self {
            order: Order {
                id: OrderId::new(id),
                quantity: 10,
                pickup_location: Coordinate::new(25.10, 75.80),
                pickup_window: TimeWindow::until(1440),
                delivery_location: Coordinate::new(25.20, 75.90),
                delivery_window: TimeWindow::until(1440),
                service_time: 5,
            },
        }
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.order.quantity = quantity;
        self
    }

    pub fn pickup(mut self, lat: f64, lon: f64) -> Self {
        self.order.pickup_location = Coordinate::new(lat, lon);
        self
    }

    pub fn delivery(mut self, lat: f64, lon: f64) -> Self {
        self.order.delivery_location = Coordinate::new(lat, lon);
        self
    }

    /// Both stops must be served within `minutes`.
    pub fn expires_in(mut self, minutes: i64) -> Self {
        self.order.pickup_window = TimeWindow::until(minutes);
        self.order.delivery_window = TimeWindow::until(minutes);
        self
    }

    pub fn pickup_window(mut self, start: i64, end: i64) -> Self {
        self.order.pickup_window = TimeWindow::new(start, end);
        self
    }

    pub fn service_time(mut self, minutes: i64) -> Self {
        self.order.service_time = minutes;
        self
    }

    pub fn build(self) -> Order {
        self.order
    }
}

pub fn vehicle(id: &str, capacity: i64, lat: f64, lon: f64) -> Vehicle {
    Vehicle::new(id, capacity, Coordinate::new(lat, lon))
}

pub fn unpositioned_vehicle(id: &str, capacity: i64) -> Vehicle {
    Vehicle {
        id: VehicleId::new(id),
        capacity,
        start_location: None,
    }
}

pub fn vid(id: &str) -> VehicleId {
    VehicleId::new(id)
}

pub fn oid(id: &str) -> OrderId {
    OrderId::new(id)
}

pub fn hours(h: i64) -> i64 {
    h * 60
}
