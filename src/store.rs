//! In-memory order book and fleet registry.
//!
//! Both hand out snapshots taken under a single lock, so a dispatch cycle
//! never sees a half-applied update.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InputError;
use crate::model::{Coordinate, Order, OrderId, Vehicle, VehicleId};
use crate::traits::{FleetStore, OrderStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    /// Pending, and on some vehicle's route in the latest plan.
    Assigned,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone)]
struct OrderRecord {
    order: Order,
    status: OrderStatus,
    assigned_driver: Option<VehicleId>,
}

/// Orders in submission order, with their status and assigned driver.
#[derive(Debug, Default)]
pub struct OrderBook {
    records: RwLock<Vec<OrderRecord>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status change. Terminal statuses release the driver.
    /// Returns false for unknown orders.
    pub fn set_status(&self, id: &OrderId, status: OrderStatus) -> bool {
        let mut records = self.records.write();
        let Some(record) = records.iter_mut().find(|r| &r.order.id == id) else {
            return false;
        };
        record.status = status;
        if status.is_terminal() || status == OrderStatus::Pending {
            record.assigned_driver = None;
        }
        true
    }

    pub fn status(&self, id: &OrderId) -> Option<OrderStatus> {
        self.records
            .read()
            .iter()
            .find(|r| &r.order.id == id)
            .map(|r| r.status)
    }

    pub fn assigned_driver(&self, id: &OrderId) -> Option<VehicleId> {
        self.records
            .read()
            .iter()
            .find(|r| &r.order.id == id)
            .and_then(|r| r.assigned_driver.clone())
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl OrderStore for OrderBook {
    fn submit(&self, order: Order) -> Result<(), InputError> {
        order.validate()?;
        let mut records = self.records.write();
        if records.iter().any(|r| r.order.id == order.id) {
            return Err(InputError::DuplicateOrder(order.id));
        }
        debug!(order = %order.id, quantity = order.quantity, "order submitted");
        records.push(OrderRecord {
            order,
            status: OrderStatus::Pending,
            assigned_driver: None,
        });
        Ok(())
    }

    /// Orders not yet fulfilled or cancelled, including ones assigned last
    /// cycle so the next plan can revise them.
    fn pending_orders(&self) -> Vec<Order> {
        self.records
            .read()
            .iter()
            .filter(|r| !r.status.is_terminal())
            .map(|r| r.order.clone())
            .collect()
    }

    fn record_assignments(&self, assignments: &[(OrderId, Option<VehicleId>)]) {
        let mut records = self.records.write();
        for (id, vehicle) in assignments {
            let Some(record) = records.iter_mut().find(|r| &r.order.id == id) else {
                continue;
            };
            // A status update may have landed while the solve was running.
            if record.status.is_terminal() {
                continue;
            }
            record.status = if vehicle.is_some() {
                OrderStatus::Assigned
            } else {
                OrderStatus::Pending
            };
            record.assigned_driver = vehicle.clone();
        }
    }
}

#[derive(Debug, Clone)]
struct DriverRecord {
    capacity: i64,
    position: Option<Coordinate>,
    on_duty: bool,
}

/// Drivers keyed by id, with their last reported position and duty status.
#[derive(Debug, Default)]
pub struct FleetRegistry {
    drivers: RwLock<BTreeMap<VehicleId, DriverRecord>>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver (off duty, position unknown) or update its capacity.
    pub fn register(&self, id: VehicleId, capacity: i64) -> Result<(), InputError> {
        if capacity < 0 {
            return Err(InputError::NegativeCapacity { capacity });
        }
        self.drivers
            .write()
            .entry(id)
            .and_modify(|driver| driver.capacity = capacity)
            .or_insert(DriverRecord {
                capacity,
                position: None,
                on_duty: false,
            });
        Ok(())
    }

    /// Returns `Ok(false)` if the driver is not registered.
    pub fn report_position(&self, id: &VehicleId, position: Coordinate) -> Result<bool, InputError> {
        position.validate()?;
        Ok(match self.drivers.write().get_mut(id) {
            Some(driver) => {
                driver.position = Some(position);
                true
            }
            None => false,
        })
    }

    pub fn set_on_duty(&self, id: &VehicleId, on_duty: bool) -> bool {
        match self.drivers.write().get_mut(id) {
            Some(driver) => {
                driver.on_duty = on_duty;
                true
            }
            None => false,
        }
    }
}

impl FleetStore for FleetRegistry {
    fn on_duty_vehicles(&self) -> Vec<Vehicle> {
        self.drivers
            .read()
            .iter()
            .filter(|(_, driver)| driver.on_duty)
            .map(|(id, driver)| Vehicle {
                id: id.clone(),
                capacity: driver.capacity,
                start_location: driver.position,
            })
            .collect()
    }
}
