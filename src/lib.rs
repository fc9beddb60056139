//! fleet-dispatch
//!
//! Plans courier routes for perishable donations: pickups and deliveries
//! under capacity, precedence and expiry constraints, biased toward the most
//! urgent orders and recomputed on every polling cycle.

pub mod error;
pub mod model;
pub mod traits;
pub mod haversine;
pub mod graph;
pub mod constraints;
pub mod solver;
pub mod reconciler;
pub mod store;
pub mod intake;

pub use error::{DispatchError, InputError, IntakeError};
pub use model::{Coordinate, Order, OrderId, RouteStep, StopKind, TimeWindow, Vehicle, VehicleId};
pub use reconciler::{AssignmentTable, CycleOutcome, Dispatcher};
pub use solver::{DispatchOptions, DispatchPlan, DispatchStatus, dispatch, solve};
