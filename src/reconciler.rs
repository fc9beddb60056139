//! Assignment table and the single-flight dispatch cycle that keeps it current.
//!
//! Every on-duty driver's client polls for its route, and any poll may trigger
//! a recompute. Cycles are serialised: a caller that arrives while another
//! cycle is running waits for it and, if that cycle finished after the caller
//! arrived, takes its result instead of solving again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{DispatchError, InputError};
use crate::haversine::HaversineMatrix;
use crate::model::{Order, OrderId, RouteStep, VehicleId};
use crate::solver::{DispatchOptions, DispatchPlan, solve};
use crate::traits::{FleetStore, OrderStore, TravelMatrixProvider};

/// Latest plan, as seen by drivers: who owns each order and each vehicle's stops.
#[derive(Debug, Default, Clone)]
pub struct AssignmentTable {
    assignments: BTreeMap<OrderId, Option<VehicleId>>,
    routes: HashMap<VehicleId, Vec<RouteStep>>,
}

impl AssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly submitted order as unassigned.
    pub fn register(&mut self, order: OrderId) {
        self.assignments.entry(order).or_insert(None);
    }

    /// Record `vehicle` as the owner of `order`, replacing any previous owner.
    pub fn assign(&mut self, order: OrderId, vehicle: Option<VehicleId>) {
        self.assignments.insert(order, vehicle);
    }

    pub fn vehicle_for(&self, order: &OrderId) -> Option<&VehicleId> {
        self.assignments.get(order).and_then(Option::as_ref)
    }

    pub fn is_tracked(&self, order: &OrderId) -> bool {
        self.assignments.contains_key(order)
    }

    /// Stops for `vehicle`, empty if it has no work.
    pub fn route_for(&self, vehicle: &VehicleId) -> &[RouteStep] {
        self.routes.get(vehicle).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn assignments(&self) -> impl Iterator<Item = (&OrderId, Option<&VehicleId>)> {
        self.assignments.iter().map(|(order, vehicle)| (order, vehicle.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Replace the table with `plan`.
    ///
    /// Every order in `pending` ends up either owned by the vehicle whose
    /// route serves it or unassigned. Orders not in `pending` have reached a
    /// terminal state and are forgotten. Returns the new assignment of each
    /// pending order, in `pending` order.
    pub fn apply(
        &mut self,
        plan: &DispatchPlan,
        pending: &[OrderId],
    ) -> Vec<(OrderId, Option<VehicleId>)> {
        let owners: HashMap<OrderId, VehicleId> = plan
            .assignments()
            .into_iter()
            .filter_map(|(order, vehicle)| vehicle.map(|v| (order, v)))
            .collect();

        self.assignments.clear();
        let mut written = Vec::with_capacity(pending.len());
        for order in pending {
            let owner = owners.get(order).cloned();
            self.assign(order.clone(), owner.clone());
            written.push((order.clone(), owner));
        }
        self.routes = plan
            .routes
            .iter()
            .map(|(vehicle, steps)| (vehicle.clone(), steps.clone()))
            .collect();

        written
    }
}

/// A finished dispatch cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// Increases by one with every computed cycle.
    pub generation: u64,
    pub plan: DispatchPlan,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// This caller ran the solve.
    Computed(Arc<CycleReport>),
    /// Another caller's cycle completed while this one waited; its result is
    /// shared instead of recomputing.
    Coalesced(Arc<CycleReport>),
}

impl CycleOutcome {
    pub fn report(&self) -> &Arc<CycleReport> {
        match self {
            CycleOutcome::Computed(report) | CycleOutcome::Coalesced(report) => report,
        }
    }

    pub fn plan(&self) -> &DispatchPlan {
        &self.report().plan
    }

    pub fn is_coalesced(&self) -> bool {
        matches!(self, CycleOutcome::Coalesced(_))
    }
}

/// Runs recompute-and-persist cycles against a fleet and an order store.
pub struct Dispatcher<F, O, M = HaversineMatrix> {
    fleet: F,
    orders: O,
    matrix: M,
    options: DispatchOptions,
    table: RwLock<AssignmentTable>,
    /// Held for the whole of a cycle; stores the last completed one.
    last_cycle: Mutex<Option<Arc<CycleReport>>>,
    generation: AtomicU64,
}

impl<F, O> Dispatcher<F, O, HaversineMatrix>
where
    F: FleetStore,
    O: OrderStore,
{
    pub fn new(fleet: F, orders: O) -> Self {
        Self::with_matrix(fleet, orders, HaversineMatrix::default(), DispatchOptions::default())
    }
}

impl<F, O, M> Dispatcher<F, O, M>
where
    F: FleetStore,
    O: OrderStore,
    M: TravelMatrixProvider,
{
    pub fn with_matrix(fleet: F, orders: O, matrix: M, options: DispatchOptions) -> Self {
        Self {
            fleet,
            orders,
            matrix,
            options,
            table: RwLock::new(AssignmentTable::new()),
            last_cycle: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn fleet(&self) -> &F {
        &self.fleet
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    /// Hand a new order to the store and track it as unassigned until a
    /// cycle places it.
    pub fn submit(&self, order: Order) -> Result<(), InputError> {
        let id = order.id.clone();
        self.orders.submit(order)?;
        self.table.write().register(id.clone());
        debug!(order = %id, "order tracked as unassigned");
        Ok(())
    }

    /// Snapshot, solve and persist, with at most one cycle in flight.
    pub fn run_cycle(&self) -> Result<CycleOutcome, DispatchError> {
        let observed = self.generation.load(Ordering::Acquire);
        let mut last_cycle = self.last_cycle.lock();

        if let Some(report) = last_cycle.as_ref() {
            if report.generation > observed {
                debug!(generation = report.generation, "sharing cycle completed while waiting");
                return Ok(CycleOutcome::Coalesced(Arc::clone(report)));
            }
        }

        let vehicles = self.fleet.on_duty_vehicles();
        let orders = self.orders.pending_orders();
        let plan = solve(&vehicles, &orders, &self.matrix, &self.options)?;

        let pending: Vec<OrderId> = orders.iter().map(|order| order.id.clone()).collect();
        let assignments = self.table.write().apply(&plan, &pending);
        self.orders.record_assignments(&assignments);

        let generation = self.generation.load(Ordering::Relaxed) + 1;
        let report = Arc::new(CycleReport { generation, plan });
        *last_cycle = Some(Arc::clone(&report));
        self.generation.store(generation, Ordering::Release);

        info!(
            generation,
            status = ?report.plan.status,
            assigned = assignments.iter().filter(|(_, v)| v.is_some()).count(),
            unassigned = assignments.iter().filter(|(_, v)| v.is_none()).count(),
            "dispatch cycle persisted"
        );

        Ok(CycleOutcome::Computed(report))
    }

    /// The stops assigned to `vehicle` by the latest cycle.
    pub fn route_for(&self, vehicle: &VehicleId) -> Vec<RouteStep> {
        self.table.read().route_for(vehicle).to_vec()
    }

    pub fn vehicle_for(&self, order: &OrderId) -> Option<VehicleId> {
        self.table.read().vehicle_for(order).cloned()
    }

    /// Copy of the whole table, taken under a single read lock.
    pub fn table_snapshot(&self) -> AssignmentTable {
        self.table.read().clone()
    }

    pub fn last_cycle(&self) -> Option<Arc<CycleReport>> {
        self.last_cycle.lock().clone()
    }
}
