//! Dispatch solver: greedy pair insertion followed by time-boxed local search.

use std::cell::Cell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constraints::{CostModel, RouteSchedule, Score};
use crate::error::{DispatchError, InputError};
use crate::graph::{NodeKind, TaskGraph};
use crate::haversine::HaversineMatrix;
use crate::model::{Order, OrderId, RouteStep, StopKind, Vehicle, VehicleId};
use crate::traits::{DropReason, TravelMatrixProvider};

/// Tunable weights and limits for one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    /// Metres of arc cost waived per point of destination priority.
    pub urgency_weight: i64,
    /// Cost added per minute of the latest vehicle finish time.
    pub span_coefficient: i64,
    /// Planning horizon in minutes. Also the reference for priority scores.
    pub horizon: i64,
    /// Longest a vehicle may idle at a stop waiting for its window to open.
    pub max_wait: i64,
    /// Wall-clock budget for the improvement phase.
    pub time_budget_ms: u64,
    /// Maximum local search passes.
    pub local_search_iterations: usize,
    /// Charge the trip back to each vehicle's start position.
    pub return_to_start: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            urgency_weight: 100,
            span_coefficient: 10,
            horizon: 1440,
            max_wait: 30,
            time_budget_ms: 5_000,
            local_search_iterations: 1_000,
            return_to_start: false,
        }
    }
}

impl DispatchOptions {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The search ran; some orders may still have been dropped.
    Planned,
    /// There were no valid pending orders.
    NothingToDo,
    /// Orders are waiting but no vehicle with a known position is on duty.
    NoCapacityAvailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectedEntity {
    Vehicle(VehicleId),
    Order(OrderId),
}

/// A vehicle or order excluded from the solve because its data is malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub entity: RejectedEntity,
    pub error: InputError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedOrder {
    pub order_id: OrderId,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub iterations: usize,
    pub improvements: usize,
    pub timed_out: bool,
}

/// Result of one dispatch: routes for vehicles with work plus the orders that
/// could not be placed this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub status: DispatchStatus,
    pub routes: BTreeMap<VehicleId, Vec<RouteStep>>,
    /// Metres driven across all routes.
    pub total_distance: i64,
    pub dropped: Vec<DroppedOrder>,
    pub rejected: Vec<Rejection>,
    /// On-duty vehicles left out because they never reported a position.
    pub unpositioned: Vec<VehicleId>,
    pub stats: SearchStats,
}

impl DispatchPlan {
    pub(crate) fn empty(status: DispatchStatus) -> Self {
        Self {
            status,
            routes: BTreeMap::new(),
            total_distance: 0,
            dropped: Vec::new(),
            rejected: Vec::new(),
            unpositioned: Vec::new(),
            stats: SearchStats::default(),
        }
    }

    /// Stops for `vehicle`, empty if it has no work.
    pub fn route_for(&self, vehicle: &VehicleId) -> &[RouteStep] {
        self.routes.get(vehicle).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Owner of every valid order: the serving vehicle, or `None` if dropped.
    pub fn assignments(&self) -> Vec<(OrderId, Option<VehicleId>)> {
        let mut assignments = Vec::new();
        for (vehicle, steps) in &self.routes {
            for step in steps.iter().filter(|s| s.kind == StopKind::Pickup) {
                assignments.push((step.order_id.clone(), Some(vehicle.clone())));
            }
        }
        for dropped in &self.dropped {
            assignments.push((dropped.order_id.clone(), None));
        }
        assignments
    }

    pub fn served_count(&self) -> usize {
        self.routes.values().map(|steps| steps.len() / 2).sum()
    }
}

/// Plan with the default haversine metric and options.
pub fn dispatch(vehicles: &[Vehicle], orders: &[Order]) -> Result<DispatchPlan, DispatchError> {
    solve(
        vehicles,
        orders,
        &HaversineMatrix::default(),
        &DispatchOptions::default(),
    )
}

pub fn solve<M>(
    vehicles: &[Vehicle],
    orders: &[Order],
    matrix_provider: &M,
    options: &DispatchOptions,
) -> Result<DispatchPlan, DispatchError>
where
    M: TravelMatrixProvider,
{
    let started = Instant::now();
    let mut rejected = Vec::new();
    let mut unpositioned = Vec::new();

    let fleet = screen_vehicles(vehicles, &mut rejected, &mut unpositioned);
    let pending = screen_orders(orders, &mut rejected);

    for rejection in &rejected {
        warn!(entity = ?rejection.entity, error = %rejection.error, "rejected dispatch input");
    }

    if pending.is_empty() {
        let mut plan = DispatchPlan::empty(DispatchStatus::NothingToDo);
        plan.rejected = rejected;
        plan.unpositioned = unpositioned;
        return Ok(plan);
    }

    if fleet.is_empty() {
        info!(orders = pending.len(), "no positioned vehicles on duty");
        let mut plan = DispatchPlan::empty(DispatchStatus::NoCapacityAvailable);
        plan.dropped = pending
            .iter()
            .map(|order| DroppedOrder {
                order_id: order.id.clone(),
                reason: DropReason::NoVehicleAvailable,
            })
            .collect();
        plan.rejected = rejected;
        plan.unpositioned = unpositioned;
        return Ok(plan);
    }

    let graph = TaskGraph::build(&fleet, &pending, options.horizon)?;
    let matrix = matrix_provider.matrix_for(&graph.locations());
    let capacities = fleet.iter().map(|vehicle| vehicle.capacity).collect();
    let model = CostModel::new(&graph, &matrix, capacities, options)?;

    let mut search = Search::new(&model, Clock::new(started + options.time_budget()));
    search.construct();
    let stats = search.improve(options.local_search_iterations);

    let max_capacity = fleet.iter().map(|v| v.capacity).max().unwrap_or(0);
    let mut plan = DispatchPlan::empty(DispatchStatus::Planned);
    for (vehicle, (route, schedule)) in search.routes.iter().zip(&search.schedules).enumerate() {
        if route.is_empty() {
            continue;
        }
        let steps = route
            .iter()
            .zip(&schedule.arrivals)
            .filter_map(|(&index, &arrival)| {
                let node = graph.node(index);
                let (order, kind) = match node.kind {
                    NodeKind::Pickup { order } => (order, StopKind::Pickup),
                    NodeKind::Delivery { order } => (order, StopKind::Delivery),
                    NodeKind::VehicleStart { .. } => return None,
                };
                Some(RouteStep {
                    order_id: pending[order].id.clone(),
                    kind,
                    location: node.location,
                    estimated_arrival: arrival,
                })
            })
            .collect();
        plan.total_distance += schedule.distance;
        plan.routes.insert(fleet[vehicle].id.clone(), steps);
    }

    plan.dropped = search
        .unplaced
        .iter()
        .map(|&order| DroppedOrder {
            order_id: pending[order].id.clone(),
            reason: if pending[order].quantity > max_capacity {
                DropReason::ExceedsCapacity
            } else {
                DropReason::NoFeasibleSlot
            },
        })
        .collect();
    plan.rejected = rejected;
    plan.unpositioned = unpositioned;
    plan.stats = stats;

    info!(
        vehicles = fleet.len(),
        orders = pending.len(),
        served = plan.served_count(),
        dropped = plan.dropped.len(),
        total_distance = plan.total_distance,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dispatch planned"
    );

    Ok(plan)
}

/// Keep valid, positioned, uniquely identified vehicles.
fn screen_vehicles(
    vehicles: &[Vehicle],
    rejected: &mut Vec<Rejection>,
    unpositioned: &mut Vec<VehicleId>,
) -> Vec<Vehicle> {
    let mut seen = HashSet::new();
    let mut fleet = Vec::with_capacity(vehicles.len());
    for vehicle in vehicles {
        let error = if !seen.insert(vehicle.id.clone()) {
            Some(InputError::DuplicateVehicle(vehicle.id.clone()))
        } else {
            vehicle.validate().err()
        };
        if let Some(error) = error {
            rejected.push(Rejection {
                entity: RejectedEntity::Vehicle(vehicle.id.clone()),
                error,
            });
        } else if vehicle.start_location.is_none() {
            unpositioned.push(vehicle.id.clone());
        } else {
            fleet.push(vehicle.clone());
        }
    }
    fleet
}

fn screen_orders(orders: &[Order], rejected: &mut Vec<Rejection>) -> Vec<Order> {
    let mut seen = HashSet::new();
    let mut pending = Vec::with_capacity(orders.len());
    for order in orders {
        let error = if !seen.insert(order.id.clone()) {
            Some(InputError::DuplicateOrder(order.id.clone()))
        } else {
            order.validate().err()
        };
        match error {
            Some(error) => rejected.push(Rejection {
                entity: RejectedEntity::Order(order.id.clone()),
                error,
            }),
            None => pending.push(order.clone()),
        }
    }
    pending
}

// ============================================================================
// Search State
// ============================================================================

/// Wall-clock deadline for one search.
///
/// Remembers whether any step observed the deadline, so a search that stopped
/// early is never reported as converged.
struct Clock {
    deadline: Instant,
    tripped: Cell<bool>,
}

impl Clock {
    fn new(deadline: Instant) -> Self {
        Self {
            deadline,
            tripped: Cell::new(false),
        }
    }

    fn expired(&self) -> bool {
        let expired = Instant::now() >= self.deadline;
        if expired {
            self.tripped.set(true);
        }
        expired
    }

    /// True once any caller has seen the deadline pass.
    fn tripped(&self) -> bool {
        self.tripped.get()
    }
}

/// A feasible placement of one order's pickup and delivery.
struct Insertion {
    vehicle: usize,
    route: Vec<usize>,
    schedule: RouteSchedule,
    score: Score,
}

struct Search<'m, 'g> {
    model: &'m CostModel<'g>,
    /// Node indices per vehicle, excluding the start node.
    routes: Vec<Vec<usize>>,
    schedules: Vec<RouteSchedule>,
    /// Orders not on any route, ascending.
    unplaced: Vec<usize>,
    clock: Clock,
}

impl<'m, 'g> Search<'m, 'g> {
    fn new(model: &'m CostModel<'g>, clock: Clock) -> Self {
        let graph = model.graph();
        let vehicles = graph.vehicle_count();
        Self {
            model,
            routes: vec![Vec::new(); vehicles],
            schedules: vec![RouteSchedule::default(); vehicles],
            unplaced: (0..graph.order_count()).collect(),
            clock,
        }
    }

    fn graph(&self) -> &TaskGraph {
        self.model.graph()
    }

    fn score(&self) -> Score {
        self.model.score(&self.schedules, self.unplaced.len())
    }

    fn apply(&mut self, vehicle: usize, route: Vec<usize>, schedule: RouteSchedule) {
        self.routes[vehicle] = route;
        self.schedules[vehicle] = schedule;
    }

    /// Greedy construction: most urgent orders first, each at its cheapest
    /// feasible position. Once the budget is spent, remaining orders are
    /// appended to the end of the best route instead.
    fn construct(&mut self) {
        let graph = self.graph();
        let mut queue: Vec<usize> = (0..graph.order_count()).collect();
        queue.sort_by_key(|&order| {
            let (pickup, _) = graph.pair(order);
            (Reverse(graph.node(pickup).priority), order)
        });

        let mut placed = 0;
        for order in queue {
            let dropped_after = self.unplaced.len() - 1;
            let mut insertion = best_insertion(
                self.model,
                &self.routes,
                &self.schedules,
                order,
                dropped_after,
                None,
                &self.clock,
            );
            if insertion.is_none() && self.clock.tripped() {
                insertion = tail_insertion(
                    self.model,
                    &self.routes,
                    &self.schedules,
                    order,
                    dropped_after,
                );
            }
            if let Some(insertion) = insertion {
                self.apply(insertion.vehicle, insertion.route, insertion.schedule);
                self.unplaced.retain(|&o| o != order);
                placed += 1;
            }
        }

        debug!(placed, unplaced = self.unplaced.len(), score = ?self.score(), "initial plan constructed");
    }

    /// Local search until no move improves, the iteration cap is hit, or the
    /// time budget runs out.
    fn improve(&mut self, max_iterations: usize) -> SearchStats {
        let mut stats = SearchStats::default();

        while stats.iterations < max_iterations && !self.clock.expired() {
            stats.iterations += 1;
            if !self.improve_once() {
                break;
            }
            stats.improvements += 1;
        }
        // A move that ran out of time also reports no improvement.
        stats.timed_out = self.clock.tripped();

        if stats.timed_out {
            warn!(iterations = stats.iterations, "search budget exhausted, returning best plan");
        }
        debug!(
            iterations = stats.iterations,
            improvements = stats.improvements,
            score = ?self.score(),
            "local search finished"
        );
        stats
    }

    /// Apply the first improving move, trying the cheapest kinds first.
    fn improve_once(&mut self) -> bool {
        self.insert_unplaced() || self.relocate_pair() || self.exchange_pairs() || self.two_opt()
    }

    /// Place an order that construction could not fit.
    fn insert_unplaced(&mut self) -> bool {
        for position in 0..self.unplaced.len() {
            let order = self.unplaced[position];
            if let Some(insertion) = best_insertion(
                self.model,
                &self.routes,
                &self.schedules,
                order,
                self.unplaced.len() - 1,
                None,
                &self.clock,
            ) {
                self.apply(insertion.vehicle, insertion.route, insertion.schedule);
                self.unplaced.remove(position);
                return true;
            }
        }
        false
    }

    /// Move one order's pickup and delivery to their best position in any
    /// route, including elsewhere in the same route.
    fn relocate_pair(&mut self) -> bool {
        let current = self.score();
        let dropped = self.unplaced.len();

        for vehicle in 0..self.routes.len() {
            for order in orders_on(self.graph(), &self.routes[vehicle]) {
                if self.clock.expired() {
                    return false;
                }
                let reduced = without_order(self.graph(), &self.routes[vehicle], order);
                let Some(reduced_schedule) = self.model.evaluate(vehicle, &reduced) else {
                    continue;
                };

                let mut routes = self.routes.clone();
                let mut schedules = self.schedules.clone();
                routes[vehicle] = reduced;
                schedules[vehicle] = reduced_schedule;

                let Some(insertion) =
                    best_insertion(self.model, &routes, &schedules, order, dropped, None, &self.clock)
                else {
                    continue;
                };
                if insertion.score < current {
                    routes[insertion.vehicle] = insertion.route;
                    schedules[insertion.vehicle] = insertion.schedule;
                    self.routes = routes;
                    self.schedules = schedules;
                    return true;
                }
            }
        }
        false
    }

    /// Swap two orders between two routes, each reinserted at its best
    /// position in the other route.
    fn exchange_pairs(&mut self) -> bool {
        let current = self.score();
        let dropped = self.unplaced.len();
        let vehicles = self.routes.len();

        for first in 0..vehicles {
            for second in first + 1..vehicles {
                for a in orders_on(self.graph(), &self.routes[first]) {
                    let first_reduced = without_order(self.graph(), &self.routes[first], a);
                    let Some(first_schedule) = self.model.evaluate(first, &first_reduced) else {
                        continue;
                    };
                    for b in orders_on(self.graph(), &self.routes[second]) {
                        if self.clock.expired() {
                            return false;
                        }
                        let second_reduced = without_order(self.graph(), &self.routes[second], b);
                        let Some(second_schedule) = self.model.evaluate(second, &second_reduced)
                        else {
                            continue;
                        };

                        let mut routes = self.routes.clone();
                        let mut schedules = self.schedules.clone();
                        routes[first] = first_reduced.clone();
                        schedules[first] = first_schedule.clone();
                        routes[second] = second_reduced;
                        schedules[second] = second_schedule;

                        let Some(b_in_first) = best_insertion(
                            self.model,
                            &routes,
                            &schedules,
                            b,
                            dropped,
                            Some(first),
                            &self.clock,
                        ) else {
                            continue;
                        };
                        routes[first] = b_in_first.route;
                        schedules[first] = b_in_first.schedule;

                        let Some(a_in_second) = best_insertion(
                            self.model,
                            &routes,
                            &schedules,
                            a,
                            dropped,
                            Some(second),
                            &self.clock,
                        ) else {
                            continue;
                        };
                        if a_in_second.score < current {
                            routes[second] = a_in_second.route;
                            schedules[second] = a_in_second.schedule;
                            self.routes = routes;
                            self.schedules = schedules;
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    /// 2-opt: reverse a segment of a single route.
    fn two_opt(&mut self) -> bool {
        let current = self.score();
        let dropped = self.unplaced.len();

        for vehicle in 0..self.routes.len() {
            let n = self.routes[vehicle].len();
            for i in 0..n.saturating_sub(1) {
                if self.clock.expired() {
                    return false;
                }
                for j in i + 1..n {
                    let mut candidate = self.routes[vehicle].clone();
                    candidate[i..=j].reverse();

                    let Some(schedule) = self.model.evaluate(vehicle, &candidate) else {
                        continue;
                    };
                    let score = self.model.score(
                        replaced(&self.schedules, vehicle, &schedule),
                        dropped,
                    );
                    if score < current {
                        self.apply(vehicle, candidate, schedule);
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// Cheapest feasible placement of `order` across `routes` (or only in
/// `only_vehicle`). Ties keep the lowest vehicle, then the lowest positions.
///
/// Stops scanning when `clock` expires and returns the best placement seen
/// so far.
fn best_insertion(
    model: &CostModel<'_>,
    routes: &[Vec<usize>],
    schedules: &[RouteSchedule],
    order: usize,
    dropped: usize,
    only_vehicle: Option<usize>,
    clock: &Clock,
) -> Option<Insertion> {
    let graph = model.graph();
    let (pickup, delivery) = graph.pair(order);
    let quantity = graph.node(pickup).demand;

    let mut best: Option<Insertion> = None;
    for (vehicle, route) in routes.iter().enumerate() {
        if only_vehicle.is_some_and(|only| only != vehicle) || quantity > model.capacity(vehicle) {
            continue;
        }
        let len = route.len();
        for p in 0..=len {
            if clock.expired() {
                return best;
            }
            for d in p..=len {
                let mut candidate = Vec::with_capacity(len + 2);
                candidate.extend_from_slice(&route[..p]);
                candidate.push(pickup);
                candidate.extend_from_slice(&route[p..d]);
                candidate.push(delivery);
                candidate.extend_from_slice(&route[d..]);

                let Some(schedule) = model.evaluate(vehicle, &candidate) else {
                    continue;
                };
                let score = model.score(replaced(schedules, vehicle, &schedule), dropped);
                if best.as_ref().is_none_or(|b| score < b.score) {
                    best = Some(Insertion {
                        vehicle,
                        route: candidate,
                        schedule,
                        score,
                    });
                }
            }
        }
    }
    best
}

/// Cheapest placement of `order` with both stops appended to the end of a
/// route. Linear in the fleet size, used once the time budget is spent.
fn tail_insertion(
    model: &CostModel<'_>,
    routes: &[Vec<usize>],
    schedules: &[RouteSchedule],
    order: usize,
    dropped: usize,
) -> Option<Insertion> {
    let (pickup, delivery) = model.graph().pair(order);
    let quantity = model.graph().node(pickup).demand;

    let mut best: Option<Insertion> = None;
    for (vehicle, route) in routes.iter().enumerate() {
        if quantity > model.capacity(vehicle) {
            continue;
        }
        let mut candidate = Vec::with_capacity(route.len() + 2);
        candidate.extend_from_slice(route);
        candidate.extend([pickup, delivery]);

        let Some(schedule) = model.evaluate(vehicle, &candidate) else {
            continue;
        };
        let score = model.score(replaced(schedules, vehicle, &schedule), dropped);
        if best.as_ref().is_none_or(|b| score < b.score) {
            best = Some(Insertion {
                vehicle,
                route: candidate,
                schedule,
                score,
            });
        }
    }
    best
}

/// `schedules` with the entry for `vehicle` swapped for `schedule`.
fn replaced<'s>(
    schedules: &'s [RouteSchedule],
    vehicle: usize,
    schedule: &'s RouteSchedule,
) -> impl Iterator<Item = &'s RouteSchedule> {
    schedules
        .iter()
        .enumerate()
        .map(move |(i, s)| if i == vehicle { schedule } else { s })
}

/// Orders on a route, in pickup order.
fn orders_on(graph: &TaskGraph, route: &[usize]) -> Vec<usize> {
    route
        .iter()
        .filter_map(|&index| match graph.node(index).kind {
            NodeKind::Pickup { order } => Some(order),
            _ => None,
        })
        .collect()
}

fn without_order(graph: &TaskGraph, route: &[usize], order: usize) -> Vec<usize> {
    route
        .iter()
        .copied()
        .filter(|&index| graph.node(index).order() != Some(order))
        .collect()
}
