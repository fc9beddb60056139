//! Capacity, time and precedence constraints plus the urgency-weighted
//! objective, evaluated over routes of the task graph.

use crate::error::DispatchError;
use crate::graph::{NodeKind, TaskGraph};
use crate::solver::DispatchOptions;
use crate::traits::TravelMatrix;

/// Timing and cost of one feasible vehicle route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSchedule {
    /// Service start at each stop, parallel to the route's node list.
    pub arrivals: Vec<i64>,
    /// Sum of urgency-discounted arc costs.
    pub cost: i64,
    /// Real distance driven, in metres.
    pub distance: i64,
    /// Minute the vehicle finishes its last stop (or gets home).
    pub finish: i64,
}

/// Plan quality; smaller is better, compared field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score {
    pub dropped: usize,
    /// Arc costs plus the span term.
    pub cost: i64,
    pub distance: i64,
}

pub struct CostModel<'a> {
    graph: &'a TaskGraph,
    matrix: &'a TravelMatrix,
    capacities: Vec<i64>,
    urgency_weight: i64,
    span_coefficient: i64,
    horizon: i64,
    max_wait: i64,
    return_to_start: bool,
}

impl<'a> CostModel<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        matrix: &'a TravelMatrix,
        capacities: Vec<i64>,
        options: &DispatchOptions,
    ) -> Result<Self, DispatchError> {
        let expected = graph.len();
        if !matrix.is_square(expected) {
            return Err(DispatchError::MatrixShape {
                rows: matrix.len(),
                cols: matrix.distances.first().map_or(0, Vec::len),
                expected,
            });
        }

        Ok(Self {
            graph,
            matrix,
            capacities,
            urgency_weight: options.urgency_weight,
            span_coefficient: options.span_coefficient,
            horizon: options.horizon,
            max_wait: options.max_wait,
            return_to_start: options.return_to_start,
        })
    }

    pub fn graph(&self) -> &TaskGraph {
        self.graph
    }

    pub fn capacity(&self, vehicle: usize) -> i64 {
        self.capacities[vehicle]
    }

    /// `max(0, distance - priority(to) * urgency_weight)`.
    pub fn arc_cost(&self, from: usize, to: usize) -> i64 {
        let discount = self
            .graph
            .node(to)
            .priority
            .saturating_mul(self.urgency_weight);
        self.matrix.distance(from, to).saturating_sub(discount).max(0)
    }

    /// Walk `route` for `vehicle`, returning its schedule, or `None` if any
    /// capacity, time window or precedence constraint is violated.
    pub fn evaluate(&self, vehicle: usize, route: &[usize]) -> Option<RouteSchedule> {
        let start = self.graph.start_node(vehicle);
        let capacity = self.capacities[vehicle];

        let mut schedule = RouteSchedule {
            arrivals: Vec::with_capacity(route.len()),
            ..RouteSchedule::default()
        };
        let mut open_orders: Vec<usize> = Vec::new();
        let mut prev = start;
        let mut departure: i64 = 0;
        let mut load: i64 = 0;

        for &index in route {
            let node = self.graph.node(index);
            match node.kind {
                NodeKind::VehicleStart { .. } => return None,
                NodeKind::Pickup { order } => {
                    if open_orders.contains(&order) {
                        return None;
                    }
                    open_orders.push(order);
                }
                NodeKind::Delivery { order } => {
                    let position = open_orders.iter().position(|&o| o == order)?;
                    open_orders.swap_remove(position);
                }
            }

            let arrival = departure.saturating_add(self.matrix.duration(prev, index));
            let service_start = if arrival < node.window.start {
                if node.window.start - arrival > self.max_wait {
                    return None;
                }
                node.window.start
            } else {
                arrival
            };
            if service_start > node.window.end || service_start > self.horizon {
                return None;
            }

            load += node.demand;
            if load < 0 || load > capacity {
                return None;
            }

            schedule.cost = schedule.cost.saturating_add(self.arc_cost(prev, index));
            schedule.distance += self.matrix.distance(prev, index);
            schedule.arrivals.push(service_start);
            departure = service_start.saturating_add(node.service_time);
            prev = index;
        }

        // A route that picks up must also deliver.
        if !open_orders.is_empty() {
            return None;
        }

        if route.is_empty() {
            return Some(schedule);
        }

        if self.return_to_start {
            schedule.cost = schedule.cost.saturating_add(self.arc_cost(prev, start));
            schedule.distance += self.matrix.distance(prev, start);
            departure = departure.saturating_add(self.matrix.duration(prev, start));
            if departure > self.horizon {
                return None;
            }
        }
        schedule.finish = departure;

        Some(schedule)
    }

    /// Score a full plan from its per-vehicle schedules.
    pub fn score<'s>(
        &self,
        schedules: impl IntoIterator<Item = &'s RouteSchedule>,
        dropped: usize,
    ) -> Score {
        let mut cost: i64 = 0;
        let mut distance: i64 = 0;
        let mut span: i64 = 0;
        for schedule in schedules {
            cost = cost.saturating_add(schedule.cost);
            distance += schedule.distance;
            span = span.max(schedule.finish);
        }

        Score {
            dropped,
            cost: cost.saturating_add(span.saturating_mul(self.span_coefficient)),
            distance,
        }
    }
}
