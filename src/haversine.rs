//! Haversine travel matrix provider.
//!
//! Uses great-circle distance and an assumed average speed to estimate travel
//! time. Ignores the road network, which is fine for comparing route lengths.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::Coordinate;
use crate::traits::{TravelMatrix, TravelMatrixProvider};

/// Average courier speed: 40 km/h.
const DEFAULT_SPEED_M_PER_MIN: f64 = 666.0;

/// Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine-based travel matrix provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in metres per minute.
    pub speed_m_per_min: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_m_per_min: DEFAULT_SPEED_M_PER_MIN,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_m_per_min: f64) -> Self {
        Self { speed_m_per_min }
    }

    /// Great-circle distance between two points in metres.
    pub fn distance_m(from: Coordinate, to: Coordinate) -> f64 {
        let lat1 = from.lat.to_radians();
        let lat2 = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lon = (to.lon - from.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        // Rounding can push `a` slightly outside [0, 1] for antipodal points.
        let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

        EARTH_RADIUS_M * c
    }

    /// Convert metres to whole minutes of driving.
    pub fn metres_to_minutes(&self, metres: f64) -> i64 {
        let speed = if self.speed_m_per_min > 0.0 && self.speed_m_per_min.is_finite() {
            self.speed_m_per_min
        } else {
            DEFAULT_SPEED_M_PER_MIN
        };
        (metres / speed).round() as i64
    }
}

impl TravelMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[Coordinate]) -> TravelMatrix {
        let distances: Vec<Vec<f64>> = locations
            .par_iter()
            .enumerate()
            .map(|(i, from)| {
                locations
                    .iter()
                    .enumerate()
                    .map(|(j, to)| if i == j { 0.0 } else { Self::distance_m(*from, *to) })
                    .collect()
            })
            .collect();

        let durations = distances
            .iter()
            .map(|row| row.iter().map(|m| self.metres_to_minutes(*m)).collect())
            .collect();
        let distances = distances
            .into_iter()
            .map(|row| row.into_iter().map(|m| m.round() as i64).collect())
            .collect();

        TravelMatrix {
            distances,
            durations,
        }
    }
}
