//! Kota (Rajasthan) locations for realistic test fixtures.
//!
//! Relief centers match the directory the donation service ships with.
//! Donation points are restaurants, markets and halls around the city.

use fleet_dispatch::Coordinate;
use fleet_dispatch::intake::ReliefCenter;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64) -> Self {
        Self { name, lat, lon }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

// ============================================================================
// Relief Centers
// ============================================================================

pub const RELIEF_CENTERS: &[Location] = &[
    Location::new("Dadabari Relief Center", 25.1580, 75.8280),
    Location::new("Nayapura Food Bank", 25.1910, 75.8450),
    Location::new("Talwandi Shelter", 25.1436, 75.8540),
    Location::new("Kota Station Aid", 25.2215, 75.8810),
];

pub const OUT_OF_TOWN_CENTERS: &[(&str, &str, f64, f64)] = &[
    ("Akshaya Patra Jaipur", "Jaipur", 26.8225, 75.8018),
    ("Rays Asha Ki Kiran", "Jaipur", 26.8912, 75.7600),
    ("Sambhali Trust", "Jodhpur", 26.2890, 73.0240),
    ("Seva Mandir", "Udaipur", 24.5940, 73.6820),
];

/// Every center in the directory, Kota first.
pub fn relief_directory() -> Vec<ReliefCenter> {
    let mut centers: Vec<ReliefCenter> = RELIEF_CENTERS
        .iter()
        .map(|l| ReliefCenter::new(l.name, "Kota", l.coordinate()))
        .collect();
    centers.extend(
        OUT_OF_TOWN_CENTERS
            .iter()
            .map(|(name, city, lat, lon)| ReliefCenter::new(*name, *city, Coordinate::new(*lat, *lon))),
    );
    centers
}

// ============================================================================
// Donation Points
// ============================================================================

pub const DONATION_POINTS: &[Location] = &[
    Location::new("Gumanpura Market", 25.1790, 75.8470),
    Location::new("Chambal Garden Cafe", 25.1620, 75.8360),
    Location::new("Kishore Sagar Hall", 25.1750, 75.8400),
    Location::new("Mahaveer Nagar Kitchen", 25.1390, 75.8120),
    Location::new("Talwandi Circle Restaurant", 25.1470, 75.8480),
    Location::new("Kunhari Banquet", 25.2050, 75.8700),
    Location::new("Indra Vihar Sweets", 25.1400, 75.8380),
    Location::new("Vigyan Nagar Canteen", 25.1300, 75.8550),
];

// ============================================================================
// Driver Start Positions
// ============================================================================

pub const DRIVER_STARTS: &[Location] = &[
    Location::new("Kota Junction", 25.2006, 75.9023),
    Location::new("Aerodrome Circle", 25.1600, 75.8450),
    Location::new("Rangbari", 25.1200, 75.8300),
];
