//! Test fixtures for fleet-dispatch.
//!
//! Provides:
//! - Real Kota / Jaipur relief centers and donation points
//! - Builders for orders and vehicles
//! - Plan invariant checks shared by the integration and property tests

#![allow(dead_code)]

pub mod builders;
pub mod invariants;
pub mod kota_locations;

pub use builders::*;
pub use invariants::*;
