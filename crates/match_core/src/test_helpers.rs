//! Test helpers for common test setup and utilities.
//!
//! This module provides shared fixtures for unit tests, integration tests and benches.

use std::sync::Arc;

use crate::clock::ManualClock;
use crate::demand::DemandFieldConfig;
use crate::geo::{GeoPoint, EARTH_RADIUS_KM};
use crate::matching::{Candidate, MatchSelector};
use crate::zones::ZoneRegistry;

/// Alexanderplatz, inside the `ber-mitte` zone of the built-in catalog.
pub const TEST_PICKUP: GeoPoint = GeoPoint::new(52.520, 13.405);

/// Point `km` kilometres due north of `origin` (exact under the haversine model).
pub fn km_north_of(origin: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint::new(origin.lat + (km / EARTH_RADIUS_KM).to_degrees(), origin.lng)
}

/// Candidate `km` kilometres north of [TEST_PICKUP] with explicit attributes.
pub fn candidate_at_km(id: &str, km: f64, rating: f64, acceptance_rate: f64) -> Candidate {
    Candidate::new(id, km_north_of(TEST_PICKUP, km))
        .with_rating(rating)
        .with_acceptance_rate(acceptance_rate)
}

/// Selector over the Berlin catalog driven by a manual clock starting at 0.
pub fn berlin_selector(config: DemandFieldConfig) -> (MatchSelector, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let selector = MatchSelector::builder(Arc::new(ZoneRegistry::berlin()))
        .demand_config(config)
        .clock(clock.clone())
        .build();
    (selector, clock)
}
