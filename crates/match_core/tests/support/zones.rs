use std::sync::Arc;

use match_core::clock::ManualClock;
use match_core::demand::{DemandField, DemandFieldConfig};
use match_core::geo::GeoPoint;
use match_core::zones::{Zone, ZoneKind, ZoneRegistry};

/// Zone with a 1.5 km radius and no landmarks.
pub fn zone(id: &str, lat: f64, lng: f64) -> Zone {
    Zone {
        id: id.to_string(),
        name: id.to_string(),
        city: "test".to_string(),
        center: GeoPoint::new(lat, lng),
        radius_km: 1.5,
        kind: ZoneKind::Mixed,
        landmarks: Vec::new(),
    }
}

/// Three non-overlapping zones along a north-south line.
pub fn corridor_registry() -> Arc<ZoneRegistry> {
    Arc::new(
        ZoneRegistry::new(vec![
            zone("north", 52.60, 13.40),
            zone("center", 52.52, 13.40),
            zone("south", 52.44, 13.40),
        ])
        .expect("corridor registry"),
    )
}

/// Demand field over [corridor_registry] with a manual clock at 0.
pub fn corridor_field(config: DemandFieldConfig) -> (Arc<DemandField>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let field = Arc::new(DemandField::new(corridor_registry(), config, clock.clone()));
    (field, clock)
}

pub fn assert_in_bounds(field: &DemandField) {
    for signal in field.snapshot() {
        assert!(
            (0.0..=100.0).contains(&signal.intensity),
            "zone {} out of bounds: {}",
            signal.zone_id,
            signal.intensity
        );
    }
}
