//! Drive the matching engine over the Berlin catalog for one simulated hour and
//! print the resulting demand hot zones.
//!
//! Run with: RUST_LOG=match_core=debug cargo run -p match_core --example match_demo

use std::sync::Arc;

use bevy_ecs::prelude::World;
use match_core::clock::{ManualClock, ONE_MIN_MS};
use match_core::config::EngineConfig;
use match_core::ecs::{
    maintenance_schedule, ClockResource, DemandFieldResource, MaintenanceStats,
};
use match_core::engine::build_engine;
use match_core::geo::GeoPoint;
use match_core::logging::init_tracing;
use match_core::matching::{Candidate, MatchOutcome};
use match_core::test_helpers::km_north_of;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("match_core=info");

    const SIMULATION_MINUTES: u64 = 60;
    const REQUESTS_PER_MINUTE: usize = 20;

    let mut config = EngineConfig::default();
    // Inline decay is off: the ECS schedule below owns the tick.
    config.evaporate_inline = false;
    config
        .demand
        .initial_intensity
        .insert("ber-airport".to_string(), 65.0);

    let clock = Arc::new(ManualClock::new(0));
    let engine = build_engine(&config, clock.clone())?;
    let selector = engine.selector.clone();

    let mut world = World::new();
    world.insert_resource(ClockResource(clock.clone()));
    world.insert_resource(DemandFieldResource::from_selector(&selector));
    world.insert_resource(MaintenanceStats::default());
    let mut schedule = maintenance_schedule();

    let hotspots = selector
        .geo_index()
        .registry()
        .zones()
        .iter()
        .map(|zone| zone.center)
        .collect::<Vec<_>>();
    let mut rng = StdRng::seed_from_u64(123);
    let mut matched = 0usize;

    for _ in 0..SIMULATION_MINUTES {
        for _ in 0..REQUESTS_PER_MINUTE {
            let origin = hotspots[rng.gen_range(0..hotspots.len())];
            let pickup = km_north_of(origin, rng.gen_range(-1.0..1.0));
            let drivers = (0..8)
                .map(|i| {
                    Candidate::new(
                        format!("driver-{i}"),
                        GeoPoint::new(
                            pickup.lat + rng.gen_range(-0.03..0.03),
                            pickup.lng + rng.gen_range(-0.05..0.05),
                        ),
                    )
                    .with_rating(rng.gen_range(3.5..5.0))
                    .with_acceptance_rate(rng.gen_range(0.5..1.0))
                })
                .collect::<Vec<_>>();

            if let Some(best) = selector.find_best(pickup, &drivers) {
                matched += 1;
                let outcome = match rng.gen_range(0..10) {
                    0 => MatchOutcome::Timeout,
                    1 => MatchOutcome::Rejected,
                    2 => MatchOutcome::Cancelled,
                    _ => MatchOutcome::Completed,
                };
                selector.record_outcome(&best, outcome);
            }
        }
        clock.advance(ONE_MIN_MS);
        schedule.run(&mut world);
    }

    let stats = *world.resource::<MaintenanceStats>();
    println!(
        "--- Match demo ({} min, {} requests/min) ---",
        SIMULATION_MINUTES, REQUESTS_PER_MINUTE
    );
    println!("Matched requests: {}", matched);
    println!("Decay ticks applied: {}", stats.decay_ticks);
    println!("\nHot zones (intensity >= 50):");
    for signal in selector.hot_zones(50.0) {
        println!("  {:<20} {:>6.2}", signal.zone_id, signal.intensity);
    }
    Ok(())
}
