//! ECS integration for hosts that drive the engine from a bevy schedule.
//!
//! The engine never starts its own timers. A host inserts these resources into its
//! world and runs [maintenance_schedule] on whatever cadence it likes; the decay
//! tick stays gated by the demand field's own interval, so over-ticking is harmless.

use std::sync::Arc;

use bevy_ecs::prelude::{Res, ResMut, Resource, Schedule};

use crate::clock::Clock;
use crate::demand::DemandField;
use crate::matching::MatchSelector;
use crate::persistence::PersistenceSync;

#[derive(Resource, Clone)]
pub struct DemandFieldResource(pub Arc<DemandField>);

#[derive(Resource, Clone)]
pub struct ClockResource(pub Arc<dyn Clock>);

#[derive(Resource, Clone)]
pub struct PersistenceResource(pub PersistenceSync);

/// Counters updated by [demand_maintenance_system].
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceStats {
    pub runs: u64,
    pub decay_ticks: u64,
    pub last_decay_ms: Option<u64>,
}

impl DemandFieldResource {
    pub fn from_selector(selector: &MatchSelector) -> Self {
        Self(selector.demand().clone())
    }
}

/// Run the clock-gated decay tick and publish a snapshot when it applied.
pub fn demand_maintenance_system(
    clock: Res<ClockResource>,
    field: Res<DemandFieldResource>,
    persistence: Option<Res<PersistenceResource>>,
    mut stats: ResMut<MaintenanceStats>,
) {
    let now_ms = clock.0.now_ms();
    stats.runs += 1;
    if !field.0.evaporate(now_ms) {
        return;
    }
    stats.decay_ticks += 1;
    stats.last_decay_ms = Some(now_ms);
    if let Some(persistence) = persistence {
        persistence.0.publish(field.0.revisioned_snapshot());
    }
}

/// Schedule containing the demand maintenance system.
pub fn maintenance_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(demand_maintenance_system);
    schedule
}

#[cfg(test)]
mod tests {
    use bevy_ecs::prelude::World;

    use super::*;
    use crate::clock::{ManualClock, ONE_MIN_MS};
    use crate::demand::DemandFieldConfig;
    use crate::persistence::persistence_channel;
    use crate::zones::ZoneRegistry;

    fn maintenance_world() -> (World, Arc<DemandField>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let field = Arc::new(DemandField::new(
            Arc::new(ZoneRegistry::berlin()),
            DemandFieldConfig::default().with_initial_intensity("ber-mitte", 60.0),
            clock.clone(),
        ));

        let mut world = World::new();
        world.insert_resource(ClockResource(clock.clone()));
        world.insert_resource(DemandFieldResource(field.clone()));
        world.insert_resource(MaintenanceStats::default());
        (world, field, clock)
    }

    #[test]
    fn schedule_applies_one_tick_per_interval() {
        let (mut world, field, clock) = maintenance_world();
        let mut schedule = maintenance_schedule();

        schedule.run(&mut world);
        clock.advance(ONE_MIN_MS / 2);
        schedule.run(&mut world);
        assert_eq!(field.intensity_of("ber-mitte"), Some(60.0));

        clock.advance(ONE_MIN_MS / 2);
        schedule.run(&mut world);
        schedule.run(&mut world);

        let stats = *world.resource::<MaintenanceStats>();
        assert_eq!(stats.runs, 4);
        assert_eq!(stats.decay_ticks, 1);
        assert_eq!(stats.last_decay_ms, Some(ONE_MIN_MS));
        let mitte = field.intensity_of("ber-mitte").expect("mitte");
        assert!((mitte - 57.0).abs() < 1e-9);
    }

    #[test]
    fn applied_tick_publishes_one_snapshot() {
        let (mut world, field, clock) = maintenance_world();
        let (sync, mut worker) = persistence_channel(4);
        world.insert_resource(PersistenceResource(sync));
        let mut schedule = maintenance_schedule();

        schedule.run(&mut world);
        assert!(worker.drain_queued().is_empty());

        clock.advance(ONE_MIN_MS);
        schedule.run(&mut world);
        schedule.run(&mut world);

        let queued = worker.drain_queued();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].revision, field.revision());
        assert_eq!(queued[0].signals, field.snapshot());
        let mitte = queued[0]
            .signals
            .iter()
            .find(|s| s.zone_id == "ber-mitte")
            .expect("mitte");
        assert!((mitte.intensity - 57.0).abs() < 1e-9);
    }
}
