//! Demand field: per-zone decaying intensity ("pheromone") state.
//!
//! Every zone owns exactly one [DemandSignal]. Matching events deposit additive,
//! clamped increments; a single global decay tick multiplies every zone by its
//! decay rate at most once per `decay_interval_ms`.
//!
//! All state sits behind one `RwLock`. Deposits, evaporation, reset and restore
//! take the write lock, so the decay gate is checked and applied atomically and a
//! reader never observes a half-applied tick. Nothing in here blocks on I/O.

pub mod signal;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use h3o::Resolution;
use parking_lot::RwLock;

use crate::clock::Clock;
use crate::geo::GeoPoint;
use crate::spatial::GeoIndex;
use crate::zones::{ZoneId, ZoneRegistry};

pub use signal::{
    clamp_intensity, DemandAction, DemandFieldConfig, DemandSignal, ZoneHeat,
    DEFAULT_DECAY_INTERVAL_MS, DEFAULT_DECAY_RATE, DEFAULT_INITIAL_INTENSITY, MAX_INTENSITY,
    MIN_INTENSITY,
};

#[derive(Debug)]
struct DemandState {
    /// One signal per zone, in registry order.
    signals: Vec<DemandSignal>,
    index: HashMap<ZoneId, usize>,
    last_decay_ms: u64,
    /// Bumped on every applied mutation.
    revision: u64,
}

/// Signals captured together with the field revision they were read at.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSnapshot {
    pub revision: u64,
    pub signals: Vec<DemandSignal>,
}

pub struct DemandField {
    geo: GeoIndex,
    config: DemandFieldConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<DemandState>,
}

impl std::fmt::Debug for DemandField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemandField")
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl DemandField {
    /// Create one signal per registry zone, seeded from the config's override table.
    pub fn new(registry: Arc<ZoneRegistry>, config: DemandFieldConfig, clock: Arc<dyn Clock>) -> Self {
        let state = Self::initial_state(&registry, &config, clock.now_ms());
        Self {
            geo: GeoIndex::new(registry),
            config,
            clock,
            state: RwLock::new(state),
        }
    }

    fn initial_state(registry: &ZoneRegistry, config: &DemandFieldConfig, now_ms: u64) -> DemandState {
        let signals = registry
            .zones()
            .iter()
            .map(|zone| DemandSignal {
                zone_id: zone.id.clone(),
                intensity: config.initial_intensity_for(&zone.id),
                decay_rate: config.decay_rate_for(&zone.id),
                last_updated_ms: now_ms,
            })
            .collect::<Vec<_>>();
        let index = signals
            .iter()
            .enumerate()
            .map(|(idx, signal)| (signal.zone_id.clone(), idx))
            .collect();
        DemandState {
            signals,
            index,
            last_decay_ms: now_ms,
            revision: 0,
        }
    }

    pub fn registry(&self) -> &Arc<ZoneRegistry> {
        self.geo.registry()
    }

    pub fn config(&self) -> &DemandFieldConfig {
        &self.config
    }

    /// Restore every zone to its initial intensity and restart the decay interval.
    pub fn reset(&self) {
        let mut fresh = Self::initial_state(self.geo.registry(), &self.config, self.clock.now_ms());
        let mut state = self.state.write();
        fresh.revision = state.revision + 1;
        *state = fresh;
        drop(state);
        tracing::info!(zones = self.geo.registry().len(), "demand field reset");
    }

    /// Apply `action` plus `extra_delta` to a zone, clamped to `[0, 100]`.
    ///
    /// Returns the new intensity, or `None` (no-op) when the zone id is unknown.
    pub fn deposit(&self, zone_id: &str, action: DemandAction, extra_delta: f64) -> Option<f64> {
        let extra = if extra_delta.is_finite() { extra_delta } else { 0.0 };
        let now_ms = self.clock.now_ms();
        let mut state = self.state.write();
        let Some(&idx) = state.index.get(zone_id) else {
            tracing::debug!(zone_id, ?action, "deposit to unknown zone ignored");
            return None;
        };
        state.revision += 1;
        let signal = &mut state.signals[idx];
        let previous = signal.intensity;
        signal.intensity = clamp_intensity(previous + action.increment() + extra);
        signal.last_updated_ms = now_ms;
        tracing::debug!(
            zone_id,
            ?action,
            previous,
            intensity = signal.intensity,
            "demand deposit"
        );
        Some(signal.intensity)
    }

    /// Run one global decay tick if a full interval has passed since the last one.
    ///
    /// Returns `true` when the tick was applied. Concurrent callers inside the same
    /// interval observe a no-op.
    pub fn evaporate(&self, now_ms: u64) -> bool {
        let mut state = self.state.write();
        if now_ms < state.last_decay_ms
            || now_ms - state.last_decay_ms < self.config.decay_interval_ms
        {
            return false;
        }
        for signal in state.signals.iter_mut() {
            signal.intensity = clamp_intensity(signal.intensity * signal.decay_rate);
        }
        let elapsed_ms = now_ms - state.last_decay_ms;
        state.last_decay_ms = now_ms;
        state.revision += 1;
        tracing::info!(
            now_ms,
            elapsed_ms,
            zones = state.signals.len(),
            "demand decay tick applied"
        );
        true
    }

    /// [Self::evaporate] with the injected clock's current time.
    pub fn evaporate_now(&self) -> bool {
        self.evaporate(self.clock.now_ms())
    }

    /// Timestamp of the last applied decay tick (or of initialization).
    pub fn last_decay_ms(&self) -> u64 {
        self.state.read().last_decay_ms
    }

    /// Intensity of the zone whose center is nearest to `point` (radius ignored),
    /// or 0 when the registry is empty.
    pub fn intensity_at(&self, point: &GeoPoint) -> f64 {
        self.geo
            .nearest_zone(point)
            .and_then(|zone| self.intensity_of(&zone.id))
            .unwrap_or(MIN_INTENSITY)
    }

    pub fn intensity_of(&self, zone_id: &str) -> Option<f64> {
        let state = self.state.read();
        state
            .index
            .get(zone_id)
            .map(|&idx| state.signals[idx].intensity)
    }

    /// Copy of every signal in registry order.
    pub fn snapshot(&self) -> Vec<DemandSignal> {
        self.state.read().signals.clone()
    }

    /// [Self::snapshot] stamped with the revision it was read at. Two snapshots
    /// taken by racing writers order correctly by revision.
    pub fn revisioned_snapshot(&self) -> DemandSnapshot {
        let state = self.state.read();
        DemandSnapshot {
            revision: state.revision,
            signals: state.signals.clone(),
        }
    }

    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Signals with `intensity >= threshold`, hottest first.
    pub fn hot_zones(&self, threshold: f64) -> Vec<DemandSignal> {
        let mut hot = self
            .snapshot()
            .into_iter()
            .filter(|signal| signal.intensity >= threshold)
            .collect::<Vec<_>>();
        hot.sort_by(|a, b| {
            b.intensity
                .partial_cmp(&a.intensity)
                .unwrap_or(Ordering::Equal)
        });
        hot
    }

    /// Zone intensities keyed by the H3 cell of each zone center.
    pub fn heatmap(&self, resolution: Resolution) -> Vec<ZoneHeat> {
        let registry = self.geo.registry();
        self.snapshot()
            .into_iter()
            .filter_map(|signal| {
                let cell = registry.zone(&signal.zone_id)?.cell(resolution)?;
                Some(ZoneHeat {
                    zone_id: signal.zone_id,
                    cell,
                    intensity: signal.intensity,
                })
            })
            .collect()
    }

    /// Apply persisted signals. Unknown zones are skipped and intensities clamped;
    /// decay rates stay as configured. Returns the number of zones updated.
    pub fn restore(&self, signals: &[DemandSignal]) -> usize {
        let mut state = self.state.write();
        let mut applied = 0;
        for persisted in signals {
            let Some(&idx) = state.index.get(&persisted.zone_id) else {
                tracing::debug!(zone_id = %persisted.zone_id, "persisted signal for unknown zone skipped");
                continue;
            };
            let signal = &mut state.signals[idx];
            signal.intensity = clamp_intensity(persisted.intensity);
            signal.last_updated_ms = persisted.last_updated_ms;
            applied += 1;
        }
        if applied > 0 {
            state.revision += 1;
        }
        tracing::info!(applied, offered = signals.len(), "demand field restored");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ONE_MIN_MS};
    use crate::zones::{Zone, ZoneKind};

    fn zone(id: &str, lat: f64, lng: f64) -> Zone {
        Zone {
            id: id.to_string(),
            name: id.to_string(),
            city: "test".to_string(),
            center: GeoPoint::new(lat, lng),
            radius_km: 1.0,
            kind: ZoneKind::Mixed,
            landmarks: Vec::new(),
        }
    }

    fn field(config: DemandFieldConfig) -> (DemandField, Arc<ManualClock>) {
        let registry = Arc::new(
            ZoneRegistry::new(vec![
                zone("north", 52.55, 13.40),
                zone("center", 52.52, 13.40),
                zone("south", 52.48, 13.40),
            ])
            .expect("registry"),
        );
        let clock = Arc::new(ManualClock::new(1_000));
        (DemandField::new(registry, config, clock.clone()), clock)
    }

    #[test]
    fn init_uses_overrides_and_default() {
        let (field, _) = field(DemandFieldConfig::default().with_initial_intensity("north", 60.0));
        assert_eq!(field.intensity_of("north"), Some(60.0));
        assert_eq!(field.intensity_of("center"), Some(DEFAULT_INITIAL_INTENSITY));
        assert_eq!(field.intensity_of("nowhere"), None);
        assert_eq!(field.snapshot().len(), 3);
        assert_eq!(field.last_decay_ms(), 1_000);
    }

    #[test]
    fn deposit_applies_action_and_extra_with_clamping() {
        let (field, clock) = field(DemandFieldConfig::default());
        clock.set(2_000);
        assert_eq!(field.deposit("center", DemandAction::Request, 0.0), Some(35.0));
        assert_eq!(field.deposit("center", DemandAction::MatchFailed, 1.5), Some(33.5));
        assert_eq!(field.deposit("center", DemandAction::MatchSuccess, 500.0), Some(100.0));
        assert_eq!(field.deposit("center", DemandAction::Cancel, -500.0), Some(0.0));
        assert_eq!(field.deposit("center", DemandAction::Request, f64::NAN), Some(5.0));

        let signal = field
            .snapshot()
            .into_iter()
            .find(|s| s.zone_id == "center")
            .expect("center signal");
        assert_eq!(signal.last_updated_ms, 2_000);
    }

    #[test]
    fn deposit_to_unknown_zone_is_noop() {
        let (field, _) = field(DemandFieldConfig::default());
        let before = field.snapshot();
        assert_eq!(field.deposit("UNKNOWN_ZONE", DemandAction::Request, 0.0), None);
        assert_eq!(field.snapshot(), before);
    }

    #[test]
    fn evaporation_waits_for_full_interval() {
        let (field, _) = field(DemandFieldConfig::default().with_initial_intensity("north", 60.0));
        assert!(!field.evaporate(1_000 + ONE_MIN_MS - 1));
        assert_eq!(field.intensity_of("north"), Some(60.0));

        assert!(field.evaporate(1_000 + ONE_MIN_MS));
        let after = field.intensity_of("north").expect("north");
        assert!((after - 57.0).abs() < 1e-9, "got {after}");

        // Second call inside the same interval is a no-op.
        assert!(!field.evaporate(1_000 + ONE_MIN_MS + 10));
        assert_eq!(field.intensity_of("north"), Some(after));
        assert_eq!(field.last_decay_ms(), 1_000 + ONE_MIN_MS);
    }

    #[test]
    fn evaporation_ignores_time_going_backwards() {
        let (field, _) = field(DemandFieldConfig::default());
        assert!(!field.evaporate(0));
        assert_eq!(field.last_decay_ms(), 1_000);
    }

    #[test]
    fn per_zone_decay_rates_apply() {
        let config = DemandFieldConfig::default()
            .with_initial_intensity("south", 50.0)
            .with_decay_rate("south", 0.5);
        let (field, clock) = field(config);
        assert!(field.evaporate(clock.advance(ONE_MIN_MS)));
        assert_eq!(field.intensity_of("south"), Some(25.0));
    }

    #[test]
    fn intensity_at_uses_nearest_center_without_radius() {
        let (field, _) = field(DemandFieldConfig::default().with_initial_intensity("south", 70.0));
        // Far south of every radius: nearest center is still "south".
        assert_eq!(field.intensity_at(&GeoPoint::new(51.0, 13.40)), 70.0);

        let empty = DemandField::new(
            Arc::new(ZoneRegistry::default()),
            DemandFieldConfig::default(),
            Arc::new(ManualClock::default()),
        );
        assert_eq!(empty.intensity_at(&GeoPoint::new(51.0, 13.40)), 0.0);
    }

    #[test]
    fn hot_zones_filters_and_sorts_descending() {
        let config = DemandFieldConfig::default()
            .with_initial_intensity("north", 65.0)
            .with_initial_intensity("center", 90.0)
            .with_initial_intensity("south", 10.0);
        let (field, _) = field(config);
        let hot = field
            .hot_zones(65.0)
            .into_iter()
            .map(|s| s.zone_id)
            .collect::<Vec<_>>();
        assert_eq!(hot, vec!["center".to_string(), "north".to_string()]);
    }

    #[test]
    fn reset_restores_initial_state() {
        let (field, clock) = field(DemandFieldConfig::default());
        field.deposit("north", DemandAction::MatchSuccess, 0.0);
        clock.set(9_000);
        field.reset();
        assert_eq!(field.intensity_of("north"), Some(DEFAULT_INITIAL_INTENSITY));
        assert_eq!(field.last_decay_ms(), 9_000);
    }

    #[test]
    fn restore_clamps_and_skips_unknown_zones() {
        let (field, _) = field(DemandFieldConfig::default());
        let persisted = vec![
            DemandSignal {
                zone_id: "north".to_string(),
                intensity: 120.0,
                decay_rate: 0.1,
                last_updated_ms: 77,
            },
            DemandSignal {
                zone_id: "gone".to_string(),
                intensity: 50.0,
                decay_rate: 0.95,
                last_updated_ms: 77,
            },
        ];
        assert_eq!(field.restore(&persisted), 1);
        let north = field
            .snapshot()
            .into_iter()
            .find(|s| s.zone_id == "north")
            .expect("north");
        assert_eq!(north.intensity, 100.0);
        assert_eq!(north.decay_rate, DEFAULT_DECAY_RATE);
        assert_eq!(north.last_updated_ms, 77);
    }

    #[test]
    fn heatmap_has_one_cell_per_zone() {
        let (field, _) = field(DemandFieldConfig::default());
        let heat = field.heatmap(Resolution::Seven);
        assert_eq!(heat.len(), 3);
        assert!(heat.iter().all(|h| h.cell.resolution() == Resolution::Seven));
    }

    #[test]
    fn revision_tracks_applied_mutations_only() {
        let (field, clock) = field(DemandFieldConfig::default());
        assert_eq!(field.revision(), 0);

        field.deposit("north", DemandAction::Request, 0.0);
        assert_eq!(field.revision(), 1);
        field.deposit("nowhere", DemandAction::Request, 0.0);
        assert!(!field.evaporate(clock.now_ms()));
        assert_eq!(field.revision(), 1);

        assert!(field.evaporate(clock.advance(ONE_MIN_MS)));
        field.reset();
        let snapshot = field.revisioned_snapshot();
        assert_eq!(snapshot.revision, 3);
        assert_eq!(snapshot.signals, field.snapshot());
    }
}
