use std::collections::HashMap;

use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::clock::ONE_MIN_MS;
use crate::zones::ZoneId;

pub const MIN_INTENSITY: f64 = 0.0;
pub const MAX_INTENSITY: f64 = 100.0;
pub const DEFAULT_INITIAL_INTENSITY: f64 = 30.0;
pub const DEFAULT_DECAY_RATE: f64 = 0.95;
pub const DEFAULT_DECAY_INTERVAL_MS: u64 = ONE_MIN_MS;

/// Clamp into `[MIN_INTENSITY, MAX_INTENSITY]`; NaN collapses to the floor.
pub fn clamp_intensity(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_INTENSITY;
    }
    value.clamp(MIN_INTENSITY, MAX_INTENSITY)
}

/// Matching event that reinforces (or weakens) a zone's demand signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandAction {
    Request,
    MatchSuccess,
    MatchFailed,
    Cancel,
}

impl DemandAction {
    /// Base intensity increment applied by a deposit.
    pub fn increment(self) -> f64 {
        match self {
            DemandAction::Request => 5.0,
            DemandAction::MatchSuccess => 10.0,
            DemandAction::MatchFailed => -3.0,
            DemandAction::Cancel => -2.0,
        }
    }
}

/// Decaying demand indicator for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSignal {
    pub zone_id: ZoneId,
    pub intensity: f64,
    pub decay_rate: f64,
    pub last_updated_ms: u64,
}

/// A zone's intensity keyed by the H3 cell of its center.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneHeat {
    pub zone_id: ZoneId,
    pub cell: CellIndex,
    pub intensity: f64,
}

/// Demand field tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandFieldConfig {
    /// Minimum time between two global decay ticks.
    pub decay_interval_ms: u64,
    /// Decay rate for zones without an entry in `decay_rates`.
    pub default_decay_rate: f64,
    /// Starting intensity for zones without an entry in `initial_intensity`.
    pub default_initial_intensity: f64,
    pub initial_intensity: HashMap<ZoneId, f64>,
    pub decay_rates: HashMap<ZoneId, f64>,
}

impl Default for DemandFieldConfig {
    fn default() -> Self {
        Self {
            decay_interval_ms: DEFAULT_DECAY_INTERVAL_MS,
            default_decay_rate: DEFAULT_DECAY_RATE,
            default_initial_intensity: DEFAULT_INITIAL_INTENSITY,
            initial_intensity: HashMap::new(),
            decay_rates: HashMap::new(),
        }
    }
}

impl DemandFieldConfig {
    pub fn with_initial_intensity(mut self, zone_id: impl Into<ZoneId>, intensity: f64) -> Self {
        self.initial_intensity.insert(zone_id.into(), intensity);
        self
    }

    pub fn with_decay_rate(mut self, zone_id: impl Into<ZoneId>, rate: f64) -> Self {
        self.decay_rates.insert(zone_id.into(), rate);
        self
    }

    pub fn with_decay_interval_ms(mut self, interval_ms: u64) -> Self {
        self.decay_interval_ms = interval_ms;
        self
    }

    pub(crate) fn initial_intensity_for(&self, zone_id: &str) -> f64 {
        clamp_intensity(
            self.initial_intensity
                .get(zone_id)
                .copied()
                .unwrap_or(self.default_initial_intensity),
        )
    }

    pub(crate) fn decay_rate_for(&self, zone_id: &str) -> f64 {
        let fallback = if is_valid_decay_rate(self.default_decay_rate) {
            self.default_decay_rate
        } else {
            DEFAULT_DECAY_RATE
        };
        match self.decay_rates.get(zone_id).copied() {
            Some(rate) if is_valid_decay_rate(rate) => rate,
            Some(rate) => {
                tracing::warn!(zone_id, rate, fallback, "decay rate outside (0, 1), using default");
                fallback
            }
            None => fallback,
        }
    }
}

pub fn is_valid_decay_rate(rate: f64) -> bool {
    rate > 0.0 && rate < 1.0
}
