//! Engine configuration: JSON file plus `MATCH_*` environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::demand::signal::is_valid_decay_rate;
use crate::demand::{DemandFieldConfig, MAX_INTENSITY, MIN_INTENSITY};
use crate::error::{CatalogError, ConfigError};
use crate::persistence::DEFAULT_QUEUE_CAPACITY;
use crate::scoring::{WeightPolicy, WeightVector};
use crate::spatial::ZoneResolution;
use crate::zones::ZoneRegistry;

pub const ENV_DECAY_INTERVAL_MS: &str = "MATCH_DECAY_INTERVAL_MS";
pub const ENV_DEFAULT_DECAY_RATE: &str = "MATCH_DEFAULT_DECAY_RATE";
pub const ENV_DEFAULT_INTENSITY: &str = "MATCH_DEFAULT_INTENSITY";
pub const ENV_ZONE_RESOLUTION: &str = "MATCH_ZONE_RESOLUTION";
pub const ENV_REINFORCE_ON_FIND_BEST: &str = "MATCH_REINFORCE_ON_FIND_BEST";
pub const ENV_CATALOG_PATH: &str = "MATCH_CATALOG_PATH";
pub const ENV_PERSISTENCE_PATH: &str = "MATCH_PERSISTENCE_PATH";

/// Where and how demand state is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceSettings {
    pub path: PathBuf,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub demand: DemandFieldConfig,
    /// Initial scoring weights.
    pub weights: WeightVector,
    pub weight_policy: WeightPolicy,
    pub zone_resolution: ZoneResolution,
    /// Deposit a `Request` event whenever `find_best` returns a match.
    pub reinforce_on_find_best: bool,
    /// Run the clock-gated decay tick before every ranking.
    pub evaporate_inline: bool,
    /// Zone catalog JSON; the built-in Berlin catalog when absent.
    pub catalog_path: Option<PathBuf>,
    pub persistence: Option<PersistenceSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            demand: DemandFieldConfig::default(),
            weights: WeightVector::default(),
            weight_policy: WeightPolicy::default(),
            zone_resolution: ZoneResolution::default(),
            reinforce_on_find_best: true,
            evaporate_inline: true,
            catalog_path: None,
            persistence: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults (or `path` when given) with environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MATCH_*` overrides obtained from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DECAY_INTERVAL_MS) {
            self.demand.decay_interval_ms = parse(ENV_DECAY_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_DECAY_RATE) {
            self.demand.default_decay_rate = parse(ENV_DEFAULT_DECAY_RATE, &value)?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_INTENSITY) {
            self.demand.default_initial_intensity = parse(ENV_DEFAULT_INTENSITY, &value)?;
        }
        if let Some(value) = lookup(ENV_ZONE_RESOLUTION) {
            self.zone_resolution = match value.trim().to_ascii_lowercase().as_str() {
                "first_match" | "first" => ZoneResolution::FirstMatch,
                "nearest" => ZoneResolution::Nearest,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: ENV_ZONE_RESOLUTION,
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup(ENV_REINFORCE_ON_FIND_BEST) {
            self.reinforce_on_find_best = parse(ENV_REINFORCE_ON_FIND_BEST, &value)?;
        }
        if let Some(value) = lookup(ENV_CATALOG_PATH) {
            self.catalog_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_PERSISTENCE_PATH) {
            let queue_capacity = self
                .persistence
                .as_ref()
                .map(|p| p.queue_capacity)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY);
            self.persistence = Some(PersistenceSettings {
                path: PathBuf::from(value),
                queue_capacity,
            });
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let demand = &self.demand;
        if demand.decay_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "demand.decay_interval_ms must be positive".to_string(),
            ));
        }
        if !is_valid_decay_rate(demand.default_decay_rate) {
            return Err(ConfigError::Invalid(format!(
                "demand.default_decay_rate must be in (0, 1), got {}",
                demand.default_decay_rate
            )));
        }
        if let Some((zone, rate)) = demand
            .decay_rates
            .iter()
            .find(|(_, rate)| !is_valid_decay_rate(**rate))
        {
            return Err(ConfigError::Invalid(format!(
                "decay rate for zone {zone} must be in (0, 1), got {rate}"
            )));
        }
        let intensity_ok = |v: f64| (MIN_INTENSITY..=MAX_INTENSITY).contains(&v);
        if !intensity_ok(demand.default_initial_intensity) {
            return Err(ConfigError::Invalid(format!(
                "demand.default_initial_intensity must be in [0, 100], got {}",
                demand.default_initial_intensity
            )));
        }
        if let Some((zone, value)) = demand
            .initial_intensity
            .iter()
            .find(|(_, v)| !intensity_ok(**v))
        {
            return Err(ConfigError::Invalid(format!(
                "initial intensity for zone {zone} must be in [0, 100], got {value}"
            )));
        }
        if !self.weights.sum().is_finite() {
            return Err(ConfigError::Invalid("weights must be finite".to_string()));
        }
        if matches!(&self.persistence, Some(p) if p.queue_capacity == 0) {
            return Err(ConfigError::Invalid(
                "persistence.queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured catalog, or the built-in Berlin catalog.
    pub fn load_registry(&self) -> Result<ZoneRegistry, CatalogError> {
        match &self.catalog_path {
            Some(path) => ZoneRegistry::load_json(path),
            None => Ok(ZoneRegistry::berlin()),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}
