//! Runtime-tunable scoring weights.
//!
//! Weights are an operational knob and are not required to sum to 1.0. The only
//! checks happen at the [WeightStore::set_weights] boundary, governed by
//! [WeightPolicy]; the scoring function itself never validates.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Sum deviation from 1.0 above which [WeightPolicy::Warn] logs.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.25;

/// One weight per scoring criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightVector {
    pub distance: f64,
    pub eta: f64,
    pub rating: f64,
    pub acceptance: f64,
    pub pheromone: f64,
    pub surge: f64,
    pub earnings: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            distance: 0.25,
            eta: 0.20,
            rating: 0.15,
            acceptance: 0.10,
            pheromone: 0.15,
            surge: 0.05,
            earnings: 0.10,
        }
    }
}

impl WeightVector {
    pub fn sum(&self) -> f64 {
        self.distance
            + self.eta
            + self.rating
            + self.acceptance
            + self.pheromone
            + self.surge
            + self.earnings
    }

    /// Scale every weight so the vector sums to 1.0. A non-positive sum is returned unchanged.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        if !(sum.is_finite() && sum > 0.0) {
            return *self;
        }
        Self {
            distance: self.distance / sum,
            eta: self.eta / sum,
            rating: self.rating / sum,
            acceptance: self.acceptance / sum,
            pheromone: self.pheromone / sum,
            surge: self.surge / sum,
            earnings: self.earnings / sum,
        }
    }

    /// Overlay the fields present in `update`. Non-finite values are skipped.
    pub fn merged(&self, update: &WeightUpdate) -> Self {
        fn pick(current: f64, name: &str, new: Option<f64>) -> f64 {
            match new {
                Some(value) if value.is_finite() => value,
                Some(value) => {
                    tracing::warn!(weight = name, value, "ignoring non-finite weight");
                    current
                }
                None => current,
            }
        }
        Self {
            distance: pick(self.distance, "distance", update.distance),
            eta: pick(self.eta, "eta", update.eta),
            rating: pick(self.rating, "rating", update.rating),
            acceptance: pick(self.acceptance, "acceptance", update.acceptance),
            pheromone: pick(self.pheromone, "pheromone", update.pheromone),
            surge: pick(self.surge, "surge", update.surge),
            earnings: pick(self.earnings, "earnings", update.earnings),
        }
    }
}

/// Partial weight update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightUpdate {
    pub distance: Option<f64>,
    pub eta: Option<f64>,
    pub rating: Option<f64>,
    pub acceptance: Option<f64>,
    pub pheromone: Option<f64>,
    pub surge: Option<f64>,
    pub earnings: Option<f64>,
}

impl From<WeightVector> for WeightUpdate {
    fn from(w: WeightVector) -> Self {
        Self {
            distance: Some(w.distance),
            eta: Some(w.eta),
            rating: Some(w.rating),
            acceptance: Some(w.acceptance),
            pheromone: Some(w.pheromone),
            surge: Some(w.surge),
            earnings: Some(w.earnings),
        }
    }
}

/// What [WeightStore::set_weights] does with a vector whose sum strays from 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    Accept,
    #[default]
    Warn,
    Normalize,
}

/// Process-wide weight vector shared by every matching call.
#[derive(Debug, Default)]
pub struct WeightStore {
    current: RwLock<WeightVector>,
    policy: WeightPolicy,
}

impl WeightStore {
    pub fn new(initial: WeightVector, policy: WeightPolicy) -> Self {
        Self {
            current: RwLock::new(Self::apply_policy(initial, policy)),
            policy,
        }
    }

    pub fn policy(&self) -> WeightPolicy {
        self.policy
    }

    pub fn get(&self) -> WeightVector {
        *self.current.read()
    }

    /// Merge a partial update over the current weights and return the stored result.
    pub fn set_weights(&self, update: &WeightUpdate) -> WeightVector {
        let mut current = self.current.write();
        let merged = Self::apply_policy(current.merged(update), self.policy);
        *current = merged;
        tracing::info!(?merged, sum = merged.sum(), "scoring weights updated");
        merged
    }

    /// Replace every weight at once.
    pub fn replace(&self, weights: WeightVector) -> WeightVector {
        self.set_weights(&WeightUpdate::from(weights))
    }

    fn apply_policy(weights: WeightVector, policy: WeightPolicy) -> WeightVector {
        let sum = weights.sum();
        let deviates = (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE;
        match policy {
            WeightPolicy::Accept => weights,
            WeightPolicy::Warn => {
                if deviates {
                    tracing::warn!(sum, "scoring weights deviate from a unit sum");
                }
                weights
            }
            WeightPolicy::Normalize => weights.normalized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sum_to_one() {
        assert!((WeightVector::default().sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn partial_update_merges_over_current() {
        let store = WeightStore::new(WeightVector::default(), WeightPolicy::Accept);
        let applied = store.set_weights(&WeightUpdate {
            distance: Some(0.9),
            surge: Some(f64::NAN),
            ..Default::default()
        });
        assert_eq!(applied.distance, 0.9);
        assert_eq!(applied.surge, WeightVector::default().surge);
        assert_eq!(applied.eta, WeightVector::default().eta);
        assert_eq!(store.get(), applied);
        // Sum is no longer 1.0 and that is accepted.
        assert!(store.get().sum() > 1.5);
    }

    #[test]
    fn normalize_policy_rescales_to_unit_sum() {
        let store = WeightStore::new(WeightVector::default(), WeightPolicy::Normalize);
        let applied = store.set_weights(&WeightUpdate {
            distance: Some(2.0),
            ..Default::default()
        });
        assert!((applied.sum() - 1.0).abs() < 1e-12);
        assert!(applied.distance > applied.eta);
    }

    #[test]
    fn normalizing_zero_vector_is_identity() {
        let zero = WeightVector {
            distance: 0.0,
            eta: 0.0,
            rating: 0.0,
            acceptance: 0.0,
            pheromone: 0.0,
            surge: 0.0,
            earnings: 0.0,
        };
        assert_eq!(zero.normalized(), zero);
    }

    #[test]
    fn update_deserializes_from_partial_json() {
        let update: WeightUpdate = serde_json::from_str(r#"{"eta": 0.4}"#).expect("json");
        assert_eq!(update.eta, Some(0.4));
        assert_eq!(update.distance, None);
    }
}
