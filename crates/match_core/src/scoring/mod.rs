//! Multi-criteria candidate scoring.
//!
//! [score] is a pure function of a candidate, the request context, the zone's demand
//! intensity and a [WeightVector]. Each criterion is normalized to roughly `[0, 1]`
//! (higher is better) before weighting, and the weighted sum is scaled by 100.

pub mod weights;

use serde::{Deserialize, Serialize};

use crate::demand::clamp_intensity;
use crate::matching::types::{Candidate, RequestContext};

pub use weights::{WeightPolicy, WeightStore, WeightUpdate, WeightVector, WEIGHT_SUM_TOLERANCE};

/// Average pickup speed used for ETA estimation (km/h).
pub const AVG_PICKUP_SPEED_KMH: f64 = 30.0;

pub const DEFAULT_RATING: f64 = 4.0;
pub const DEFAULT_ACCEPTANCE_RATE: f64 = 0.85;

/// Base earnings of a trip before the per-km component.
pub const BASE_EARNINGS: f64 = 2.5;
pub const EARNINGS_PER_KM: f64 = 0.8;
/// Earnings at which the earnings criterion saturates.
pub const EARNINGS_CAP: f64 = 20.0;

/// Surge multiplier for a zone's demand intensity.
pub fn surge_multiplier(pheromone: f64) -> f64 {
    if pheromone >= 80.0 {
        1.8
    } else if pheromone >= 60.0 {
        1.5
    } else if pheromone >= 30.0 {
        1.2
    } else {
        1.0
    }
}

pub fn eta_minutes(distance_km: f64) -> f64 {
    distance_km / AVG_PICKUP_SPEED_KMH * 60.0
}

pub fn earnings_potential(distance_km: f64, surge: f64) -> f64 {
    (BASE_EARNINGS + distance_km * EARNINGS_PER_KM) * surge
}

/// Criteria after normalization, before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCriteria {
    pub distance: f64,
    pub eta: f64,
    pub rating: f64,
    pub acceptance: f64,
    pub pheromone: f64,
    pub surge: f64,
    pub earnings: f64,
}

impl NormalizedCriteria {
    pub fn weighted_sum(&self, weights: &WeightVector) -> f64 {
        weights.distance * self.distance
            + weights.eta * self.eta
            + weights.rating * self.rating
            + weights.acceptance * self.acceptance
            + weights.pheromone * self.pheromone
            + weights.surge * self.surge
            + weights.earnings * self.earnings
    }
}

/// Raw and normalized value of every criterion for one pairing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub rating: f64,
    pub acceptance_rate: f64,
    pub pheromone: f64,
    pub surge_multiplier: f64,
    pub earnings_potential: f64,
    pub normalized: NormalizedCriteria,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total: f64,
    pub breakdown: ScoreBreakdown,
}

/// Score one candidate for a request. `None` when the candidate has no location.
pub fn score(
    candidate: &Candidate,
    context: &RequestContext,
    demand_intensity: f64,
    weights: &WeightVector,
) -> Option<ScoreResult> {
    let location = candidate.location?;
    let distance_km = location.distance_km(&context.location);
    let eta_minutes = eta_minutes(distance_km);
    let rating = candidate.rating_or_default();
    let acceptance_rate = candidate.acceptance_rate_or_default();
    let pheromone = clamp_intensity(demand_intensity);
    let surge = surge_multiplier(pheromone);
    let earnings = earnings_potential(distance_km, surge);

    let normalized = NormalizedCriteria {
        distance: 1.0 / (1.0 + distance_km),
        eta: 1.0 / (1.0 + eta_minutes / 10.0),
        rating: rating / 5.0,
        acceptance: acceptance_rate,
        pheromone: pheromone / 100.0,
        surge: surge - 1.0,
        earnings: (earnings / EARNINGS_CAP).min(1.0),
    };

    Some(ScoreResult {
        total: 100.0 * normalized.weighted_sum(weights),
        breakdown: ScoreBreakdown {
            distance_km,
            eta_minutes,
            rating,
            acceptance_rate,
            pheromone,
            surge_multiplier: surge,
            earnings_potential: earnings,
            normalized,
        },
    })
}
