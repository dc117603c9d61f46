use serde::{Deserialize, Serialize};

use crate::demand::DemandAction;
use crate::geo::GeoPoint;
use crate::scoring::{ScoreBreakdown, DEFAULT_ACCEPTANCE_RATE, DEFAULT_RATING};
use crate::zones::ZoneId;

/// Driver snapshot supplied by the caller. Read-only inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub location: Option<GeoPoint>,
    pub rating: Option<f64>,
    pub acceptance_rate: Option<f64>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: id.into(),
            location: Some(location),
            rating: None,
            acceptance_rate: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_acceptance_rate(mut self, acceptance_rate: f64) -> Self {
        self.acceptance_rate = Some(acceptance_rate);
        self
    }

    pub fn rating_or_default(&self) -> f64 {
        self.rating.unwrap_or(DEFAULT_RATING)
    }

    pub fn acceptance_rate_or_default(&self) -> f64 {
        self.acceptance_rate.unwrap_or(DEFAULT_ACCEPTANCE_RATE)
    }
}

/// Passenger location plus the zone resolved for it when the request was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub location: GeoPoint,
    pub zone_id: Option<ZoneId>,
}

impl RequestContext {
    pub fn new(location: GeoPoint, zone_id: Option<ZoneId>) -> Self {
        Self { location, zone_id }
    }
}

/// A scored candidate. Keep `zone_id` around for [crate::matching::MatchSelector::record_outcome].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Zone resolved at scoring time; outcomes are credited here.
    pub zone_id: Option<ZoneId>,
}

/// Result of a match, as reported back by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Accepted,
    Completed,
    Rejected,
    Timeout,
    Cancelled,
}

impl MatchOutcome {
    pub fn demand_action(self) -> DemandAction {
        match self {
            MatchOutcome::Accepted | MatchOutcome::Completed => DemandAction::MatchSuccess,
            MatchOutcome::Rejected | MatchOutcome::Timeout => DemandAction::MatchFailed,
            MatchOutcome::Cancelled => DemandAction::Cancel,
        }
    }
}

/// Point-in-time source of candidate drivers for a pickup location.
pub trait CandidateProvider: Send + Sync {
    fn candidates_near(&self, location: &GeoPoint) -> Vec<Candidate>;
}

/// Fixed candidate list, returned regardless of location.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates(pub Vec<Candidate>);

impl CandidateProvider for StaticCandidates {
    fn candidates_near(&self, _location: &GeoPoint) -> Vec<Candidate> {
        self.0.clone()
    }
}
