//! Candidate ranking and outcome feedback.
//!
//! A request flows through [MatchSelector]: the pickup location is resolved to a
//! zone, the zone's demand intensity is read once, every candidate is scored, and
//! the ranking is returned. Outcomes reported later are deposited back into the
//! demand field at the zone captured on the [ScoredCandidate].

pub mod selector;
pub mod types;

pub use selector::{MatchSelector, MatchSelectorBuilder};
pub use types::{
    Candidate, CandidateProvider, MatchOutcome, RequestContext, ScoredCandidate, StaticCandidates,
};
