use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::demand::{DemandAction, DemandField, DemandFieldConfig, DemandSignal};
use crate::geo::GeoPoint;
use crate::persistence::PersistenceSync;
use crate::scoring::{score, WeightPolicy, WeightStore, WeightUpdate, WeightVector};
use crate::spatial::{GeoIndex, ZoneResolution};
use crate::zones::ZoneRegistry;

use super::types::{Candidate, CandidateProvider, MatchOutcome, RequestContext, ScoredCandidate};

/// Ranks candidates for a ride request and feeds outcomes back into the demand field.
///
/// A selector is cheap to share: the registry, demand field and weights are held
/// behind `Arc`s, and every method takes `&self`.
pub struct MatchSelector {
    geo: GeoIndex,
    demand: Arc<DemandField>,
    weights: Arc<WeightStore>,
    clock: Arc<dyn Clock>,
    reinforce_on_find_best: bool,
    evaporate_inline: bool,
    persistence: Option<PersistenceSync>,
}

impl MatchSelector {
    pub fn builder(registry: Arc<ZoneRegistry>) -> MatchSelectorBuilder {
        MatchSelectorBuilder::new(registry)
    }

    pub fn demand(&self) -> &Arc<DemandField> {
        &self.demand
    }

    pub fn weight_store(&self) -> &Arc<WeightStore> {
        &self.weights
    }

    pub fn geo_index(&self) -> &GeoIndex {
        &self.geo
    }

    /// Resolve the passenger's zone once and capture it.
    pub fn request_context(&self, location: GeoPoint) -> RequestContext {
        let zone_id = self.geo.resolve_zone(&location).map(|zone| zone.id.clone());
        RequestContext::new(location, zone_id)
    }

    /// Best candidate for a pickup at `location`, or `None` when no candidate has a
    /// location. Deposits a `Request` at the resolved zone when reinforcement on
    /// lookup is enabled.
    pub fn find_best(&self, location: GeoPoint, candidates: &[Candidate]) -> Option<ScoredCandidate> {
        let ranked = self.rank(location, candidates);
        let best = ranked.into_iter().next()?;
        tracing::debug!(
            candidate = %best.candidate.id,
            score = best.score,
            zone_id = ?best.zone_id,
            "best candidate selected"
        );
        if self.reinforce_on_find_best {
            self.reinforce_request(&best);
        }
        Some(best)
    }

    /// [Self::find_best] with candidates pulled from `provider`.
    pub fn find_best_from(
        &self,
        provider: &dyn CandidateProvider,
        location: GeoPoint,
    ) -> Option<ScoredCandidate> {
        let candidates = provider.candidates_near(&location);
        self.find_best(location, &candidates)
    }

    /// The `k` highest-scoring candidates, best first. Never touches the demand field
    /// beyond the clock-gated decay tick.
    pub fn find_top_k(&self, location: GeoPoint, candidates: &[Candidate], k: usize) -> Vec<ScoredCandidate> {
        let mut ranked = self.rank(location, candidates);
        ranked.truncate(k);
        ranked
    }

    /// Deposit a `Request` event at the zone captured when `scored` was produced.
    pub fn reinforce_request(&self, scored: &ScoredCandidate) -> Option<f64> {
        self.deposit_at(scored, DemandAction::Request)
    }

    /// Credit a match outcome to the zone captured at scoring time.
    pub fn record_outcome(&self, scored: &ScoredCandidate, outcome: MatchOutcome) -> Option<f64> {
        tracing::debug!(candidate = %scored.candidate.id, ?outcome, "recording match outcome");
        self.deposit_at(scored, outcome.demand_action())
    }

    pub fn snapshot(&self) -> Vec<DemandSignal> {
        self.demand.snapshot()
    }

    pub fn hot_zones(&self, threshold: f64) -> Vec<DemandSignal> {
        self.demand.hot_zones(threshold)
    }

    pub fn weights(&self) -> WeightVector {
        self.weights.get()
    }

    pub fn set_weights(&self, update: &WeightUpdate) -> WeightVector {
        self.weights.set_weights(update)
    }

    pub fn replace_weights(&self, weights: WeightVector) -> WeightVector {
        self.weights.replace(weights)
    }

    fn deposit_at(&self, scored: &ScoredCandidate, action: DemandAction) -> Option<f64> {
        let zone_id = scored.zone_id.as_deref()?;
        let intensity = self.demand.deposit(zone_id, action, 0.0)?;
        self.publish();
        Some(intensity)
    }

    fn publish(&self) {
        if let Some(sync) = &self.persistence {
            sync.publish(self.demand.revisioned_snapshot());
        }
    }

    /// Score every candidate with a valid location and a finite score, sorted by
    /// descending score (ties by id).
    fn rank(&self, location: GeoPoint, candidates: &[Candidate]) -> Vec<ScoredCandidate> {
        if self.evaporate_inline && self.demand.evaporate(self.clock.now_ms()) {
            self.publish();
        }

        let context = self.request_context(location);
        let intensity = context
            .zone_id
            .as_deref()
            .and_then(|zone_id| self.demand.intensity_of(zone_id))
            .unwrap_or_else(|| self.demand.intensity_at(&context.location));
        let weights = self.weights.get();

        let mut ranked = candidates
            .iter()
            .filter(|candidate| candidate.location.as_ref().is_some_and(GeoPoint::is_valid))
            .filter_map(|candidate| {
                let result = score(candidate, &context, intensity, &weights)?;
                if !result.total.is_finite() {
                    tracing::debug!(candidate = %candidate.id, "non-finite score, candidate skipped");
                    return None;
                }
                Some(ScoredCandidate {
                    candidate: candidate.clone(),
                    score: result.total,
                    breakdown: result.breakdown,
                    zone_id: context.zone_id.clone(),
                })
            })
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        });
        tracing::trace!(
            offered = candidates.len(),
            scored = ranked.len(),
            intensity,
            zone_id = ?context.zone_id,
            "candidates ranked"
        );
        ranked
    }
}

/// Builder wiring the registry, demand field, weights and clock into a [MatchSelector].
pub struct MatchSelectorBuilder {
    registry: Arc<ZoneRegistry>,
    demand_config: DemandFieldConfig,
    demand: Option<Arc<DemandField>>,
    weights: WeightVector,
    weight_policy: WeightPolicy,
    weight_store: Option<Arc<WeightStore>>,
    resolution: ZoneResolution,
    clock: Arc<dyn Clock>,
    reinforce_on_find_best: bool,
    evaporate_inline: bool,
    persistence: Option<PersistenceSync>,
}

impl MatchSelectorBuilder {
    pub fn new(registry: Arc<ZoneRegistry>) -> Self {
        Self {
            registry,
            demand_config: DemandFieldConfig::default(),
            demand: None,
            weights: WeightVector::default(),
            weight_policy: WeightPolicy::default(),
            weight_store: None,
            resolution: ZoneResolution::default(),
            clock: Arc::new(SystemClock),
            reinforce_on_find_best: true,
            evaporate_inline: true,
            persistence: None,
        }
    }

    pub fn demand_config(mut self, config: DemandFieldConfig) -> Self {
        self.demand_config = config;
        self
    }

    /// Share an existing demand field instead of creating one.
    pub fn demand_field(mut self, demand: Arc<DemandField>) -> Self {
        self.demand = Some(demand);
        self
    }

    pub fn weights(mut self, weights: WeightVector) -> Self {
        self.weights = weights;
        self
    }

    pub fn weight_policy(mut self, policy: WeightPolicy) -> Self {
        self.weight_policy = policy;
        self
    }

    /// Share an existing weight store instead of creating one.
    pub fn weight_store(mut self, store: Arc<WeightStore>) -> Self {
        self.weight_store = Some(store);
        self
    }

    pub fn zone_resolution(mut self, resolution: ZoneResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn reinforce_on_find_best(mut self, enabled: bool) -> Self {
        self.reinforce_on_find_best = enabled;
        self
    }

    /// Run the clock-gated decay tick before every ranking (default on). Turn off
    /// when the host drives evaporation from its own periodic task.
    pub fn evaporate_inline(mut self, enabled: bool) -> Self {
        self.evaporate_inline = enabled;
        self
    }

    pub fn persistence(mut self, sync: PersistenceSync) -> Self {
        self.persistence = Some(sync);
        self
    }

    /// Assemble the selector. A shared demand field built over a different catalog
    /// wins: zones are resolved against the field's registry so that deposits land.
    pub fn build(self) -> MatchSelector {
        let (registry, demand) = match self.demand {
            Some(demand) => {
                let field_registry = demand.registry().clone();
                if !Arc::ptr_eq(&field_registry, &self.registry)
                    && !field_registry.ids().eq(self.registry.ids())
                {
                    tracing::warn!(
                        builder_zones = self.registry.len(),
                        field_zones = field_registry.len(),
                        "shared demand field uses a different zone catalog, resolving against the field's"
                    );
                }
                (field_registry, demand)
            }
            None => {
                let demand = Arc::new(DemandField::new(
                    self.registry.clone(),
                    self.demand_config,
                    self.clock.clone(),
                ));
                (self.registry, demand)
            }
        };
        let weights = self
            .weight_store
            .unwrap_or_else(|| Arc::new(WeightStore::new(self.weights, self.weight_policy)));
        MatchSelector {
            geo: GeoIndex::with_resolution(registry, self.resolution),
            demand,
            weights,
            clock: self.clock,
            reinforce_on_find_best: self.reinforce_on_find_best,
            evaporate_inline: self.evaporate_inline,
            persistence: self.persistence,
        }
    }
}
