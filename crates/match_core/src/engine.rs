//! Engine assembly: builds the selector and its persistence side channel from an
//! [EngineConfig].

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::matching::MatchSelector;
use crate::persistence::{
    persistence_channel, restore_demand, JsonFileStore, PersistenceChannel, PersistenceWorker,
};

pub struct Engine {
    pub selector: Arc<MatchSelector>,
    store: Option<Arc<dyn PersistenceChannel>>,
    /// Taken by [Engine::spawn_persistence]; the store stays for later restores.
    worker: Option<PersistenceWorker>,
}

impl Engine {
    pub fn store(&self) -> Option<&Arc<dyn PersistenceChannel>> {
        self.store.as_ref()
    }

    /// Load persisted demand state into the field. Failures fall back to defaults.
    pub async fn restore(&self) -> usize {
        match &self.store {
            Some(store) => restore_demand(store.as_ref(), self.selector.demand()).await,
            None => 0,
        }
    }

    /// Spawn the persistence worker on the current tokio runtime. Returns `None`
    /// without persistence or when the worker is already running.
    pub fn spawn_persistence(&mut self) -> Option<JoinHandle<usize>> {
        let worker = self.worker.take()?;
        let store = self.store.clone()?;
        Some(tokio::spawn(worker.run(store)))
    }
}

/// Build an [Engine] from `config` with the host-supplied clock.
pub fn build_engine(config: &EngineConfig, clock: Arc<dyn Clock>) -> Result<Engine> {
    config.validate()?;
    let registry = Arc::new(config.load_registry()?);

    let builder = MatchSelector::builder(registry.clone())
        .demand_config(config.demand.clone())
        .weights(config.weights)
        .weight_policy(config.weight_policy)
        .zone_resolution(config.zone_resolution)
        .reinforce_on_find_best(config.reinforce_on_find_best)
        .evaporate_inline(config.evaporate_inline)
        .clock(clock);

    let (builder, store, worker) = match &config.persistence {
        Some(settings) => {
            let (sync, worker) = persistence_channel(settings.queue_capacity);
            let store: Arc<dyn PersistenceChannel> = Arc::new(JsonFileStore::new(&settings.path));
            (builder.persistence(sync), Some(store), Some(worker))
        }
        None => (builder, None, None),
    };

    tracing::info!(
        zones = registry.len(),
        persistence = store.is_some(),
        resolution = ?config.zone_resolution,
        "match engine built"
    );

    Ok(Engine {
        selector: Arc::new(builder.build()),
        store,
        worker,
    })
}
