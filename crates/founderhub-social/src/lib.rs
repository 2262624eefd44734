pub mod config;
pub mod content;
pub mod counters;
pub mod error;
pub mod events;
pub mod feed;
pub mod reconcile;
pub mod store;
pub mod toggle;
pub mod trending;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use founderhub_db::Database;

pub use config::{EngineConfig, RetryPolicy};
pub use content::ContentService;
pub use counters::CounterSynchronizer;
pub use error::{SocialError, SocialResult};
pub use events::EventLog;
pub use feed::{FeedReader, Pagination};
pub use reconcile::{DriftLedger, Reconciler};
pub use store::SocialStore;
pub use toggle::ToggleService;
pub use trending::TrendingAggregator;

/// All engine services wired to one database. Cheap to clone.
#[derive(Clone)]
pub struct SocialEngine {
    pub db: Arc<Database>,
    pub config: EngineConfig,
    pub counters: CounterSynchronizer<Database>,
    pub toggles: ToggleService<Database>,
    pub content: ContentService<Database>,
    pub feed: FeedReader<Database>,
    pub trending: TrendingAggregator,
    pub reconciler: Reconciler<Database>,
    pub events: EventLog,
}

impl SocialEngine {
    /// Build the engine and spawn the counter retry worker. Must be called
    /// inside a tokio runtime.
    pub fn start(db: Arc<Database>, config: EngineConfig) -> Self {
        let ledger = DriftLedger::default();
        let (counters, worker) =
            CounterSynchronizer::new(Arc::clone(&db), config.retry, ledger.clone());
        tokio::spawn(worker.run());

        let engine = Self {
            toggles: ToggleService::new(Arc::clone(&db), counters.clone()),
            content: ContentService::new(Arc::clone(&db), counters.clone()),
            feed: FeedReader::new(
                Arc::clone(&db),
                counters.clone(),
                config.default_page_size,
                config.max_page_size,
            ),
            trending: TrendingAggregator::new(
                Arc::clone(&db),
                config.trending_window_days,
                config.trending_limit,
            ),
            reconciler: Reconciler::new(Arc::clone(&db), ledger),
            events: EventLog::new(Arc::clone(&db)),
            counters,
            config,
            db,
        };

        info!("Social engine started");
        engine
    }

    /// Spawn the periodic reconciliation pass.
    pub fn spawn_reconcile_loop(&self) -> JoinHandle<()> {
        let reconciler = self.reconciler.clone();
        let every = self.config.reconcile_interval;
        tokio::spawn(reconcile::run_reconcile_loop(reconciler, every))
    }
}
