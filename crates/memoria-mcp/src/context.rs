//! The explicit, `Arc`-shared bundle of services every tool handler
//! receives, in place of a process-global registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use memoria_core::{
    build_provider, AlertMonitor, Config, EmbeddingCache, EmbeddingProvider, ForgettingEngine,
    HybridRanker, QueryCache, ReviewScheduler, Store, TaskQueue,
};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<Store>,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub ranker: Arc<HybridRanker>,
    pub forgetting: Arc<ForgettingEngine>,
    pub review: Arc<ReviewScheduler>,
    pub task_queue: Arc<TaskQueue>,
    pub alerts: Arc<AlertMonitor>,
    pub query_cache: Arc<QueryCache<serde_json::Value>>,
    pub embedding_cache: Arc<EmbeddingCache>,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(config: Config) -> memoria_core::CoreResult<Self> {
        let store = Arc::new(Store::open(config.db_path.clone(), config.busy_timeout.as_millis() as u64)?);

        let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::from(build_provider(
            config.embedding_provider,
            config.embedding_api_url.clone(),
            config.embedding_api_key.clone(),
            config.embedding_dimensions,
        ));

        Ok(Self {
            store,
            embedding_provider,
            ranker: Arc::new(HybridRanker::default()),
            forgetting: Arc::new(ForgettingEngine::new(
                Default::default(),
                Default::default(),
                config.forget_ttl,
            )),
            review: Arc::new(ReviewScheduler::default()),
            task_queue: Arc::new(TaskQueue::new(config.task_queue_workers)),
            alerts: Arc::new(AlertMonitor::default()),
            query_cache: Arc::new(QueryCache::new(256, Duration::from_secs(60))),
            embedding_cache: Arc::new(EmbeddingCache::new(512, Duration::from_secs(3600))),
            started_at: Instant::now(),
            config,
        })
    }

    /// For tests and embedded use: an in-memory store with no embedding backend.
    pub fn in_memory_for_tests() -> Self {
        let config = Config::default();
        let store = Arc::new(Store::open_in_memory().expect("open in-memory store"));
        let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::from(build_provider(
            memoria_core::ProviderKind::Lexical,
            None,
            None,
            None,
        ));
        Self {
            store,
            embedding_provider,
            ranker: Arc::new(HybridRanker::default()),
            forgetting: Arc::new(ForgettingEngine::default()),
            review: Arc::new(ReviewScheduler::default()),
            task_queue: Arc::new(TaskQueue::new(2)),
            alerts: Arc::new(AlertMonitor::default()),
            query_cache: Arc::new(QueryCache::new(64, Duration::from_secs(60))),
            embedding_cache: Arc::new(EmbeddingCache::new(64, Duration::from_secs(60))),
            started_at: Instant::now(),
            config,
        }
    }
}
