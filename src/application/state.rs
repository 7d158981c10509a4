// src/application/state.rs
//
// Wiring of the whole core: one pool, one event journal, every service.
// Embedding binaries (scheduler, CLI, web) hold a HotspotCore and call into its services.

use std::sync::Arc;

use crate::config::HotspotConfig;
use crate::db::{
    create_connection_pool, get_connection, get_database_stats, initialize_database,
    verify_database_integrity, ConnectionPool, DatabaseStats,
};
use crate::domain::NewsItem;
use crate::error::AppResult;
use crate::events::EventBus;
use crate::repositories::{
    CrawlRecordRepository, NewsItemRepository, PlatformRepository, PushRecordRepository,
    RankHistoryRepository, SqliteCrawlRecordRepository, SqliteNewsItemRepository,
    SqlitePlatformRepository, SqlitePushRecordRepository, SqliteRankHistoryRepository,
};
use crate::services::{
    CrawlCycleService, CrawlTracker, IdentityResolver, ItemStore, PlatformRegistry, PushEngine,
    PushPolicy, RankHistoryLedger,
};

/// All fields are Arc-wrapped for thread-safe sharing across callers.
pub struct HotspotCore {
    pub pool: Arc<ConnectionPool>,
    pub event_bus: Arc<EventBus>,
    pub platforms: Arc<PlatformRegistry>,
    pub items: Arc<ItemStore>,
    pub ledger: Arc<RankHistoryLedger>,
    pub tracker: Arc<CrawlTracker>,
    pub push: Arc<PushEngine>,
    pub cycles: Arc<CrawlCycleService>,
    max_analyze_per_run: usize,
}

impl HotspotCore {
    /// Open (and if needed create) the database named by the config.
    pub fn open(config: &HotspotConfig) -> AppResult<Self> {
        config.validate()?;
        let pool = create_connection_pool(
            &config.database_path(),
            config.database.pool_size,
            config.database.busy_timeout_ms,
        )?;
        Self::with_pool(Arc::new(pool), config)
    }

    /// Wire the services over an existing pool. Initializes the schema.
    pub fn with_pool(pool: Arc<ConnectionPool>, config: &HotspotConfig) -> AppResult<Self> {
        // 1. Schema
        let conn = get_connection(&pool)?;
        initialize_database(&conn)?;
        drop(conn);

        // 2. Repositories
        let event_bus = Arc::new(EventBus::new());
        let platform_repo: Arc<dyn PlatformRepository> =
            Arc::new(SqlitePlatformRepository::new(pool.clone()));
        let item_repo: Arc<dyn NewsItemRepository> =
            Arc::new(SqliteNewsItemRepository::new(pool.clone()));
        let history_repo: Arc<dyn RankHistoryRepository> =
            Arc::new(SqliteRankHistoryRepository::new(pool.clone()));
        let record_repo: Arc<dyn CrawlRecordRepository> =
            Arc::new(SqliteCrawlRecordRepository::new(pool.clone()));
        let push_log: Arc<dyn PushRecordRepository> =
            Arc::new(SqlitePushRecordRepository::new(pool.clone()));

        // 3. Services
        let platforms = Arc::new(PlatformRegistry::new(platform_repo.clone()));
        let items = Arc::new(ItemStore::new(
            pool.clone(),
            item_repo.clone(),
            IdentityResolver::new(config.fallback_window()),
            config.normalizer()?,
            event_bus.clone(),
        ));
        let ledger = Arc::new(RankHistoryLedger::new(pool.clone(), history_repo));
        let tracker = Arc::new(CrawlTracker::new(
            record_repo,
            platform_repo,
            event_bus.clone(),
        ));
        let push = Arc::new(PushEngine::new(
            item_repo,
            push_log,
            items.clone(),
            PushPolicy::from_config(&config.push)?,
            event_bus.clone(),
        ));
        let cycles = Arc::new(CrawlCycleService::new(items.clone(), tracker.clone()));

        // 4. Configured platforms
        platforms.sync_from_config(&config.platforms)?;

        Ok(Self {
            pool,
            event_bus,
            platforms,
            items,
            ledger,
            tracker,
            push,
            cycles,
            max_analyze_per_run: config.analysis.max_analyze_per_run,
        })
    }

    /// Next batch for the external classifier, capped by `analysis.max_analyze_per_run`
    pub fn classification_batch(&self) -> AppResult<Vec<NewsItem>> {
        self.items.list_unclassified(self.max_analyze_per_run)
    }

    pub fn verify_integrity(&self) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        verify_database_integrity(&conn)
    }

    pub fn stats(&self) -> AppResult<DatabaseStats> {
        let conn = get_connection(&self.pool)?;
        get_database_stats(&conn)
    }
}
