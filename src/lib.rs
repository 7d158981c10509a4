// src/lib.rs
// HotSpot core - aggregation, deduplication and rank history for trending items
//
// Architecture:
// - Domain-centric: identity, merge and push rules live in the domain
// - Event-driven: every state change is recorded in the event journal
// - Explicit: no background work, no implicit retries
// - Embeddable: schedulers, notifiers and classifiers drive the core from outside

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;

// ============================================================================
// APPLICATION LAYER
// ============================================================================

pub mod application;

// ============================================================================
// PUBLIC API - Domain Entities
// ============================================================================

pub use domain::{
    validate_news_item,
    validate_observation,
    validate_platform,
    validate_push_record,
    // Crawl cycles
    CrawlRecord,
    CrawlSourceStatus,
    // Classification
    Importance,
    MergeEffect,
    // News items
    NewsItem,
    // Observations
    Observation,
    // Platforms
    Platform,
    PlatformKind,
    PushRecord,
    PushState,
    PushTransition,
    // Rank history
    RankHistoryEntry,
    RankTrend,
    RawItem,
    SourceStatus,
    // Normalization
    TitleNormalizer,
    TrendDirection,
    TrendWindow,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult, ErrorKind};

// ============================================================================
// PUBLIC API - Configuration
// ============================================================================

pub use config::HotspotConfig;

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    CandidatesSelected,
    CycleFinalized,
    CycleStarted,
    DomainEvent,
    EventBus,
    EventRecord,
    ImportanceAssigned,
    ItemCreated,
    ItemMerged,
    ItemsPushed,
};

// ============================================================================
// PUBLIC API - Database
// ============================================================================

pub use db::{create_connection_pool, initialize_database, ConnectionPool, DatabaseStats};

// ============================================================================
// PUBLIC API - Repositories
// ============================================================================

pub use repositories::{
    CrawlRecordRepository,
    ItemFilter,
    NewsItemRepository,
    PlatformRepository,
    PushRecordRepository,
    RankHistoryRepository,
    SqliteCrawlRecordRepository,
    SqliteNewsItemRepository,
    SqlitePlatformRepository,
    SqlitePushRecordRepository,
    SqliteRankHistoryRepository,
};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{
    CandidateScope,
    // Crawl cycles
    CrawlCycleService,
    CrawlSnapshot,
    CrawlTracker,
    CycleReport,
    FetchOutcome,
    // Identity
    IdentityResolver,
    // Item store
    ItemStore,
    PlatformFetch,
    // Platforms
    PlatformRegistry,
    // Push
    PushEngine,
    PushPolicy,
    PushReport,
    // Rank history
    RankHistoryLedger,
    Resolution,
    UpsertKind,
    UpsertOutcome,
};

// ============================================================================
// PUBLIC API - Application Layer
// ============================================================================

pub use application::HotspotCore;
