// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod crawl_cycle_service;
pub mod crawl_tracker;
pub mod identity_resolver;
pub mod item_store;
pub mod platform_registry;
pub mod push_engine;
pub mod rank_history_ledger;

#[cfg(test)]
mod test_support;


#[cfg(test)]
mod crawl_cycle_service_tests;


#[cfg(test)]
mod storage_failure_tests;

// Re-export all services and their types
pub use crawl_cycle_service::{
    CrawlCycleService,
    CrawlSnapshot,
    CycleReport,
    FetchOutcome,
    PlatformFetch,
};

pub use crawl_tracker::CrawlTracker;

pub use identity_resolver::{IdentityResolver, Resolution};

pub use item_store::{ItemStore, PushReport, UpsertKind, UpsertOutcome};

pub use platform_registry::PlatformRegistry;

pub use push_engine::{CandidateScope, PushEngine, PushPolicy};

pub use rank_history_ledger::RankHistoryLedger;
