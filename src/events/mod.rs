// src/events/mod.rs
//
// Internal Event System - Public API
//
// Every state change of the core is recorded here so external collaborators
// (classifier, notifier, metrics) can pull it without the core calling them.

pub mod journal;
pub mod types;

pub use types::DomainEvent;

pub use types::{
    // Crawl cycles
    CycleFinalized,
    CycleStarted,

    // Items
    ImportanceAssigned,
    ItemCreated,
    ItemMerged,

    // Push
    CandidatesSelected,
    ItemsPushed,
};

pub use journal::{EventBus, EventRecord, DEFAULT_JOURNAL_CAPACITY};
