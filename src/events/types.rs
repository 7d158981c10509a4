// src/events/types.rs
//
// All domain events in the system.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events are immutable
// - Events carry only the data needed to react
// - Events are emitted after the transaction that produced them committed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Importance, MergeEffect};

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone + Serialize {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

macro_rules! impl_domain_event {
    ($ty:ident) => {
        impl DomainEvent for $ty {
            fn event_id(&self) -> Uuid {
                self.event_id
            }
            fn occurred_at(&self) -> DateTime<Utc> {
                self.occurred_at
            }
            fn event_type(&self) -> &'static str {
                stringify!($ty)
            }
        }
    };
}

// ============================================================================
// ITEM EVENTS
// ============================================================================

/// Emitted when an observation did not resolve to any stored item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub item_id: i64,
    pub platform_id: String,
    pub title: String,
    pub crawl_time: DateTime<Utc>,
}

impl ItemCreated {
    pub fn new(item_id: i64, platform_id: String, title: String, crawl_time: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            item_id,
            platform_id,
            title,
            crawl_time,
        }
    }
}

impl_domain_event!(ItemCreated);

/// Emitted when an observation was folded into an existing item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMerged {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub item_id: i64,
    pub rank: u32,
    pub crawl_count: u32,
    pub crawl_time: DateTime<Utc>,
    /// False when a late, older cycle was backfilled
    pub advanced: bool,
}

impl ItemMerged {
    pub fn new(item_id: i64, rank: u32, crawl_count: u32, crawl_time: DateTime<Utc>, effect: MergeEffect) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            item_id,
            rank,
            crawl_count,
            crawl_time,
            advanced: effect == MergeEffect::Advanced,
        }
    }
}

impl_domain_event!(ItemMerged);

/// Emitted when the classifier's label was applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceAssigned {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub item_id: i64,
    pub previous: Option<Importance>,
    pub importance: Importance,
}

impl ImportanceAssigned {
    pub fn new(item_id: i64, previous: Option<Importance>, importance: Importance) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            item_id,
            previous,
            importance,
        }
    }
}

impl_domain_event!(ImportanceAssigned);

// ============================================================================
// CRAWL CYCLE EVENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleStarted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub record_id: i64,
    pub crawl_time: DateTime<Utc>,
}

impl CycleStarted {
    pub fn new(record_id: i64, crawl_time: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            record_id,
            crawl_time,
        }
    }
}

impl_domain_event!(CycleStarted);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleFinalized {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub record_id: i64,
    pub crawl_time: DateTime<Utc>,
    pub total_items: u32,
}

impl CycleFinalized {
    pub fn new(record_id: i64, crawl_time: DateTime<Utc>, total_items: u32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            record_id,
            crawl_time,
            total_items,
        }
    }
}

impl_domain_event!(CycleFinalized);

// ============================================================================
// PUSH EVENTS
// ============================================================================

/// Emitted when a candidate batch was handed out (nothing is marked yet)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesSelected {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub item_ids: Vec<i64>,
}

impl CandidatesSelected {
    pub fn new(item_ids: Vec<i64>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            item_ids,
        }
    }
}

impl_domain_event!(CandidatesSelected);

/// Emitted after the caller confirmed delivery and the items were marked pushed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsPushed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    /// Only items that transitioned in this call
    pub item_ids: Vec<i64>,
}

impl ItemsPushed {
    pub fn new(item_ids: Vec<i64>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            item_ids,
        }
    }
}

impl_domain_event!(ItemsPushed);
