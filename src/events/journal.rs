// src/events/journal.rs
//
// Event journal - bounded in-memory record of what the core did
//
// The core never calls its collaborators. Classifiers, notifiers and metrics
// exporters pull from the journal instead (`drain`), at their own pace.
//
// CRITICAL RULES:
// - Append only; records are never edited
// - Bounded: the oldest records are dropped first, and the drop is counted
// - Emission never fails the operation that produced the event

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::events::types::DomainEvent;

pub const DEFAULT_JOURNAL_CAPACITY: usize = 4096;

/// One emitted event, with its payload as JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Default)]
struct Journal {
    records: VecDeque<EventRecord>,
    dropped: u64,
}

#[derive(Debug)]
pub struct EventBus {
    journal: Mutex<Journal>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_JOURNAL_CAPACITY)
    }

    /// A capacity of 0 is treated as 1
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            journal: Mutex::new(Journal::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn emit<E: DomainEvent>(&self, event: E) {
        let payload = serde_json::to_value(&event).unwrap_or_else(|e| {
            log::error!("Could not serialize {}: {}", event.event_type(), e);
            serde_json::Value::Null
        });
        let record = EventRecord {
            event_id: event.event_id(),
            event_type: event.event_type(),
            occurred_at: event.occurred_at(),
            payload,
        };

        log::debug!("[EVENT] {} ({})", record.event_type, record.event_id);

        let mut journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());
        if journal.records.len() == self.capacity {
            journal.records.pop_front();
            journal.dropped += 1;
            if journal.dropped == 1 || journal.dropped % 1000 == 0 {
                log::warn!(
                    "Event journal full ({} records), {} dropped so far",
                    self.capacity,
                    journal.dropped
                );
            }
        }
        journal.records.push_back(record);
    }

    /// Snapshot of the retained records, oldest first. Nothing is removed.
    pub fn recent(&self) -> Vec<EventRecord> {
        let journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());
        journal.records.iter().cloned().collect()
    }

    /// Take every retained record, oldest first
    pub fn drain(&self) -> Vec<EventRecord> {
        let mut journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());
        journal.records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records lost to the capacity bound since creation
    pub fn dropped(&self) -> u64 {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .dropped
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
