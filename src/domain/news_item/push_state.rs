// src/domain/news_item/push_state.rs
//
// Explicit push lifecycle of an item:
//
//   Unclassified --classify--> Classified --push--> Pushed
//                               |   ^
//                               +---+ (re-classify while unpushed)
//
// Pushed is terminal. Pushing twice is a no-op.

use serde::{Deserialize, Serialize};

use crate::domain::importance::Importance;
use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "importance", rename_all = "snake_case")]
pub enum PushState {
    Unclassified,
    Classified(Importance),
    Pushed(Importance),
}

/// What a push transition actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushTransition {
    Pushed,
    AlreadyPushed,
}

impl PushState {
    /// Rebuild the state from its persisted columns.
    pub fn from_columns(importance: Option<Importance>, has_been_pushed: bool) -> DomainResult<Self> {
        match (importance, has_been_pushed) {
            (None, false) => Ok(PushState::Unclassified),
            (Some(i), false) => Ok(PushState::Classified(i)),
            (Some(i), true) => Ok(PushState::Pushed(i)),
            (None, true) => Err(DomainError::InvariantViolation(
                "Item marked pushed without an importance label".to_string(),
            )),
        }
    }

    pub fn importance(&self) -> Option<Importance> {
        match self {
            PushState::Unclassified => None,
            PushState::Classified(i) | PushState::Pushed(i) => Some(*i),
        }
    }

    pub fn has_been_pushed(&self) -> bool {
        matches!(self, PushState::Pushed(_))
    }

    pub fn classify(self, importance: Importance) -> DomainResult<Self> {
        match self {
            PushState::Unclassified | PushState::Classified(_) => Ok(PushState::Classified(importance)),
            PushState::Pushed(current) => Err(DomainError::InvalidStateTransition(format!(
                "Cannot relabel a pushed item ({} -> {})",
                current, importance
            ))),
        }
    }

    pub fn push(self) -> DomainResult<(Self, PushTransition)> {
        match self {
            PushState::Classified(i) => Ok((PushState::Pushed(i), PushTransition::Pushed)),
            PushState::Pushed(_) => Ok((self, PushTransition::AlreadyPushed)),
            PushState::Unclassified => Err(DomainError::InvalidStateTransition(
                "Cannot push an item before it has been classified".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for PushState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushState::Unclassified => write!(f, "unclassified"),
            PushState::Classified(i) => write!(f, "classified({})", i),
            PushState::Pushed(i) => write!(f, "pushed({})", i),
        }
    }
}
