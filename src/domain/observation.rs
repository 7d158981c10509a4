// src/domain/observation.rs
//
// Observations are what scrapers hand to the core: one platform's report of one
// item's rank/title/URL within a crawl cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{crawl_time_from_timestamp, DomainError, DomainResult};

/// One raw entry of a platform's hot list, as returned by a scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mobile_url: String,
    pub rank: i64,
}

impl RawItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>, rank: i64) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            mobile_url: String::new(),
            rank,
        }
    }

    pub fn with_mobile_url(mut self, mobile_url: impl Into<String>) -> Self {
        self.mobile_url = mobile_url.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub platform_id: String,
    pub title: String,
    /// Empty for rank-only sources
    pub url: String,
    pub mobile_url: String,
    /// Raw rank as reported; validated to be non-negative before merge
    pub rank: i64,
    /// Logical time of the crawl cycle, whole seconds
    pub crawl_time: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        platform_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        rank: i64,
        crawl_time: DateTime<Utc>,
    ) -> Self {
        Self {
            platform_id: platform_id.into(),
            title: title.into().trim().to_string(),
            url: url.into().trim().to_string(),
            mobile_url: String::new(),
            rank,
            crawl_time: truncate_to_second(crawl_time),
        }
    }

    pub fn from_raw(platform_id: &str, item: &RawItem, crawl_time: DateTime<Utc>) -> Self {
        Self::new(platform_id, item.title.as_str(), item.url.as_str(), item.rank, crawl_time)
            .with_mobile_url(item.mobile_url.as_str())
    }

    pub fn with_mobile_url(mut self, mobile_url: impl Into<String>) -> Self {
        self.mobile_url = mobile_url.into().trim().to_string();
        self
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }

    /// Rank as stored. Only meaningful after `validate_observation` passed.
    pub fn stored_rank(&self) -> u32 {
        u32::try_from(self.rank).unwrap_or(u32::MAX)
    }
}

/// Crawl cycles are identified by whole seconds.
pub fn truncate_to_second(time: DateTime<Utc>) -> DateTime<Utc> {
    crawl_time_from_timestamp(time.timestamp()).unwrap_or(time)
}

/// Rejects malformed observations before they reach the store.
/// Empty titles are accepted on purpose.
pub fn validate_observation(obs: &Observation) -> DomainResult<()> {
    crate::domain::platform::invariants::validate_id(&obs.platform_id)?;

    if obs.rank < 0 {
        return Err(DomainError::InvariantViolation(format!(
            "Rank cannot be negative (got {}) for '{}' on {}",
            obs.rank, obs.title, obs.platform_id
        )));
    }
    if obs.rank > i64::from(u32::MAX) {
        return Err(DomainError::InvariantViolation(format!(
            "Rank {} out of range on {}",
            obs.rank, obs.platform_id
        )));
    }
    Ok(())
}
