// src/services/identity_resolver.rs
//
// Identity Resolver - decides which stored item an observation belongs to
//
// CRITICAL RULES:
// - A (url, platform_id) hit is authoritative, whatever the title says
// - The title fallback is only used for observations without a URL
// - Empty normalized titles never match anything
// - Never crosses platforms
// - Read-only: runs inside the caller's transaction, writes nothing

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use crate::domain::{NewsItem, Observation};
use crate::error::AppResult;
use crate::repositories::news_item_repository::{find_by_title_in_window, find_by_url};

/// Outcome of identity resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Merge into this stored item
    Existing(NewsItem),
    /// Nothing matched; create a new item
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPath {
    Url,
    Title,
}

#[derive(Debug, Clone)]
pub struct IdentityResolver {
    fallback_window: Duration,
}

impl IdentityResolver {
    pub fn new(fallback_window: Duration) -> Self {
        Self { fallback_window }
    }

    pub fn fallback_window(&self) -> Duration {
        self.fallback_window
    }

    pub fn resolve(
        &self,
        conn: &Connection,
        obs: &Observation,
        normalized_title: &str,
    ) -> AppResult<Resolution> {
        Ok(match self.resolve_with_path(conn, obs, normalized_title)? {
            Some((item, _)) => Resolution::Existing(item),
            None => Resolution::New,
        })
    }

    pub(crate) fn resolve_with_path(
        &self,
        conn: &Connection,
        obs: &Observation,
        normalized_title: &str,
    ) -> AppResult<Option<(NewsItem, MatchPath)>> {
        // 1. URL path
        if obs.has_url() {
            return Ok(find_by_url(conn, &obs.url, &obs.platform_id)?.map(|item| (item, MatchPath::Url)));
        }

        // 2. Rank-only source: title whose seen span, widened by the window, covers the cycle
        if normalized_title.is_empty() {
            return Ok(None);
        }
        let from = obs
            .crawl_time
            .checked_sub_signed(self.fallback_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let to = obs
            .crawl_time
            .checked_add_signed(self.fallback_window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Ok(
            find_by_title_in_window(conn, normalized_title, &obs.platform_id, from, to)?
                .map(|item| (item, MatchPath::Title)),
        )
    }
}
