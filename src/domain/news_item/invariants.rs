use super::entity::NewsItem;
use crate::domain::{DomainError, DomainResult};

/// Validates all NewsItem invariants
pub fn validate_news_item(item: &NewsItem) -> DomainResult<()> {
    crate::domain::platform::invariants::validate_id(&item.platform_id)?;
    validate_crawl_window(item)?;
    validate_crawl_count(item)?;
    Ok(())
}

fn validate_crawl_window(item: &NewsItem) -> DomainResult<()> {
    if item.last_crawl_time < item.first_crawl_time {
        return Err(DomainError::InvariantViolation(format!(
            "Item {} last seen {} before first seen {}",
            item.id, item.last_crawl_time, item.first_crawl_time
        )));
    }
    Ok(())
}

fn validate_crawl_count(item: &NewsItem) -> DomainResult<()> {
    if item.crawl_count == 0 {
        return Err(DomainError::InvariantViolation(format!(
            "Item {} must have been observed at least once",
            item.id
        )));
    }
    Ok(())
}

/// Invariants that must hold true for NewsItem:
///
/// 1. (url, platform_id) is unique when url is non-empty (enforced by a partial index)
/// 2. crawl_count >= 1, +1 per distinct cycle
/// 3. last_crawl_time >= first_crawl_time
/// 4. has_been_pushed only goes false -> true (see PushState)

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::observation::Observation;
    use chrono::{Duration, Utc};

    fn item() -> NewsItem {
        let obs = Observation::new("baidu", "Headline", "", 1, Utc::now());
        NewsItem::first_observed(&obs, "headline".to_string())
    }

    #[test]
    fn test_fresh_item_is_valid() {
        assert!(validate_news_item(&item()).is_ok());
    }

    #[test]
    fn test_inverted_window_fails() {
        let mut item = item();
        item.last_crawl_time = item.first_crawl_time - Duration::seconds(1);
        assert!(validate_news_item(&item).is_err());
    }

    #[test]
    fn test_zero_count_fails() {
        let mut item = item();
        item.crawl_count = 0;
        assert!(validate_news_item(&item).is_err());
    }
}
