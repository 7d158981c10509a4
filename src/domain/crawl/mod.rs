pub mod entity;

pub use entity::{CrawlRecord, CrawlSourceStatus, SourceStatus};
