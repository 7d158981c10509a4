pub mod entity;
pub mod invariants;
pub mod push_state;

pub use entity::{MergeEffect, NewsItem};
pub use invariants::validate_news_item;
pub use push_state::{PushState, PushTransition};
