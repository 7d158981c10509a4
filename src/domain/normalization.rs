// src/domain/normalization.rs
//
// Canonical comparison key for titles. The same normalizer instance must be used
// on the write path (news_items.normalized_title) and for every lookup by title.

use regex::Regex;

/// Unicode punctuation and symbols
pub const DEFAULT_STRIP_PATTERN: &str = r"[\p{P}\p{S}]";

#[derive(Debug, Clone)]
pub struct TitleNormalizer {
    strip: Regex,
}

impl TitleNormalizer {
    pub fn new(strip_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            strip: Regex::new(strip_pattern)?,
        })
    }

    /// Trim, drop stripped characters, collapse whitespace runs, case-fold.
    /// Total: any input yields a string, possibly empty.
    pub fn normalize(&self, title: &str) -> String {
        let stripped = self.strip.replace_all(title.trim(), " ");
        stripped
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}
