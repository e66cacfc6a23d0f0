//! Persistence gateway.
//!
//! Stores are idempotent on article title: saving a record whose title is
//! already stored (or appears earlier in the same batch) skips it silently and
//! only the number of actually inserted records is reported.

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{ArticleRecord, StoredArticle};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub trait ArticleStore {
    /// Insert `records`, skipping duplicate titles. Returns how many were inserted.
    async fn save(&self, records: &[ArticleRecord]) -> Result<usize, StoreError>;

    /// Every stored article, most recently scraped first.
    async fn load_all(&self) -> Result<Vec<StoredArticle>, StoreError>;
}

/// Append the records whose titles are not yet in `stored`.
pub(crate) fn insert_new(stored: &mut Vec<StoredArticle>, records: &[ArticleRecord], now: DateTime<Utc>) -> usize {
    let mut titles: HashSet<String> = stored.iter().map(|s| s.article.title.clone()).collect();
    let before = stored.len();
    for record in records {
        if titles.insert(record.title.clone()) {
            stored.push(StoredArticle {
                article: record.clone(),
                scraped_at: now,
            });
        }
    }
    stored.len() - before
}

/// Newest first; insertion order among equal timestamps.
pub(crate) fn newest_first(mut stored: Vec<StoredArticle>) -> Vec<StoredArticle> {
    stored.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
    stored
}

#[cfg(test)]
pub(crate) fn record(title: &str, url: &str) -> ArticleRecord {
    ArticleRecord::new(title, None, None, &crate::testing::filler(200), None, url).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_insert_new_skips_known_and_repeated_titles() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let mut stored = Vec::new();
        let first = insert_new(&mut stored, &[record("Titular número uno", "https://d.example/1")], t0);
        assert_eq!(first, 1);

        let batch = [
            record("Titular número uno", "https://d.example/1b"),
            record("Titular número dos", "https://d.example/2"),
            record("Titular número dos", "https://d.example/2b"),
        ];
        assert_eq!(insert_new(&mut stored, &batch, t0), 1);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].article.source_url, "https://d.example/2");
    }

    #[test]
    fn test_newest_first() {
        let old = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap();
        let mut stored = Vec::new();
        insert_new(&mut stored, &[record("Titular más antiguo", "https://d.example/a")], old);
        insert_new(&mut stored, &[record("Titular más reciente", "https://d.example/b")], new);
        let sorted = newest_first(stored);
        assert_eq!(sorted[0].article.title, "Titular más reciente");
    }
}
