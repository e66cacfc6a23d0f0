use super::{ArticleStore, insert_new, newest_first};
use crate::error::StoreError;
use crate::models::{ArticleRecord, StoredArticle};
use chrono::Utc;
use std::sync::Mutex;

/// In-process store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Mutex<Vec<StoredArticle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.articles.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArticleStore for MemoryStore {
    async fn save(&self, records: &[ArticleRecord]) -> Result<usize, StoreError> {
        let mut articles = self
            .articles
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(insert_new(&mut articles, records, Utc::now()))
    }

    async fn load_all(&self) -> Result<Vec<StoredArticle>, StoreError> {
        let articles = self
            .articles
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(newest_first(articles.clone()))
    }
}
