//! Data models for sources, extracted articles and run summaries.
//!
//! - [`SourceSite`]: a news site to harvest, supplied by configuration
//! - [`ArticleRecord`]: one validated article extracted from a fetched page
//! - [`StoredArticle`]: an article as read back from the store
//! - [`ScrapeRun`]: counters and status for one source's orchestration

use crate::error::ExtractError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum title length accepted into persistence.
pub const MIN_TITLE_CHARS: usize = 8;
/// Body text must be strictly longer than this.
pub const MIN_BODY_CHARS: usize = 150;
pub const DEFAULT_CATEGORY: &str = "General";

/// A news site to harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSite {
    /// Display name, also the key used by role permissions.
    pub name: String,
    pub base_url: String,
}

impl SourceSite {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }
}

/// A validated article.
///
/// Only [`ArticleRecord::new`] builds one, so every record in flight has a
/// title of at least [`MIN_TITLE_CHARS`] and a body longer than
/// [`MIN_BODY_CHARS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    /// RFC 3339 UTC timestamp, or empty when unknown.
    pub published_at: String,
    pub category: String,
    pub body: String,
    pub image_url: Option<String>,
    /// Page the article was extracted from. Unique per article.
    pub source_url: String,
}

impl ArticleRecord {
    pub fn new(
        title: &str,
        published_at: Option<DateTime<Utc>>,
        category: Option<String>,
        body: &str,
        image_url: Option<String>,
        source_url: &str,
    ) -> Result<Self, ExtractError> {
        let title = title.trim();
        let title_len = title.chars().count();
        if title_len == 0 {
            return Err(ExtractError::MissingTitle);
        }
        if title_len < MIN_TITLE_CHARS {
            return Err(ExtractError::TitleTooShort {
                len: title_len,
                min: MIN_TITLE_CHARS,
            });
        }

        let body = body.trim();
        let body_len = body.chars().count();
        if body_len <= MIN_BODY_CHARS {
            return Err(ExtractError::BodyTooShort {
                len: body_len,
                min: MIN_BODY_CHARS,
            });
        }

        let parsed = url::Url::parse(source_url).map_err(|_| ExtractError::InvalidSourceUrl {
            url: source_url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExtractError::InvalidSourceUrl {
                url: source_url.to_string(),
            });
        }

        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Ok(Self {
            title: title.to_string(),
            published_at: published_at.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
            category,
            body: body.to_string(),
            image_url,
            source_url: source_url.to_string(),
        })
    }

    /// Host of the source page without a leading `www.`.
    pub fn source_host(&self) -> Option<String> {
        url::Url::parse(&self.source_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
    }
}

/// An article as held by a store, with the time it was inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArticle {
    #[serde(flatten)]
    pub article: ArticleRecord,
    pub scraped_at: DateTime<Utc>,
}

/// How one source's orchestration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Every discovery strategy came back empty.
    NoArticlesFound,
    /// Stopped early by a cancellation request.
    Cancelled,
}

/// Counters for one source's orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub source: String,
    pub base_url: String,
    pub discovered_url_count: usize,
    /// URLs whose page was downloaded successfully.
    pub fetched_count: usize,
    pub valid_article_count: usize,
    pub robots_denied_count: usize,
    pub failed_fetch_count: usize,
    pub rejected_count: usize,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub status: RunStatus,
    /// Discovery errors worth surfacing, one line each.
    pub errors: Vec<String>,
}

impl ScrapeRun {
    pub fn new(source: &SourceSite) -> Self {
        Self {
            source: source.name.clone(),
            base_url: source.base_url.clone(),
            discovered_url_count: 0,
            fetched_count: 0,
            valid_article_count: 0,
            robots_denied_count: 0,
            failed_fetch_count: 0,
            rejected_count: 0,
            duration: Duration::ZERO,
            status: RunStatus::Completed,
            errors: Vec::new(),
        }
    }
}

/// Result of harvesting one source.
#[derive(Debug, Clone)]
pub struct SourceScrape {
    pub run: ScrapeRun,
    /// Valid articles in completion order, which is unspecified.
    pub articles: Vec<ArticleRecord>,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
