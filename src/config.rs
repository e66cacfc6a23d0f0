//! Run configuration.
//!
//! A [`ScrapeConfig`] is loaded from an optional YAML file, then selectively
//! overridden from the command line. It is passed explicitly into the
//! orchestrator; nothing in the engine reads process-wide settings.
//!
//! ```yaml
//! limits:
//!   max_links: 300
//!   max_workers: 8
//! http:
//!   timeout_secs: 10
//! domain_patterns:
//!   example.com: ["/news", "/story"]
//! sources:
//!   - name: Example
//!     base_url: https://example.com/
//! permissions:
//!   editor:
//!     Example: true
//! ```

use crate::error::ConfigError;
use crate::models::SourceSite;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; newsharvest/0.1)";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "es-PE,es;q=0.9,en;q=0.8";

/// Top-level configuration for one harvesting process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub limits: Limits,
    pub http: HttpSettings,
    pub retry: RetryPolicy,
    pub classifier: ClassifierPolicy,
    /// Host → path substrings, merged over the built-in table.
    pub domain_patterns: BTreeMap<String, Vec<String>>,
    /// Drop the built-in pattern table and use only `domain_patterns`.
    pub replace_default_patterns: bool,
    /// Path markers accepted for any host. Empty means the built-in markers.
    pub year_markers: Vec<String>,
    /// Source catalogue. Empty means the built-in catalogue.
    pub sources: Vec<SourceSite>,
    /// Role → source name → permitted.
    pub permissions: BTreeMap<String, BTreeMap<String, bool>>,
}

/// Per-source crawl limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Cap on dispatched article URLs per source.
    pub max_links: usize,
    /// Highest pagination index probed (starting at 2).
    pub max_pages: usize,
    /// Concurrent fetch+extract tasks per source.
    pub max_workers: usize,
    /// Pagination pages at or below this size are treated as empty.
    pub min_page_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_links: 600,
            max_pages: 12,
            max_workers: 10,
            min_page_bytes: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    /// Permit the fetch when robots.txt cannot be retrieved or parsed.
    pub robots_fail_open: bool,
    /// Token-bucket rate per host shared by every request of a run. 0 disables.
    pub per_host_requests_per_second: u32,
    pub per_host_burst: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            robots_fail_open: true,
            per_host_requests_per_second: 5,
            per_host_burst: 10,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Article fetch retry budget.
///
/// Throttling answers (429/503) back off by `throttle_backoff_ms * attempt`,
/// every other failure by `error_backoff_ms * attempt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub throttle_backoff_ms: u64,
    pub error_backoff_ms: u64,
    /// Upper bound of random jitter added to each sleep.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            throttle_backoff_ms: 1500,
            error_backoff_ms: 1200,
            jitter_ms: 0,
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after a 429/503 on `attempt` (1-based).
    pub fn throttle_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.throttle_backoff_ms.saturating_mul(attempt as u64))
    }

    /// Sleep before retrying after any other failure on `attempt` (1-based).
    pub fn error_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.error_backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Path substrings that mark admin, listing and feed pages.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/wp-admin/", "/wp-login", "/feed/", "/tag/", "/author/", "/search"];

/// Social networks whose share and profile links show up on every page.
pub const DEFAULT_EXCLUDED_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "whatsapp.com",
    "t.me",
];

/// Which discovery strategies pass their results through the classifier, and
/// what the classifier always rejects.
///
/// Homepage and pagination links are always filtered; feeds and sitemaps are
/// structured sources and only filtered when asked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierPolicy {
    pub filter_feeds: bool,
    pub filter_sitemaps: bool,
    /// Path substrings never treated as articles. Matched against the
    /// lower-cased path with a trailing `/`.
    pub excluded_path_patterns: Vec<String>,
    /// Hosts (and their subdomains) never treated as articles.
    pub excluded_hosts: Vec<String>,
    /// Homepage and pagination keep only links on the source's own host or
    /// its subdomains.
    pub same_site_only: bool,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self {
            filter_feeds: false,
            filter_sitemaps: true,
            excluded_path_patterns: DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
            excluded_hosts: DEFAULT_EXCLUDED_HOSTS.iter().map(|h| h.to_string()).collect(),
            same_site_only: true,
        }
    }
}

impl ScrapeConfig {
    /// Load a YAML config file. Missing keys take their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path_str,
            source,
        })?;
        info!(sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_workers == 0 {
            return Err(ConfigError::Invalid("limits.max_workers must be at least 1".into()));
        }
        if self.limits.max_links == 0 {
            return Err(ConfigError::Invalid("limits.max_links must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be at least 1".into()));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("http.user_agent must not be empty".into()));
        }
        for source in &self.sources {
            if url::Url::parse(&source.base_url).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "source {:?} has an invalid base_url {:?}",
                    source.name, source.base_url
                )));
            }
        }
        if self.classifier.excluded_path_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "classifier.excluded_path_patterns must not contain empty entries".into(),
            ));
        }
        debug!("Configuration validated");
        Ok(())
    }

    /// The configured catalogue, or the built-in one when none is set.
    pub fn source_catalog(&self) -> Vec<SourceSite> {
        if self.sources.is_empty() {
            default_sources()
        } else {
            self.sources.clone()
        }
    }
}

/// News sites the harvester ships with.
pub fn default_sources() -> Vec<SourceSite> {
    [
        ("Diario Sin Fronteras", "https://diariosinfronteras.com.pe/"),
        ("El Peruano", "https://elperuano.pe/"),
        ("La República", "https://larepublica.pe/"),
        ("Andina", "https://andina.pe/"),
        ("Perú21", "https://peru21.pe/"),
        ("El Comercio", "https://elcomercio.pe/"),
        ("Gestión", "https://gestion.pe/"),
        ("Expreso", "https://expreso.com.pe/"),
        ("Correo", "https://diariocorreo.pe/"),
        ("Ojo", "https://ojo.pe/"),
        ("Publimetro", "https://publimetro.pe/"),
        ("Willax", "https://willax.pe/"),
        ("Exitosa Noticias", "https://exitosanoticias.pe/"),
        ("RPP Noticias", "https://rpp.pe/"),
        ("América Noticias", "https://americatv.com.pe/noticias/"),
        ("Panamericana", "https://panamericana.pe/"),
        ("Canal N", "https://canaln.pe/"),
        ("ATV Noticias", "https://www.atv.pe/noticias"),
        ("La Industria", "https://laindustria.pe/"),
        ("Diario Uno", "https://diariouno.pe/"),
    ]
    .into_iter()
    .map(|(name, url)| SourceSite::new(name, url))
    .collect()
}
