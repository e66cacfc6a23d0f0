//! Heuristic "does this URL look like an article?" check.
//!
//! URLs on excluded hosts (social networks by default) or whose path carries
//! an excluded pattern (`/tag/`, `/author/`, `/feed/`, ...) are rejected
//! outright. Otherwise a URL is accepted when any of these hold:
//!
//! 1. its host (minus `www.`) has configured path substrings and one occurs in the path
//! 2. the path contains a year marker such as `/2025`
//! 3. the last path segment is a slug of at least three hyphenated words and
//!    the whole path is longer than 20 characters

use crate::config::{DEFAULT_EXCLUDED_HOSTS, DEFAULT_EXCLUDED_PATHS, ScrapeConfig};
use std::collections::HashMap;
use url::Url;

/// Year markers used when the configuration names none.
pub const DEFAULT_YEAR_MARKERS: &[&str] = &["/2024", "/2025"];

const RICH_SLUG_MIN_WORDS: usize = 3;
const RICH_SLUG_MIN_PATH_LEN: usize = 20;

/// Host → path substrings that mark article URLs for that site.
#[derive(Debug, Clone, Default)]
pub struct DomainPatterns {
    table: HashMap<String, Vec<String>>,
}

impl DomainPatterns {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Patterns for the sites in the built-in source catalogue.
    pub fn builtin() -> Self {
        let mut patterns = Self::empty();
        let table: &[(&str, &[&str])] = &[
            ("diariosinfronteras.com.pe", &["/202", "/noticia", "/local", "/actualidad", "/policial", "/regional"]),
            ("elperuano.pe", &["/noticia", "/edicion", "/202", "/economia", "/politica", "/nacional"]),
            ("larepublica.pe", &["/politica", "/economia", "/sociedad", "/deportes", "/mundo", "/202"]),
            ("andina.pe", &["/noticia", "/202", "/edicion"]),
            ("peru21.pe", &["/politica", "/economia", "/mundo", "/deportes", "/espectaculos", "/202"]),
            ("elcomercio.pe", &["/politica", "/economia", "/peru", "/mundo", "/deporte", "/luces", "/202"]),
            ("gestion.pe", &["/economia", "/peru", "/mundo", "/empresas", "/202"]),
            ("expreso.com.pe", &["/politica", "/economia", "/actualidad", "/202"]),
            ("diariocorreo.pe", &["/politica", "/peru", "/mundo", "/deportes", "/espectaculos", "/202"]),
            ("ojo.pe", &["/actualidad", "/policial", "/202"]),
            ("publimetro.pe", &["/noticias", "/deportes", "/entretenimiento", "/202"]),
            ("willax.pe", &["/politica", "/actualidad", "/202"]),
            ("exitosanoticias.pe", &["/politica", "/actualidad", "/202"]),
            ("rpp.pe", &["/politica", "/economia", "/mundo", "/peru", "/202"]),
            ("americatv.com.pe", &["/noticias", "/202"]),
            ("panamericana.pe", &["/politica", "/nacionales", "/internacionales", "/202"]),
            ("canaln.pe", &["/actualidad", "/politica", "/202"]),
            ("atv.pe", &["/noticias", "/202"]),
            ("laindustria.pe", &["/actualidad", "/politica", "/202"]),
            ("diariouno.pe", &["/politica", "/actualidad", "/202"]),
        ];
        for (host, paths) in table {
            patterns.insert(host, paths.iter().map(|p| p.to_string()));
        }
        patterns
    }

    /// Add (or extend) the substrings for `host`.
    pub fn insert(&mut self, host: &str, paths: impl IntoIterator<Item = String>) {
        let key = host.trim().to_ascii_lowercase();
        let key = key.strip_prefix("www.").unwrap_or(&key).to_string();
        let entry = self.table.entry(key).or_default();
        for path in paths {
            let path = path.to_lowercase();
            if !entry.contains(&path) {
                entry.push(path);
            }
        }
    }

    pub fn get(&self, host: &str) -> Option<&[String]> {
        self.table.get(host).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Decides whether a normalized URL is article-like.
#[derive(Debug, Clone)]
pub struct ArticleClassifier {
    patterns: DomainPatterns,
    year_markers: Vec<String>,
    excluded_paths: Vec<String>,
    excluded_hosts: Vec<String>,
}

impl Default for ArticleClassifier {
    fn default() -> Self {
        Self::new(DomainPatterns::builtin(), Vec::new())
    }
}

impl ArticleClassifier {
    pub fn new(patterns: DomainPatterns, year_markers: Vec<String>) -> Self {
        let year_markers = if year_markers.is_empty() {
            DEFAULT_YEAR_MARKERS.iter().map(|m| m.to_string()).collect()
        } else {
            year_markers
        };
        Self {
            patterns,
            year_markers,
            excluded_paths: DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
            excluded_hosts: DEFAULT_EXCLUDED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Replace the excluded path substrings and hosts.
    pub fn with_exclusions(mut self, paths: &[String], hosts: &[String]) -> Self {
        self.excluded_paths = paths.iter().map(|p| p.to_lowercase()).collect();
        self.excluded_hosts = hosts
            .iter()
            .map(|h| h.trim().trim_start_matches("www.").to_ascii_lowercase())
            .collect();
        self
    }

    /// `true` when `host` is an excluded host or one of its subdomains.
    pub fn is_excluded_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.excluded_hosts
            .iter()
            .any(|h| host == *h || host.strip_suffix(h.as_str()).is_some_and(|rest| rest.ends_with('.')))
    }

    /// Build from configuration: the built-in table (unless replaced) plus
    /// every `domain_patterns` entry.
    pub fn from_config(config: &ScrapeConfig) -> Self {
        let mut patterns = if config.replace_default_patterns {
            DomainPatterns::empty()
        } else {
            DomainPatterns::builtin()
        };
        for (host, paths) in &config.domain_patterns {
            patterns.insert(host, paths.iter().cloned());
        }
        Self::new(patterns, config.year_markers.clone()).with_exclusions(
            &config.classifier.excluded_path_patterns,
            &config.classifier.excluded_hosts,
        )
    }

    /// `true` when `url` looks like an article. Unparseable input is not.
    pub fn looks_like_article(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        if self.is_excluded_host(host) {
            return false;
        }
        let path = parsed.path().trim_end_matches('/').to_lowercase();
        let slashed = format!("{path}/");
        if self.excluded_paths.iter().any(|p| slashed.contains(p.as_str())) {
            return false;
        }

        if let Some(paths) = self.patterns.get(host) {
            if paths.iter().any(|p| path.contains(p.as_str())) {
                return true;
            }
        }

        if self.year_markers.iter().any(|m| path.contains(m.as_str())) {
            return true;
        }

        let slug = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or_default();
        slug.split('-').count() >= RICH_SLUG_MIN_WORDS && path.len() > RICH_SLUG_MIN_PATH_LEN
    }
}
