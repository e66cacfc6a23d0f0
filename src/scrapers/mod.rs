//! URL discovery strategies.
//!
//! Each strategy independently produces candidate article URLs for one site:
//!
//! | Strategy | Module | Source | Classifier |
//! |----------|--------|--------|------------|
//! | RSS/Atom | [`rss`] | `/rss`, `/feed`, `/rss.xml`, ... | only with `filter_feeds` |
//! | Homepage | [`homepage`] | the base URL's anchors | always |
//! | Pagination | [`pagination`] | `/page/N/`, `/pagina/N/`, `?page=N` | always |
//! | Sitemap | [`sitemap`] | `/sitemap.xml` and one level of index | with `filter_sitemaps` |
//!
//! Strategies never fail past their own boundary. Network errors, bad
//! statuses and malformed markup are recorded in [`Discovery::errors`] and the
//! strategy returns what it had collected so far. Discovery requests are single
//! attempts; only article fetches retry.

pub mod homepage;
pub mod pagination;
pub mod rss;
pub mod sitemap;

use crate::classifier::ArticleClassifier;
use crate::config::{ClassifierPolicy, Limits};
use crate::error::DiscoveryError;
use crate::http::{HttpClient, HttpResponse};
use crate::utils::normalize_url;
use once_cell::sync::Lazy;
use quick_xml::events::BytesRef;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Rss,
    Homepage,
    Pagination,
    Sitemap,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [Strategy::Rss, Strategy::Homepage, Strategy::Pagination, Strategy::Sitemap];

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Rss => "rss",
            Strategy::Homepage => "homepage",
            Strategy::Pagination => "pagination",
            Strategy::Sitemap => "sitemap",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Candidate URLs found by one strategy, in discovery order, plus the
/// problems it ran into along the way.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub strategy: Strategy,
    pub urls: Vec<String>,
    pub errors: Vec<DiscoveryError>,
    seen: HashSet<String>,
}

impl Discovery {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            urls: Vec::new(),
            errors: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add a URL unless already present. Returns `true` when it was new.
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.insert(url.clone()) {
            self.urls.push(url);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn record(&mut self, error: DiscoveryError) {
        debug!(strategy = %self.strategy, %error, "Discovery problem");
        self.errors.push(error);
    }
}

/// Everything a strategy needs besides the base URL.
pub struct DiscoveryContext<'a, C> {
    pub client: &'a C,
    pub classifier: &'a ArticleClassifier,
    pub policy: &'a ClassifierPolicy,
    pub limits: &'a Limits,
    pub cancel: &'a CancellationToken,
}

impl<C> Clone for DiscoveryContext<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for DiscoveryContext<'_, C> {}

/// Run one strategy.
pub async fn run_strategy<C: HttpClient>(
    strategy: Strategy,
    ctx: DiscoveryContext<'_, C>,
    base_url: &str,
) -> Discovery {
    match strategy {
        Strategy::Rss => rss::discover(ctx, base_url).await,
        Strategy::Homepage => homepage::discover(ctx, base_url).await,
        Strategy::Pagination => pagination::discover(ctx, base_url).await,
        Strategy::Sitemap => sitemap::discover(ctx, base_url).await,
    }
}

/// Single-attempt GET that turns transport failures into a [`DiscoveryError`].
pub(crate) async fn get_once<C: HttpClient>(client: &C, url: &str) -> Result<HttpResponse, DiscoveryError> {
    client.get(url).await.map_err(|source| DiscoveryError::Transport {
        url: url.to_string(),
        source,
    })
}

/// `true` when `url` is on `base_url`'s host or a subdomain of it (or the
/// other way round), ignoring a leading `www.`.
pub fn same_site(base_url: &str, url: &str) -> bool {
    let host = |raw: &str| {
        Url::parse(raw)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_ascii_lowercase()))
    };
    let (Some(base), Some(other)) = (host(base_url), host(url)) else {
        return false;
    };
    let nested = |outer: &str, inner: &str| outer.strip_suffix(inner).is_some_and(|rest| rest.ends_with('.'));
    base == other || nested(other.as_str(), base.as_str()) || nested(base.as_str(), other.as_str())
}

/// Collect classifier-accepted anchor targets from an HTML page into
/// `discovery`, stopping once it holds `cap` URLs. With
/// `policy.same_site_only`, off-site links are skipped.
pub(crate) fn collect_article_links(
    html: &str,
    base_url: &str,
    classifier: &ArticleClassifier,
    policy: &ClassifierPolicy,
    cap: usize,
    discovery: &mut Discovery,
) -> usize {
    let document = Html::parse_document(html);
    let mut added = 0;
    for anchor in document.select(&ANCHOR_SELECTOR) {
        if discovery.len() >= cap {
            break;
        }
        let Some(url) = normalize_url(base_url, anchor.value().attr("href")) else {
            continue;
        };
        if policy.same_site_only && !same_site(base_url, &url) {
            continue;
        }
        if classifier.looks_like_article(&url) && discovery.insert(url) {
            added += 1;
        }
    }
    added
}

/// Append the text an XML entity reference stands for.
pub(crate) fn push_entity(buf: &mut String, reference: &BytesRef<'_>) {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        buf.push(ch);
        return;
    }
    if let Ok(name) = reference.decode() {
        match quick_xml::escape::resolve_predefined_entity(&name) {
            Some(text) => buf.push_str(text),
            None => {
                buf.push('&');
                buf.push_str(&name);
                buf.push(';');
            }
        }
    }
}
