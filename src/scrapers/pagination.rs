//! Listing-page discovery.
//!
//! Many news sites expose older listings at `/page/N/`, `/pagina/N/` or
//! `?page=N`. For each index from 2 to `max_pages` all three shapes are tried;
//! pages answering 200 with more than `min_page_bytes` of markup are scanned
//! for article links the same way as the homepage.

use super::{Discovery, DiscoveryContext, Strategy, collect_article_links, get_once};
use crate::error::DiscoveryError;
use crate::http::HttpClient;
use itertools::Itertools;
use tracing::{debug, info, instrument};
use url::Url;

/// Return `base` with `key=value` set in its query string, replacing an
/// existing `key` in place and keeping every other parameter.
pub fn with_query(base: &Url, key: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = base.query_pairs().into_owned().collect();
    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }
    let mut url = base.clone();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url
}

/// Candidate listing URLs for page `index`, deduplicated.
pub fn page_candidates(base: &Url, index: usize) -> Vec<String> {
    let mut candidates = Vec::with_capacity(3);
    for path in [format!("/page/{index}/"), format!("/pagina/{index}/")] {
        if let Ok(url) = base.join(&path) {
            candidates.push(url.to_string());
        }
    }
    candidates.push(with_query(base, "page", &index.to_string()).to_string());
    candidates.into_iter().unique().collect()
}

#[instrument(level = "info", skip(ctx))]
pub async fn discover<C: HttpClient>(ctx: DiscoveryContext<'_, C>, base_url: &str) -> Discovery {
    let mut discovery = Discovery::new(Strategy::Pagination);
    let Ok(base) = Url::parse(base_url) else {
        discovery.record(DiscoveryError::InvalidBase {
            url: base_url.to_string(),
        });
        return discovery;
    };

    let mut pages_used = 0usize;
    'pages: for index in 2..=ctx.limits.max_pages {
        for candidate in page_candidates(&base, index) {
            if ctx.cancel.is_cancelled() {
                break 'pages;
            }
            if discovery.len() >= ctx.limits.max_links {
                break 'pages;
            }
            let resp = match get_once(ctx.client, &candidate).await {
                Ok(resp) => resp,
                Err(e) => {
                    discovery.record(e);
                    continue;
                }
            };
            if !resp.is_ok() || resp.body.len() <= ctx.limits.min_page_bytes {
                continue;
            }
            let added = collect_article_links(
                &resp.body,
                base_url,
                ctx.classifier,
                ctx.policy,
                ctx.limits.max_links,
                &mut discovery,
            );
            pages_used += 1;
            debug!(%candidate, added, "Scanned listing page");
        }
    }

    info!(count = discovery.len(), pages_used, "Pagination discovery finished");
    discovery
}
