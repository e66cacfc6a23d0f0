//! XML sitemap discovery.
//!
//! Reads `/sitemap.xml` at the site origin. A `<sitemapindex>` is followed one
//! level deep; any index found below that is treated as a plain list of `loc`s.
//! Collection stops as soon as `max_links` URLs are held.

use super::{Discovery, DiscoveryContext, Strategy, get_once, push_entity};
use crate::error::DiscoveryError;
use crate::http::HttpClient;
use crate::utils::normalize_url;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info, instrument};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    Index,
    UrlSet,
}

/// `loc` entries of one sitemap document.
#[derive(Debug)]
pub struct ParsedSitemap {
    pub kind: SitemapKind,
    pub locs: Vec<String>,
    /// Parse error that cut the document short, if any.
    pub error: Option<String>,
}

/// Parse a sitemap or sitemap index. Malformed input yields the `loc`s read
/// before the error.
pub fn parse_sitemap(xml: &str) -> ParsedSitemap {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut kind = SitemapKind::UrlSet;
    let mut locs = Vec::new();
    let mut error = None;
    let mut in_loc = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemapindex" => kind = SitemapKind::Index,
                b"loc" => {
                    in_loc = true;
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_loc => {
                if let Ok(s) = t.decode() {
                    text.push_str(&s);
                }
            }
            Ok(Event::CData(c)) if in_loc => {
                if let Ok(s) = c.decode() {
                    text.push_str(&s);
                }
            }
            Ok(Event::GeneralRef(r)) if in_loc => push_entity(&mut text, &r),
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = text.trim();
                if !loc.is_empty() {
                    locs.push(loc.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                error = Some(e.to_string());
                break;
            }
            _ => {}
        }
    }

    ParsedSitemap { kind, locs, error }
}

#[instrument(level = "info", skip(ctx))]
pub async fn discover<C: HttpClient>(ctx: DiscoveryContext<'_, C>, base_url: &str) -> Discovery {
    let mut discovery = Discovery::new(Strategy::Sitemap);
    let Some(root) = Url::parse(base_url)
        .ok()
        .filter(|u| u.has_host())
        .map(|u| u.origin().ascii_serialization())
    else {
        discovery.record(DiscoveryError::InvalidBase {
            url: base_url.to_string(),
        });
        return discovery;
    };
    let sitemap_url = format!("{root}/sitemap.xml");

    let Some(top) = fetch_sitemap(ctx, &sitemap_url, &mut discovery).await else {
        return discovery;
    };

    match top.kind {
        SitemapKind::UrlSet => {
            take_locs(ctx, base_url, top.locs, &mut discovery);
        }
        SitemapKind::Index => {
            debug!(nested = top.locs.len(), "Following sitemap index");
            for nested in top.locs {
                if ctx.cancel.is_cancelled() || discovery.len() >= ctx.limits.max_links {
                    break;
                }
                let Ok(nested_url) = Url::parse(&root).and_then(|r| r.join(&nested)) else {
                    continue;
                };
                if let Some(doc) = fetch_sitemap(ctx, nested_url.as_str(), &mut discovery).await {
                    take_locs(ctx, base_url, doc.locs, &mut discovery);
                }
            }
        }
    }

    info!(count = discovery.len(), "Sitemap discovery finished");
    discovery
}

async fn fetch_sitemap<C: HttpClient>(
    ctx: DiscoveryContext<'_, C>,
    url: &str,
    discovery: &mut Discovery,
) -> Option<ParsedSitemap> {
    if ctx.cancel.is_cancelled() {
        return None;
    }
    let resp = match get_once(ctx.client, url).await {
        Ok(resp) => resp,
        Err(e) => {
            discovery.record(e);
            return None;
        }
    };
    if !resp.is_ok() {
        debug!(%url, status = resp.status, "No sitemap");
        return None;
    }
    let parsed = parse_sitemap(&resp.body);
    if let Some(reason) = &parsed.error {
        discovery.record(DiscoveryError::Malformed {
            url: url.to_string(),
            reason: reason.clone(),
        });
    }
    Some(parsed)
}

fn take_locs<C>(ctx: DiscoveryContext<'_, C>, base_url: &str, locs: Vec<String>, discovery: &mut Discovery) {
    for loc in locs {
        if discovery.len() >= ctx.limits.max_links {
            return;
        }
        let Some(url) = normalize_url(base_url, Some(&loc)) else {
            continue;
        };
        if ctx.policy.filter_sitemaps && !ctx.classifier.looks_like_article(&url) {
            continue;
        }
        discovery.insert(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ArticleClassifier;
    use crate::config::{ClassifierPolicy, Limits};
    use crate::testing::{MockClient, sitemap};
    use tokio_util::sync::CancellationToken;

    const BASE: &str = "https://diario.example/seccion/";

    fn index(urls: &[&str]) -> String {
        let entries: String = urls
            .iter()
            .map(|u| format!("<sitemap><loc>{u}</loc></sitemap>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</sitemapindex>"#
        )
    }

    fn articles(prefix: &str, n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://diario.example/2025/05/{prefix}-{i}"))
            .collect()
    }

    async fn run(client: &MockClient, limits: Limits, policy: ClassifierPolicy) -> Discovery {
        let classifier = ArticleClassifier::default();
        let cancel = CancellationToken::new();
        let ctx = DiscoveryContext {
            client,
            classifier: &classifier,
            policy: &policy,
            limits: &limits,
            cancel: &cancel,
        };
        discover(ctx, BASE).await
    }

    #[test]
    fn test_parse_urlset() {
        let parsed = parse_sitemap(&sitemap(&articles("a", 2)));
        assert_eq!(parsed.kind, SitemapKind::UrlSet);
        assert_eq!(parsed.locs.len(), 2);
        assert!(parsed.error.is_none());
    }

    #[test]
    fn test_parse_index_and_entities() {
        let parsed = parse_sitemap(&index(&["https://diario.example/sm.xml?a=1&amp;b=2"]));
        assert_eq!(parsed.kind, SitemapKind::Index);
        assert_eq!(parsed.locs, vec!["https://diario.example/sm.xml?a=1&b=2"]);
    }

    #[tokio::test]
    async fn test_urlset_filtered_by_classifier() {
        let mut urls = articles("a", 3);
        urls.push("https://diario.example/contacto".to_string());
        let client = MockClient::new().with_page("https://diario.example/sitemap.xml", 200, sitemap(&urls));
        let d = run(&client, Limits::default(), ClassifierPolicy::default()).await;
        assert_eq!(d.len(), 3);

        let unfiltered = ClassifierPolicy {
            filter_sitemaps: false,
            ..ClassifierPolicy::default()
        };
        let d = run(&client, Limits::default(), unfiltered).await;
        assert_eq!(d.len(), 4);
    }

    #[tokio::test]
    async fn test_urlset_drops_tag_and_author_pages() {
        let mut urls = articles("a", 2);
        urls.push("https://diario.example/tag/elecciones-generales-2026".to_string());
        urls.push("https://diario.example/author/juan-perez-garcia-lopez".to_string());
        let client = MockClient::new().with_page("https://diario.example/sitemap.xml", 200, sitemap(&urls));
        let d = run(&client, Limits::default(), ClassifierPolicy::default()).await;
        assert_eq!(d.urls, articles("a", 2));
    }

    #[tokio::test]
    async fn test_index_followed_one_level() {
        let client = MockClient::new()
            .with_page(
                "https://diario.example/sitemap.xml",
                200,
                index(&["https://diario.example/sm-1.xml", "/sm-2.xml"]),
            )
            .with_page("https://diario.example/sm-1.xml", 200, sitemap(&articles("a", 2)))
            .with_page(
                "https://diario.example/sm-2.xml",
                200,
                index(&["https://diario.example/sm-3.xml"]),
            );
        let d = run(&client, Limits::default(), ClassifierPolicy::default()).await;
        assert_eq!(d.len(), 2);
        assert_eq!(client.request_count("https://diario.example/sm-2.xml"), 1);
        assert_eq!(client.request_count("https://diario.example/sm-3.xml"), 0);
    }

    #[tokio::test]
    async fn test_cap_short_circuits_nested_fetches() {
        let client = MockClient::new()
            .with_page(
                "https://diario.example/sitemap.xml",
                200,
                index(&["https://diario.example/sm-1.xml", "https://diario.example/sm-2.xml"]),
            )
            .with_page("https://diario.example/sm-1.xml", 200, sitemap(&articles("a", 10)))
            .with_page("https://diario.example/sm-2.xml", 200, sitemap(&articles("b", 10)));
        let limits = Limits {
            max_links: 4,
            ..Limits::default()
        };
        let d = run(&client, limits, ClassifierPolicy::default()).await;
        assert_eq!(d.len(), 4);
        assert_eq!(client.request_count("https://diario.example/sm-2.xml"), 0);
    }

    #[tokio::test]
    async fn test_missing_sitemap_is_empty() {
        let client = MockClient::new();
        let d = run(&client, Limits::default(), ClassifierPolicy::default()).await;
        assert!(d.is_empty());
        assert!(d.errors.is_empty());
    }
}
