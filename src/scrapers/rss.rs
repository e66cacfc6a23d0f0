//! RSS / Atom feed discovery.
//!
//! Probes a fixed list of common feed locations at the site root. Any answer
//! with status 200 whose body carries an `<rss` or `<feed` root marker is
//! parsed with `quick-xml`, and the link of every `item` / `entry` is taken
//! from either the `link` element's `href` attribute (Atom) or its text (RSS).

use super::{Discovery, DiscoveryContext, Strategy, get_once, push_entity};
use crate::error::DiscoveryError;
use crate::http::HttpClient;
use crate::utils::normalize_url;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use tracing::{info, instrument};
use url::Url;

/// Feed paths probed at the site root, in order.
pub const FEED_SUFFIXES: &[&str] = &["rss", "feed", "feeds", "rss.xml", "feed.xml", "rss2.xml", "index.xml"];

static FEED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(rss|feed)[\s>]").unwrap());

/// Item links found in one feed document.
#[derive(Debug, Default)]
pub struct FeedLinks {
    pub links: Vec<String>,
    /// Set when the document was cut short by a parse error.
    pub error: Option<String>,
}

#[instrument(level = "info", skip(ctx))]
pub async fn discover<C: HttpClient>(ctx: DiscoveryContext<'_, C>, base_url: &str) -> Discovery {
    let mut discovery = Discovery::new(Strategy::Rss);
    let Ok(base) = Url::parse(base_url) else {
        discovery.record(DiscoveryError::InvalidBase {
            url: base_url.to_string(),
        });
        return discovery;
    };

    for suffix in FEED_SUFFIXES {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let Ok(feed_url) = base.join(&format!("/{suffix}")) else {
            continue;
        };
        let feed_url = feed_url.to_string();
        let resp = match get_once(ctx.client, &feed_url).await {
            Ok(resp) => resp,
            Err(e) => {
                discovery.record(e);
                continue;
            }
        };
        if !resp.is_ok() || !FEED_MARKER.is_match(&resp.body) {
            continue;
        }

        let parsed = parse_feed_links(&resp.body);
        if let Some(reason) = parsed.error {
            discovery.record(DiscoveryError::Malformed {
                url: feed_url.clone(),
                reason,
            });
        }
        for link in parsed.links {
            let Some(url) = normalize_url(base_url, Some(&link)) else {
                continue;
            };
            if ctx.policy.filter_feeds && !ctx.classifier.looks_like_article(&url) {
                continue;
            }
            discovery.insert(url);
        }
    }

    info!(count = discovery.len(), errors = discovery.errors.len(), "RSS discovery finished");
    discovery
}

fn link_href(e: &BytesStart<'_>) -> Option<(String, Option<String>)> {
    let href = e.try_get_attribute("href").ok().flatten()?;
    let href = String::from_utf8_lossy(&href.value).into_owned();
    let href = quick_xml::escape::unescape(&href)
        .map(|s| s.into_owned())
        .unwrap_or(href);
    let rel = e
        .try_get_attribute("rel")
        .ok()
        .flatten()
        .map(|r| String::from_utf8_lossy(&r.value).to_ascii_lowercase());
    Some((href, rel))
}

/// Extract the link of every `item` / `entry` in an RSS or Atom document.
///
/// Atom entries may carry several `<link>`s; the `alternate` one (or one
/// without `rel`) is preferred over enclosures and reply links.
pub fn parse_feed_links(xml: &str) -> FeedLinks {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = FeedLinks::default();
    let mut in_item = false;
    let mut in_link = false;
    let mut text = String::new();
    let mut primary: Option<String> = None;
    let mut fallback: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    in_item = true;
                    primary = None;
                    fallback = None;
                }
                b"link" if in_item => match link_href(&e) {
                    Some((href, rel)) => take_href(href, rel, &mut primary, &mut fallback),
                    None => {
                        in_link = true;
                        text.clear();
                    }
                },
                _ => {}
            },
            Ok(Event::Empty(e)) if in_item && e.local_name().as_ref() == b"link" => {
                if let Some((href, rel)) = link_href(&e) {
                    take_href(href, rel, &mut primary, &mut fallback);
                }
            }
            Ok(Event::Text(t)) if in_link => {
                if let Ok(s) = t.decode() {
                    text.push_str(&s);
                }
            }
            Ok(Event::CData(c)) if in_link => {
                if let Ok(s) = c.decode() {
                    text.push_str(&s);
                }
            }
            Ok(Event::GeneralRef(r)) if in_link => push_entity(&mut text, &r),
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"link" if in_link => {
                    in_link = false;
                    let link = text.trim();
                    if !link.is_empty() && primary.is_none() {
                        primary = Some(link.to_string());
                    }
                }
                b"item" | b"entry" if in_item => {
                    in_item = false;
                    if let Some(link) = primary.take().or_else(|| fallback.take()) {
                        out.links.push(link);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                out.error = Some(e.to_string());
                break;
            }
            _ => {}
        }
    }
    out
}

fn take_href(href: String, rel: Option<String>, primary: &mut Option<String>, fallback: &mut Option<String>) {
    let href = href.trim().to_string();
    if href.is_empty() {
        return;
    }
    match rel.as_deref() {
        None | Some("alternate") => {
            if primary.is_none() {
                *primary = Some(href);
            }
        }
        Some(_) => {
            if fallback.is_none() {
                *fallback = Some(href);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ArticleClassifier;
    use crate::config::{ClassifierPolicy, Limits};
    use crate::testing::MockClient;
    use tokio_util::sync::CancellationToken;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Diario</title>
  <link>https://example.com/</link>
  <item><title>Uno</title><link>https://example.com/2025/05/uno?utm=rss</link></item>
  <item><title>Dos</title><link><![CDATA[https://example.com/contacto]]></link></item>
  <item><title>Tres</title><link>https://example.com/a?x=1&amp;y=2</link></item>
  <item><title>Sin enlace</title></item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="https://example.com/" rel="alternate"/>
  <entry>
    <title>Uno</title>
    <link rel="enclosure" href="https://example.com/audio.mp3"/>
    <link rel="alternate" href="https://example.com/2025/uno"/>
  </entry>
  <entry>
    <title>Dos</title>
    <link rel="replies" href="https://example.com/2025/dos/comments"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_item_links() {
        let parsed = parse_feed_links(RSS);
        assert!(parsed.error.is_none());
        assert_eq!(
            parsed.links,
            vec![
                "https://example.com/2025/05/uno?utm=rss",
                "https://example.com/contacto",
                "https://example.com/a?x=1&y=2",
            ]
        );
    }

    #[test]
    fn test_parse_atom_prefers_alternate() {
        let parsed = parse_feed_links(ATOM);
        assert_eq!(
            parsed.links,
            vec!["https://example.com/2025/uno", "https://example.com/2025/dos/comments"]
        );
    }

    #[test]
    fn test_parse_malformed_keeps_partial_results() {
        let xml = "<rss><channel><item><link>https://example.com/1</link></item><item><link>oops</item></channel>";
        let parsed = parse_feed_links(xml);
        assert_eq!(parsed.links, vec!["https://example.com/1"]);
        assert!(parsed.error.is_some());
    }

    async fn run(client: &MockClient, policy: &ClassifierPolicy) -> Discovery {
        let classifier = ArticleClassifier::default();
        let limits = Limits::default();
        let cancel = CancellationToken::new();
        let ctx = DiscoveryContext {
            client,
            classifier: &classifier,
            policy,
            limits: &limits,
            cancel: &cancel,
        };
        discover(ctx, "https://example.com/seccion/").await
    }

    #[tokio::test]
    async fn test_discover_probes_root_feeds_and_trusts_entries() {
        let client = MockClient::new()
            .with_page("https://example.com/feed", 200, RSS)
            .with_page("https://example.com/rss", 200, "<html>not a feed</html>");
        let d = run(&client, &ClassifierPolicy::default()).await;
        assert_eq!(
            d.urls,
            vec![
                "https://example.com/2025/05/uno",
                "https://example.com/contacto",
                "https://example.com/a",
            ]
        );
        for suffix in FEED_SUFFIXES {
            assert_eq!(client.request_count(&format!("https://example.com/{suffix}")), 1);
        }
    }

    #[tokio::test]
    async fn test_discover_can_filter_feed_entries() {
        let client = MockClient::new().with_page("https://example.com/rss.xml", 200, RSS);
        let policy = ClassifierPolicy {
            filter_feeds: true,
            ..ClassifierPolicy::default()
        };
        let d = run(&client, &policy).await;
        assert_eq!(d.urls, vec!["https://example.com/2025/05/uno"]);
    }

    #[tokio::test]
    async fn test_discover_ignores_non_200() {
        let client = MockClient::new().with_page("https://example.com/feed", 500, RSS);
        assert!(run(&client, &ClassifierPolicy::default()).await.is_empty());
    }
}
