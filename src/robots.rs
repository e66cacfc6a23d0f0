//! robots.txt gate consulted before every article fetch.
//!
//! Rules are cached per origin for the lifetime of a [`RobotsGate`]. When
//! robots.txt cannot be retrieved (transport error or 5xx) the gate follows
//! its fail-open flag, permitting the fetch by default. A 401/403 answer
//! disallows the whole origin and any other 4xx means there are no rules.

use crate::http::HttpClient;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    /// Pattern length, used for longest-match precedence.
    specificity: usize,
    matcher: Regex,
}

impl Rule {
    fn new(allow: bool, pattern: &str) -> Option<Self> {
        let (body, anchored) = match pattern.strip_suffix('$') {
            Some(body) => (body, true),
            None => (pattern, false),
        };
        let mut re = String::from("^");
        re.push_str(&body.split('*').map(regex::escape).collect::<Vec<_>>().join(".*"));
        if anchored {
            re.push('$');
        }
        Regex::new(&re).ok().map(|matcher| Self {
            allow,
            specificity: pattern.len(),
            matcher,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// Parsed robots.txt.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    groups: Vec<Group>,
    disallow_all: bool,
}

impl RobotsTxt {
    /// Parse robots.txt content. Unknown directives are ignored.
    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();
        let mut in_agent_lines = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match directive.trim().to_ascii_lowercase().as_str() {
                "user-agent" => {
                    if !in_agent_lines && !current.agents.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.agents.push(value.to_ascii_lowercase());
                    in_agent_lines = true;
                }
                "allow" | "disallow" => {
                    in_agent_lines = false;
                    if current.agents.is_empty() || value.is_empty() {
                        continue;
                    }
                    let allow = directive.trim().eq_ignore_ascii_case("allow");
                    if let Some(rule) = Rule::new(allow, value) {
                        current.rules.push(rule);
                    }
                }
                _ => in_agent_lines = false,
            }
        }
        if !current.agents.is_empty() {
            groups.push(current);
        }

        Self {
            groups,
            disallow_all: false,
        }
    }

    /// Rules that deny every path.
    pub fn deny_all() -> Self {
        Self {
            groups: Vec::new(),
            disallow_all: true,
        }
    }

    fn group_for(&self, user_agent: &str) -> Option<&Group> {
        let ua = user_agent.to_ascii_lowercase();
        let specific = self
            .groups
            .iter()
            .flat_map(|g| g.agents.iter().map(move |a| (a, g)))
            .filter(|(a, _)| a.as_str() != "*" && ua.contains(a.as_str()))
            .max_by_key(|(a, _)| a.len())
            .map(|(_, g)| g);
        specific.or_else(|| self.groups.iter().find(|g| g.agents.iter().any(|a| a == "*")))
    }

    /// Whether `user_agent` may fetch `path`. The longest matching rule wins;
    /// on a tie `Allow` wins.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        if self.disallow_all {
            return false;
        }
        let Some(group) = self.group_for(user_agent) else {
            return true;
        };
        group
            .rules
            .iter()
            .filter(|r| r.matcher.is_match(path))
            .max_by_key(|r| (r.specificity, r.allow))
            .is_none_or(|r| r.allow)
    }
}

/// Outcome of a robots check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsVerdict {
    Allowed,
    Disallowed,
    /// robots.txt could not be retrieved; `permitted` reflects the fail-open flag.
    Unavailable { permitted: bool },
}

impl RobotsVerdict {
    pub fn permits(self) -> bool {
        match self {
            RobotsVerdict::Allowed => true,
            RobotsVerdict::Disallowed => false,
            RobotsVerdict::Unavailable { permitted } => permitted,
        }
    }
}

type Slot = Arc<OnceCell<Option<Arc<RobotsTxt>>>>;

/// Per-run robots.txt checker with an origin-keyed cache.
pub struct RobotsGate {
    user_agent: String,
    fail_open: bool,
    cache: Mutex<HashMap<String, Slot>>,
}

impl RobotsGate {
    pub fn new(user_agent: impl Into<String>, fail_open: bool) -> Self {
        Self {
            user_agent: user_agent.into(),
            fail_open,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether the configured user-agent may fetch `url`.
    #[instrument(level = "debug", skip(self, client))]
    pub async fn check<C: HttpClient>(&self, client: &C, url: &str) -> RobotsVerdict {
        let Ok(parsed) = Url::parse(url) else {
            return RobotsVerdict::Unavailable {
                permitted: self.fail_open,
            };
        };
        let origin = parsed.origin().ascii_serialization();

        let slot = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(cache.entry(origin.clone()).or_default())
        };
        let rules = slot.get_or_init(|| fetch_robots(client, &origin)).await;

        match rules {
            Some(robots) if robots.is_allowed(&self.user_agent, parsed.path()) => RobotsVerdict::Allowed,
            Some(_) => {
                debug!(%url, "Disallowed by robots.txt");
                RobotsVerdict::Disallowed
            }
            None => RobotsVerdict::Unavailable {
                permitted: self.fail_open,
            },
        }
    }
}

async fn fetch_robots<C: HttpClient>(client: &C, origin: &str) -> Option<Arc<RobotsTxt>> {
    let robots_url = format!("{origin}/robots.txt");
    match client.get(&robots_url).await {
        Ok(resp) if resp.is_success() => {
            info!(%robots_url, "Loaded robots.txt");
            Some(Arc::new(RobotsTxt::parse(&resp.body)))
        }
        Ok(resp) if matches!(resp.status, 401 | 403) => {
            info!(%robots_url, status = resp.status, "robots.txt forbidden; treating origin as disallowed");
            Some(Arc::new(RobotsTxt::deny_all()))
        }
        Ok(resp) if (400..500).contains(&resp.status) => Some(Arc::new(RobotsTxt::default())),
        Ok(resp) => {
            warn!(%robots_url, status = resp.status, "robots.txt unavailable");
            None
        }
        Err(e) => {
            warn!(%robots_url, error = %e, "robots.txt fetch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::testing::MockClient;

    const UA: &str = "Mozilla/5.0 (compatible; newsharvest/0.1)";

    #[test]
    fn test_parse_basic_disallow() {
        let robots = RobotsTxt::parse(
            "User-agent: *\nDisallow: /private/\nDisallow: /admin/ # staff only\n",
        );
        assert!(robots.is_allowed(UA, "/2025/nota"));
        assert!(!robots.is_allowed(UA, "/private/x"));
        assert!(!robots.is_allowed(UA, "/admin/"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let robots = RobotsTxt::parse("User-agent: *\nDisallow:\n");
        assert!(robots.is_allowed(UA, "/anything"));
    }

    #[test]
    fn test_specific_agent_group_wins() {
        let robots = RobotsTxt::parse(
            "User-agent: *\nDisallow: /\n\nUser-agent: newsharvest\nDisallow: /tmp/\n",
        );
        assert!(robots.is_allowed(UA, "/2025/nota"));
        assert!(!robots.is_allowed(UA, "/tmp/x"));
        assert!(!robots.is_allowed("OtherBot/1.0", "/2025/nota"));
    }

    #[test]
    fn test_grouped_agents_share_rules() {
        let robots = RobotsTxt::parse("User-agent: a-bot\nUser-agent: newsharvest\nDisallow: /x\n");
        assert!(!robots.is_allowed(UA, "/x/1"));
        assert!(!robots.is_allowed("a-bot", "/x/1"));
    }

    #[test]
    fn test_longest_match_wins() {
        let robots = RobotsTxt::parse("User-agent: *\nDisallow: /noticias/\nAllow: /noticias/publicas/\n");
        assert!(robots.is_allowed(UA, "/noticias/publicas/1"));
        assert!(!robots.is_allowed(UA, "/noticias/privadas/1"));
    }

    #[test]
    fn test_wildcard_and_anchor() {
        let robots = RobotsTxt::parse("User-agent: *\nDisallow: /*.php$\nDisallow: /*/print\n");
        assert!(!robots.is_allowed(UA, "/index.php"));
        assert!(robots.is_allowed(UA, "/index.php/extra"));
        assert!(!robots.is_allowed(UA, "/2025/print"));
    }

    #[test]
    fn test_no_matching_group_allows() {
        let robots = RobotsTxt::parse("User-agent: googlebot\nDisallow: /\n");
        assert!(robots.is_allowed(UA, "/"));
    }

    #[tokio::test]
    async fn test_gate_denies_disallowed_path() {
        let client = MockClient::new().with_page(
            "https://example.com/robots.txt",
            200,
            "User-agent: *\nDisallow: /privado/\n",
        );
        let gate = RobotsGate::new(UA, true);
        assert_eq!(
            gate.check(&client, "https://example.com/privado/nota").await,
            RobotsVerdict::Disallowed
        );
        assert!(gate.check(&client, "https://example.com/2025/nota").await.permits());
    }

    #[tokio::test]
    async fn test_gate_caches_per_origin() {
        let client = MockClient::new().with_page("https://example.com/robots.txt", 200, "User-agent: *\n");
        let gate = RobotsGate::new(UA, true);
        for path in ["/a", "/b", "/c"] {
            gate.check(&client, &format!("https://example.com{path}")).await;
        }
        gate.check(&client, "https://other.com/a").await;
        assert_eq!(client.request_count("https://example.com/robots.txt"), 1);
        assert_eq!(client.request_count("https://other.com/robots.txt"), 1);
    }

    #[tokio::test]
    async fn test_gate_missing_robots_allows() {
        let client = MockClient::new();
        let gate = RobotsGate::new(UA, false);
        assert_eq!(
            gate.check(&client, "https://example.com/a").await,
            RobotsVerdict::Allowed
        );
    }

    #[tokio::test]
    async fn test_gate_forbidden_robots_denies() {
        let client = MockClient::new().with_page("https://example.com/robots.txt", 403, "");
        let gate = RobotsGate::new(UA, true);
        assert!(!gate.check(&client, "https://example.com/a").await.permits());
    }

    #[tokio::test]
    async fn test_gate_fail_open_on_transport_error() {
        let client = MockClient::new().with_sequence(
            "https://example.com/robots.txt",
            vec![Err(HttpError::Timeout {
                url: "https://example.com/robots.txt".to_string(),
            })],
        );
        let open = RobotsGate::new(UA, true);
        assert_eq!(
            open.check(&client, "https://example.com/a").await,
            RobotsVerdict::Unavailable { permitted: true }
        );

        let closed = RobotsGate::new(UA, false);
        assert!(!closed.check(&client, "https://example.com/a").await.permits());
    }

    #[tokio::test]
    async fn test_gate_server_error_follows_fail_open_flag() {
        let client = MockClient::new().with_page("https://example.com/robots.txt", 500, "");
        assert!(RobotsGate::new(UA, true).check(&client, "https://example.com/a").await.permits());
        assert!(!RobotsGate::new(UA, false).check(&client, "https://example.com/a").await.permits());
    }
}
