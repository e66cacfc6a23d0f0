//! HTTP transport.
//!
//! Every network call in the pipeline goes through [`HttpClient`], so the
//! discovery strategies, robots gate and fetcher can run against an in-memory
//! client in tests. [`ReqwestClient`] is the real transport and
//! [`HostThrottle`] wraps any client with a per-host token bucket.

use crate::config::HttpSettings;
use crate::error::{ConfigError, HttpError};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument, trace};
use url::Url;

/// Status and decoded body of one GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx or 3xx.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// 429 Too Many Requests or 503 Service Unavailable.
    pub fn is_throttled(&self) -> bool {
        matches!(self.status, 429 | 503)
    }
}

/// Minimal async GET client.
pub trait HttpClient {
    /// Issue a GET and return the status and body. Only transport failures are
    /// errors; any HTTP status is a successful response.
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

impl<T: HttpClient> HttpClient for Arc<T> {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.as_ref().get(url).await
    }
}

/// `reqwest`-backed client carrying the configured User-Agent,
/// Accept-Language and timeout on every request.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let lang = HeaderValue::from_str(&settings.accept_language)
            .map_err(|e| ConfigError::Invalid(format!("accept_language: {e}")))?;
        headers.insert(ACCEPT_LANGUAGE, lang);

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| HttpError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        trace!(status, bytes = body.len(), "GET complete");
        Ok(HttpResponse { status, body })
    }
}

fn classify_reqwest_error(url: &str, e: reqwest::Error) -> HttpError {
    let url = url.to_string();
    if e.is_timeout() {
        HttpError::Timeout { url }
    } else if e.is_connect() {
        HttpError::Connect {
            url,
            reason: e.to_string(),
        }
    } else {
        HttpError::Request {
            url,
            reason: e.to_string(),
        }
    }
}

/// Token bucket per remote host, shared by every request that goes through
/// the wrapped client (discovery, sitemap recursion, robots and articles).
pub struct HostThrottle<C> {
    inner: C,
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl<C: HttpClient> HostThrottle<C> {
    /// `requests_per_second == 0` disables throttling.
    pub fn new(inner: C, requests_per_second: u32, burst: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_second).map(|rps| {
            let burst = NonZeroU32::new(burst).unwrap_or(rps);
            Arc::new(RateLimiter::keyed(Quota::per_second(rps).allow_burst(burst)))
        });
        Self { inner, limiter }
    }

    pub fn from_settings(inner: C, settings: &HttpSettings) -> Self {
        Self::new(inner, settings.per_host_requests_per_second, settings.per_host_burst)
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}

impl<C: HttpClient> HttpClient for HostThrottle<C> {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        if let Some(limiter) = &self.limiter {
            let host = Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default();
            if limiter.check_key(&host).is_err() {
                debug!(%host, "Per-host rate limit reached; waiting");
                limiter.until_key_ready(&host).await;
            }
        }
        self.inner.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;

    #[test]
    fn test_response_classification() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(HttpResponse::new(429, "").is_throttled());
        assert!(HttpResponse::new(503, "").is_throttled());
        assert!(!HttpResponse::new(500, "").is_throttled());
    }

    #[test]
    fn test_reqwest_client_builds_from_defaults() {
        assert!(ReqwestClient::new(&HttpSettings::default()).is_ok());
    }

    #[test]
    fn test_reqwest_client_rejects_bad_header() {
        let settings = HttpSettings {
            accept_language: "es\nen".to_string(),
            ..HttpSettings::default()
        };
        assert!(ReqwestClient::new(&settings).is_err());
    }

    #[tokio::test]
    async fn test_throttle_disabled_passes_through() {
        let mock = MockClient::new().with_page("https://a.com/x", 200, "ok");
        let client = HostThrottle::new(mock, 0, 0);
        assert!(!client.is_enabled());
        let resp = client.get("https://a.com/x").await.unwrap();
        assert_eq!(resp.body, "ok");
    }

    #[tokio::test]
    async fn test_throttle_within_burst_forwards_every_request() {
        let mock = Arc::new(
            MockClient::new()
                .with_page("https://a.com/1", 200, "1")
                .with_page("https://b.com/1", 200, "2"),
        );
        let client = HostThrottle::new(Arc::clone(&mock), 100, 10);
        assert!(client.is_enabled());
        for _ in 0..3 {
            client.get("https://a.com/1").await.unwrap();
        }
        client.get("https://b.com/1").await.unwrap();
        assert_eq!(mock.request_count("https://a.com/1"), 3);
        assert_eq!(mock.request_count("https://b.com/1"), 1);
    }
}
