//! In-memory HTTP client and page fixtures for tests.
//!
//! [`MockClient`] serves scripted responses per URL. A URL can be given a
//! sequence of responses (the last one repeats); unknown URLs answer 404.
//! Every request is recorded with the tokio clock so tests running with a
//! paused clock can assert on backoff timing.

use crate::error::HttpError;
use crate::http::{HttpClient, HttpResponse};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

type Scripted = Result<HttpResponse, HttpError>;

#[derive(Default)]
pub struct MockClient {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for every GET of `url`.
    pub fn with_page(self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.with_sequence(url, vec![Ok(HttpResponse::new(status, body))])
    }

    /// Serve the given responses in order; the last one repeats.
    pub fn with_sequence(self, url: &str, responses: Vec<Scripted>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into_iter().collect());
        self
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Instants at which `url` was requested, in order.
    pub fn request_times(&self, url: &str) -> Vec<Instant> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, t)| *t)
            .collect()
    }
}

impl HttpClient for MockClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push((url.to_string(), Instant::now()));
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, ""))),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

/// A paragraph of roughly `len` characters of plausible text.
pub fn filler(len: usize) -> String {
    let words = "la municipalidad anunció nuevas obras de infraestructura para el distrito ";
    words.chars().cycle().take(len).collect::<String>().trim().to_string()
}

/// A complete article page with an `<h1>`, an `<article>` body and a date.
pub fn article_page(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html><head><title>{title} | Diario</title>
<meta property="article:published_time" content="2025-05-06T14:30:00-05:00">
</head>
<body>
<nav><a href="/">Inicio</a></nav>
<h1>{title}</h1>
<article><p>{body}</p></article>
</body></html>"#
    )
}

/// A `<urlset>` sitemap listing `urls`.
pub fn sitemap(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{u}</loc><lastmod>2025-05-06</lastmod></url>\n"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{entries}</urlset>"#
    )
}
