//! Per-source orchestration: discovery, deduplication and the bounded
//! fetch+extract pool.
//!
//! # Pipeline
//!
//! ```text
//! SourceSite ──► RSS ─┐
//!            ──► Homepage ─┤  union, dedupe (string + hash),
//!            ──► Pagination ─┤  truncate to max_links
//!            ──► Sitemap ─┘
//!                         │
//!                         ▼
//!        buffer_unordered(max_workers) of
//!        seen-set ─► robots ─► fetch (retry) ─► extract
//!                         │
//!                         ▼
//!                  SourceScrape { run, articles }
//! ```
//!
//! # Progress
//!
//! The callback receives a monotonically increasing percentage: 5, 15, 35 and
//! 55 as each discovery strategy starts, `60 + done * 40 / total` after every
//! finished task, and a final 100.

use crate::classifier::ArticleClassifier;
use crate::config::ScrapeConfig;
use crate::error::{ExtractError, FetchError};
use crate::extract::extract_article;
use crate::fetch::Fetcher;
use crate::http::HttpClient;
use crate::models::{ArticleRecord, RunStatus, ScrapeRun, SourceScrape, SourceSite};
use crate::robots::RobotsGate;
use crate::scrapers::{Discovery, DiscoveryContext, Strategy, run_strategy};
use crate::utils::{has_denied_extension, url_hash};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Hashes of URLs already dispatched during one source run.
#[derive(Debug, Default)]
pub struct SeenSet(Mutex<HashSet<String>>);

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url`. Returns `false` when it had been seen before.
    pub fn insert(&self, url: &str) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url_hash(url))
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happened to one dispatched URL.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Article(ArticleRecord),
    /// Already handled earlier in this run.
    Duplicate,
    RobotsDenied,
    FetchFailed(FetchError),
    /// Fetched, but not an article.
    Rejected(ExtractError),
    Cancelled,
}

fn phase_percent(strategy: Strategy) -> u8 {
    match strategy {
        Strategy::Rss => 5,
        Strategy::Homepage => 15,
        Strategy::Pagination => 35,
        Strategy::Sitemap => 55,
    }
}

fn phase_message(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Rss => "searching feeds",
        Strategy::Homepage => "scanning homepage",
        Strategy::Pagination => "walking listing pages",
        Strategy::Sitemap => "reading sitemap",
    }
}

/// Union the strategies' results in order, drop exact and hash duplicates and
/// non-document URLs, then keep at most `max_links`.
pub fn merge_candidates(discoveries: &[Discovery], max_links: usize) -> Vec<String> {
    let mut hashes = HashSet::new();
    discoveries
        .iter()
        .flat_map(|d| d.urls.iter())
        .unique()
        .filter(|url| !has_denied_extension(url))
        .filter(|url| hashes.insert(url_hash(url)))
        .take(max_links)
        .cloned()
        .collect()
}

/// Drives discovery and extraction for one or more sources.
///
/// The robots cache lives as long as the orchestrator, so a fresh one should
/// be built for every batch.
pub struct Orchestrator<C> {
    client: C,
    config: ScrapeConfig,
    classifier: ArticleClassifier,
    robots: RobotsGate,
    cancel: CancellationToken,
}

impl<C: HttpClient> Orchestrator<C> {
    pub fn new(client: C, config: ScrapeConfig) -> Self {
        let classifier = ArticleClassifier::from_config(&config);
        let robots = RobotsGate::new(config.http.user_agent.clone(), config.http.robots_fail_open);
        Self {
            client,
            config,
            classifier,
            robots,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop dispatching and retrying once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run every discovery strategy in order and return their raw results.
    pub async fn discover(&self, base_url: &str, progress: &mut impl FnMut(u8, &str)) -> Vec<Discovery> {
        let ctx = DiscoveryContext {
            client: &self.client,
            classifier: &self.classifier,
            policy: &self.config.classifier,
            limits: &self.config.limits,
            cancel: &self.cancel,
        };
        let mut discoveries = Vec::with_capacity(Strategy::ALL.len());
        for strategy in Strategy::ALL {
            progress(phase_percent(strategy), phase_message(strategy));
            let discovery = run_strategy(strategy, ctx, base_url).await;
            debug!(%strategy, count = discovery.len(), errors = discovery.errors.len(), "Strategy done");
            discoveries.push(discovery);
        }
        discoveries
    }

    /// Discover, fetch and extract the articles of one source.
    #[instrument(level = "info", skip_all, fields(source = %site.name, base_url = %site.base_url))]
    pub async fn scrape_source(&self, site: &SourceSite, mut progress: impl FnMut(u8, &str)) -> SourceScrape {
        let t0 = Instant::now();
        let mut run = ScrapeRun::new(site);

        let discoveries = self.discover(&site.base_url, &mut progress).await;
        for d in &discoveries {
            run.errors
                .extend(d.errors.iter().map(|e| format!("{}: {e}", d.strategy)));
        }
        let urls = merge_candidates(&discoveries, self.config.limits.max_links);
        run.discovered_url_count = urls.len();
        info!(
            discovered = urls.len(),
            per_strategy = ?discoveries.iter().map(|d| (d.strategy.label(), d.len())).collect::<Vec<_>>(),
            "Discovery complete"
        );

        if urls.is_empty() {
            run.status = if self.cancel.is_cancelled() {
                RunStatus::Cancelled
            } else {
                RunStatus::NoArticlesFound
            };
            run.duration = t0.elapsed();
            progress(100, "no articles found");
            return SourceScrape {
                run,
                articles: Vec::new(),
            };
        }

        progress(60, "fetching articles");
        let articles = self.fetch_all(&urls, &mut run, &mut progress).await;

        if self.cancel.is_cancelled() {
            run.status = RunStatus::Cancelled;
        }
        run.duration = t0.elapsed();
        progress(100, "done");
        info!(
            discovered = run.discovered_url_count,
            fetched = run.fetched_count,
            valid = run.valid_article_count,
            robots_denied = run.robots_denied_count,
            failed = run.failed_fetch_count,
            rejected = run.rejected_count,
            elapsed_ms = run.duration.as_millis() as u64,
            "Source finished"
        );
        SourceScrape { run, articles }
    }

    /// Process `sites` one after the other. Progress is reported per source.
    pub async fn scrape_sources(
        &self,
        sites: &[SourceSite],
        mut progress: impl FnMut(&SourceSite, u8, &str),
    ) -> Vec<SourceScrape> {
        let mut results = Vec::with_capacity(sites.len());
        for site in sites {
            if self.cancel.is_cancelled() {
                warn!(source = %site.name, "Cancelled; skipping remaining sources");
                break;
            }
            results.push(self.scrape_source(site, |pct, msg| progress(site, pct, msg)).await);
        }
        results
    }

    /// Dispatch one task per URL over a pool of `max_workers`, tallying the
    /// outcomes into `run`.
    async fn fetch_all(
        &self,
        urls: &[String],
        run: &mut ScrapeRun,
        progress: &mut impl FnMut(u8, &str),
    ) -> Vec<ArticleRecord> {
        let seen = SeenSet::new();
        let fetcher = Fetcher::new(&self.client, self.config.retry.clone());
        let total = urls.len();
        let workers = self.config.limits.max_workers.max(1);

        let mut outcomes = stream::iter(urls)
            .map(|url| self.run_task(url, &seen, &fetcher))
            .buffer_unordered(workers);

        let mut articles = Vec::new();
        let mut done = 0usize;
        while let Some(outcome) = outcomes.next().await {
            done += 1;
            match outcome {
                TaskOutcome::Article(record) => {
                    run.fetched_count += 1;
                    run.valid_article_count += 1;
                    articles.push(record);
                }
                TaskOutcome::Rejected(_) => {
                    run.fetched_count += 1;
                    run.rejected_count += 1;
                }
                TaskOutcome::RobotsDenied => run.robots_denied_count += 1,
                TaskOutcome::FetchFailed(_) => run.failed_fetch_count += 1,
                TaskOutcome::Duplicate | TaskOutcome::Cancelled => {}
            }
            let pct = 60 + (done * 40 / total) as u8;
            progress(pct.min(99), &format!("{done}/{total} processed"));
        }
        articles
    }

    /// Seen-set, robots gate, fetch, extract.
    pub async fn run_task(&self, url: &str, seen: &SeenSet, fetcher: &Fetcher<'_, C>) -> TaskOutcome {
        if self.cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        if !seen.insert(url) {
            debug!(%url, "Already dispatched");
            return TaskOutcome::Duplicate;
        }
        if !self.robots.check(&self.client, url).await.permits() {
            return TaskOutcome::RobotsDenied;
        }
        let resp = match fetcher.fetch(url, &self.cancel).await {
            Ok(resp) => resp,
            Err(FetchError::Cancelled) => return TaskOutcome::Cancelled,
            Err(e) => {
                warn!(%url, error = %e, "Article fetch failed");
                return TaskOutcome::FetchFailed(e);
            }
        };
        match extract_article(&resp.body, url) {
            Ok(record) => TaskOutcome::Article(record),
            Err(e) => {
                debug!(%url, reason = %e, "Not an article");
                TaskOutcome::Rejected(e)
            }
        }
    }
}
