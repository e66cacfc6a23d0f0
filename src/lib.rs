//! # newsharvest
//!
//! Discovers and extracts news articles from arbitrary news sites without any
//! per-site integration, then persists deduplicated, validated records.
//!
//! ## Pipeline
//!
//! 1. **Discovery**: RSS/Atom feeds, the homepage, listing pagination and XML
//!    sitemaps each produce candidate URLs ([`scrapers`])
//! 2. **Classification**: URL heuristics decide what looks like an article
//!    ([`classifier`])
//! 3. **Fetching**: robots.txt is honoured ([`robots`]) and pages are fetched
//!    with bounded retries ([`fetch`]) over a per-host throttled client ([`http`])
//! 4. **Extraction**: title, date, category, body and image ([`extract`])
//! 5. **Persistence**: idempotent on title ([`store`])
//!
//! [`orchestrator::Orchestrator`] ties the stages together per source.

pub mod auth;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod http;
pub mod models;
pub mod orchestrator;
pub mod robots;
pub mod scrapers;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;
