//! Typed errors for the harvesting pipeline.
//!
//! Every failure the pipeline can hit is a distinct variant so callers and
//! tests can tell a transient network problem from a validation reject or a
//! robots denial. Only [`ConfigError`] and [`StoreError`] are meant to stop a
//! run; everything else is absorbed by the orchestrator and counted.

use thiserror::Error;

/// Transport-level failures from the HTTP layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("connection failed: {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("request failed: {url}: {reason}")]
    Request { url: String, reason: String },

    #[error("failed reading body: {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Failures returned by the retrying fetcher once its budget is spent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The server kept answering 429/503.
    #[error("throttled with HTTP {status} after {attempts} attempts")]
    Throttled { status: u16, attempts: u32 },

    /// Any other non-2xx/3xx status on the final attempt.
    #[error("HTTP {status} after {attempts} attempts")]
    Status { status: u16, attempts: u32 },

    #[error("transport error after {attempts} attempts: {source}")]
    Transport {
        #[source]
        source: HttpError,
        attempts: u32,
    },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// `true` for failures a later run might not see again.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Throttled { .. } | FetchError::Transport { .. })
    }
}

/// Problems a discovery strategy ran into. Recorded, never propagated: the
/// strategy still returns whatever it collected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("{url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("{url}: malformed document: {reason}")]
    Malformed { url: String, reason: String },

    #[error("invalid base url: {url}")]
    InvalidBase { url: String },
}

/// Why a fetched document did not become an article.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no title candidate found")]
    MissingTitle,

    #[error("title too short ({len} chars, need {min})")]
    TitleTooShort { len: usize, min: usize },

    #[error("no body text found")]
    MissingBody,

    /// Something was found but it is below the acceptance floor.
    #[error("body too short ({len} chars, need more than {min})")]
    BodyTooShort { len: usize, min: usize },

    #[error("source url is not absolute: {url}")]
    InvalidSourceUrl { url: String },
}

/// Configuration problems are fatal to the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Persistence gateway failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
