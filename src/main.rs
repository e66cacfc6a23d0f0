//! # newsharvest
//!
//! Harvests news articles from a catalogue of sites and stores the validated,
//! deduplicated results as JSON.
//!
//! ## Usage
//!
//! ```sh
//! newsharvest -c config.yaml -o ./output
//! newsharvest --url https://andina.pe/ --interval-secs 1800
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: YAML file, then command-line overrides, then validation
//! 2. **Selection**: `--url`/`--source` pick the sites; `--role` filters them
//!    through the permission table
//! 3. **Harvest**: one [`Orchestrator`] per batch, sources processed in order
//! 4. **Output**: each source's articles are saved to the JSON store as soon as
//!    it finishes, followed by a one-line summary
//!
//! With `--interval-secs` the batch repeats until Ctrl-C, which also cancels a
//! batch in flight.

use clap::Parser;
use newsharvest::auth::{RolePermissions, SourcePolicy};
use newsharvest::config::ScrapeConfig;
use newsharvest::http::{HostThrottle, ReqwestClient};
use newsharvest::models::SourceSite;
use newsharvest::orchestrator::Orchestrator;
use newsharvest::store::{ArticleStore, JsonFileStore};
use newsharvest::utils::{ensure_writable_dir, truncate_for_log};
use std::error::Error;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("newsharvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => ScrapeConfig::load(path)?,
        None => ScrapeConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    // ---- Source selection ----
    let mut sites = args.selected_sources(&config);
    if let Some(role) = &args.role {
        let before = sites.len();
        sites = RolePermissions::from_config(&config).permitted_sources(role, &sites);
        info!(%role, permitted = sites.len(), requested = before, "Applied role permissions");
    }
    if sites.is_empty() {
        warn!("No sources to scrape");
        return Ok(());
    }

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    let store = JsonFileStore::in_dir(&args.output_dir);

    // ---- Cancellation on Ctrl-C ----
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing in-flight work");
                cancel.cancel();
            }
        });
    }

    loop {
        run_batch(&config, &sites, &store, cancel.clone()).await?;

        let Some(secs) = args.interval_secs else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }
        info!(secs, "Sleeping until next batch");
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
        }
    }

    info!("newsharvest finished");
    Ok(())
}

/// Harvest every site once and persist the results.
#[instrument(level = "info", skip_all, fields(sources = sites.len()))]
async fn run_batch(
    config: &ScrapeConfig,
    sites: &[SourceSite],
    store: &JsonFileStore,
    cancel: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let client = HostThrottle::from_settings(ReqwestClient::new(&config.http)?, &config.http);
    let orchestrator = Orchestrator::new(client, config.clone()).with_cancellation(cancel);

    let mut total_valid = 0usize;
    let mut total_inserted = 0usize;
    for site in sites {
        if orchestrator.is_cancelled() {
            break;
        }
        let result = orchestrator
            .scrape_source(site, |pct, msg| debug!(source = %site.name, pct, msg, "Progress"))
            .await;

        let inserted = store.save(&result.articles).await?;
        total_valid += result.run.valid_article_count;
        total_inserted += inserted;

        for e in &result.run.errors {
            debug!(source = %site.name, error = %truncate_for_log(e, 300), "Discovery problem");
        }
        info!(
            source = %site.name,
            status = ?result.run.status,
            discovered = result.run.discovered_url_count,
            fetched = result.run.fetched_count,
            valid = result.run.valid_article_count,
            inserted,
            duration_ms = result.run.duration.as_millis() as u64,
            "Source summary"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        valid = total_valid,
        inserted = total_inserted,
        store = %store.path().display(),
        "Batch complete"
    );
    Ok(())
}
