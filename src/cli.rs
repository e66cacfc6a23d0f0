//! Command-line interface definitions for newsharvest.
//!
//! Every option can also be supplied through an environment variable. Values
//! given here override the YAML configuration file.

use clap::Parser;
use newsharvest::config::ScrapeConfig;
use newsharvest::models::SourceSite;
use url::Url;

/// Command-line arguments for the newsharvest binary.
///
/// # Examples
///
/// ```sh
/// # Scrape the built-in catalogue once
/// newsharvest -o ./output
///
/// # Scrape one site with a smaller budget
/// newsharvest --url https://andina.pe/ --max-links 100
///
/// # Only the sources an editor may request, every 30 minutes
/// newsharvest -c config.yaml --role editor --interval-secs 1800
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, env = "NEWSHARVEST_CONFIG")]
    pub config: Option<String>,

    /// Scrape this base URL instead of the catalogue (repeatable)
    #[arg(short, long = "url")]
    pub urls: Vec<String>,

    /// Only scrape catalogue sources with this name (repeatable)
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    /// Role requesting the batch; sources it may not request are dropped
    #[arg(short, long, env = "NEWSHARVEST_ROLE")]
    pub role: Option<String>,

    /// Output directory for the article store
    #[arg(short, long = "output", env = "NEWSHARVEST_OUTPUT_DIR", default_value = "./output")]
    pub output_dir: String,

    /// Cap on article URLs dispatched per source
    #[arg(long, env = "NEWSHARVEST_MAX_LINKS")]
    pub max_links: Option<usize>,

    /// Highest listing page index probed
    #[arg(long, env = "NEWSHARVEST_MAX_PAGES")]
    pub max_pages: Option<usize>,

    /// Concurrent article fetches per source
    #[arg(long, env = "NEWSHARVEST_MAX_WORKERS")]
    pub max_workers: Option<usize>,

    /// Repeat the batch every N seconds (at least 1) until interrupted
    #[arg(long, env = "NEWSHARVEST_INTERVAL_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,
}

impl Cli {
    /// Apply command-line limits on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut ScrapeConfig) {
        if let Some(n) = self.max_links {
            config.limits.max_links = n;
        }
        if let Some(n) = self.max_pages {
            config.limits.max_pages = n;
        }
        if let Some(n) = self.max_workers {
            config.limits.max_workers = n;
        }
    }

    /// Sites for this run: explicit `--url`s, else the catalogue narrowed by
    /// `--source` names (case-insensitive).
    pub fn selected_sources(&self, config: &ScrapeConfig) -> Vec<SourceSite> {
        if !self.urls.is_empty() {
            return self
                .urls
                .iter()
                .map(|u| {
                    let name = Url::parse(u)
                        .ok()
                        .and_then(|p| p.host_str().map(|h| h.trim_start_matches("www.").to_string()))
                        .unwrap_or_else(|| u.clone());
                    SourceSite::new(name, u.clone())
                })
                .collect();
        }
        let catalog = config.source_catalog();
        if self.sources.is_empty() {
            return catalog;
        }
        catalog
            .into_iter()
            .filter(|site| self.sources.iter().any(|s| s.eq_ignore_ascii_case(&site.name)))
            .collect()
    }
}
