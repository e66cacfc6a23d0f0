//! Field extraction from a fetched article page.
//!
//! Each field has its own module with an ordered list of strategies; the first
//! valid value wins and a documented default applies otherwise:
//!
//! | Field | Module | Default |
//! |-------|--------|---------|
//! | Title | [`title`] | reject the page |
//! | Body | [`body`] | reject the page |
//! | Date | [`date`] | extraction time (UTC) |
//! | Category | [`category`] | `"General"` |
//! | Image | [`image`] | none |
//!
//! All text is visible text only with whitespace collapsed. Extraction never
//! panics on malformed markup; `scraper` repairs whatever it is given.

pub mod body;
pub mod category;
pub mod date;
pub mod image;
pub mod title;

use crate::error::ExtractError;
use crate::models::ArticleRecord;
use chrono::Utc;
use scraper::Html;
use tracing::{debug, instrument};

pub use body::extract_body;
pub use category::extract_category;
pub use date::{extract_published, parse_timestamp};
pub use image::extract_image;
pub use title::extract_title;

/// Run every field extractor over `html` fetched from `url`.
///
/// Returns the validated record, or the first reason the page cannot be one.
#[instrument(level = "debug", skip(html), fields(bytes = html.len()))]
pub fn extract_article(html: &str, url: &str) -> Result<ArticleRecord, ExtractError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document).ok_or(ExtractError::MissingTitle)?;
    let body = extract_body(&document)?;
    let published = extract_published(&document).unwrap_or_else(Utc::now);
    let category = extract_category(&document);
    let image = extract_image(&document, url);

    let record = ArticleRecord::new(&title, Some(published), category, &body, image, url)?;
    debug!(title = %record.title, category = %record.category, "Extracted article");
    Ok(record)
}
