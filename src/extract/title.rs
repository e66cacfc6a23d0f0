use crate::utils::element_text;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// A candidate needs more than this many characters.
pub const TITLE_CANDIDATE_CHARS: usize = 10;

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h1", ".entry-title", ".post-title", "[class*='title']", "title"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// First selector whose first match has a usable headline.
pub fn extract_title(document: &Html) -> Option<String> {
    TITLE_SELECTORS.iter().find_map(|selector| {
        let text = element_text(&document.select(selector).next()?);
        (text.chars().count() > TITLE_CANDIDATE_CHARS).then_some(text)
    })
}
