//! Main body text.
//!
//! Candidates are tried in order and the first one longer than
//! [`MIN_BODY_CHARS`] wins:
//!
//! 1. paragraphs inside `<article>`
//! 2. paragraphs of the first content container that exists
//! 3. the first ten paragraphs of the page
//!
//! When nothing clears the floor, the longest candidate decides the error: a
//! partial body (more than [`PARTIAL_BODY_CHARS`]) is reported with its length,
//! anything shorter counts as no body at all.

use crate::error::ExtractError;
use crate::models::MIN_BODY_CHARS;
use crate::utils::element_text;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

pub const PARTIAL_BODY_CHARS: usize = 50;
const FALLBACK_PARAGRAPHS: usize = 10;

static ARTICLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".entry-content", ".post-content", ".article-content", ".content", "#content"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>) -> String {
    paragraphs
        .map(|p| element_text(&p))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn candidates(document: &Html) -> impl Iterator<Item = String> + '_ {
    let article = document
        .select(&ARTICLE_SELECTOR)
        .next()
        .map(|a| join_paragraphs(a.select(&PARAGRAPH_SELECTOR)));
    let container = CONTAINER_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(|c| join_paragraphs(c.select(&PARAGRAPH_SELECTOR)));
    let page = std::iter::once_with(|| {
        join_paragraphs(document.select(&PARAGRAPH_SELECTOR).take(FALLBACK_PARAGRAPHS))
    });
    article.into_iter().chain(container).chain(page)
}

pub fn extract_body(document: &Html) -> Result<String, ExtractError> {
    let mut longest = 0;
    for text in candidates(document) {
        let len = text.chars().count();
        if len > MIN_BODY_CHARS {
            return Ok(text);
        }
        longest = longest.max(len);
    }
    if longest > PARTIAL_BODY_CHARS {
        Err(ExtractError::BodyTooShort {
            len: longest,
            min: MIN_BODY_CHARS,
        })
    } else {
        Err(ExtractError::MissingBody)
    }
}
