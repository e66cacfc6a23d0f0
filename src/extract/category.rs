use crate::utils::element_text;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static CATEGORY_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["a[rel='category tag']", ".category", ".tag", "[class*='cat']"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static SECTION_META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[property='article:section']").unwrap());

/// Section label, if the page has one. Callers default to "General".
pub fn extract_category(document: &Html) -> Option<String> {
    CATEGORY_SELECTORS
        .iter()
        .find_map(|selector| {
            let text = element_text(&document.select(selector).next()?);
            (!text.is_empty()).then_some(text)
        })
        .or_else(|| {
            let content = document.select(&SECTION_META).next()?.value().attr("content")?.trim();
            (!content.is_empty()).then(|| content.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wordpress_category_link() {
        let doc = Html::parse_document(
            r#"<div class="tag">Lima</div><a rel="category tag" href="/politica">Política</a>"#,
        );
        assert_eq!(extract_category(&doc).as_deref(), Some("Política"));
    }

    #[test]
    fn test_class_fallbacks() {
        let doc = Html::parse_document(r#"<span class="post-cat"> Economía </span>"#);
        assert_eq!(extract_category(&doc).as_deref(), Some("Economía"));
    }

    #[test]
    fn test_section_meta() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="article:section" content="Deportes"></head><body></body></html>"#,
        );
        assert_eq!(extract_category(&doc).as_deref(), Some("Deportes"));
    }

    #[test]
    fn test_empty_element_skipped() {
        let doc = Html::parse_document(r#"<div class="category"></div><span class="tag">Mundo</span>"#);
        assert_eq!(extract_category(&doc).as_deref(), Some("Mundo"));
    }

    #[test]
    fn test_none() {
        assert_eq!(extract_category(&Html::parse_document("<p>texto</p>")), None);
    }
}
