use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static IMG_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["img.wp-post-image", ".featured-image img", ".post-thumbnail img", "article img"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static META_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "meta[property='og:image']",
        "meta[name='og:image']",
        "meta[name='twitter:image']",
        "meta[property='twitter:image']",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

fn resolve(page_url: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let resolved = page_url.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Lead image of the article as an absolute URL.
pub fn extract_image(document: &Html, page_url: &str) -> Option<String> {
    let page_url = Url::parse(page_url).ok()?;
    let from_img = IMG_SELECTORS.iter().find_map(|selector| {
        let src = document.select(selector).next()?.value().attr("src")?;
        resolve(&page_url, src)
    });
    from_img.or_else(|| {
        META_SELECTORS.iter().find_map(|selector| {
            let content = document.select(selector).next()?.value().attr("content")?;
            resolve(&page_url, content)
        })
    })
}
