//! URL normalization, hashing and text helpers shared by every stage.
//!
//! - [`normalize_url`] turns a raw `href` into a canonical absolute URL or rejects it
//! - [`url_hash`] gives the content hash used for duplicate suppression
//! - [`element_text`] / [`collapse_whitespace`] reduce markup to visible text
//! - [`truncate_for_log`] and [`ensure_writable_dir`] support logging and output

use scraper::ElementRef;
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Extensions that never point at an HTML document.
pub const DENIED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".pdf", ".doc", ".docx", ".xls", ".xlsx",
    ".ppt", ".pptx", ".zip", ".rar",
];

/// `true` when `href` ends in a denylisted extension (case-insensitive).
pub fn has_denied_extension(href: &str) -> bool {
    let lower = href.trim().to_ascii_lowercase();
    DENIED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Resolve `href` against `base` into a canonical absolute URL.
///
/// Returns `None` for empty hrefs, denylisted extensions, unparseable input
/// and non-HTTP(S) targets such as `mailto:` or `javascript:`. The result
/// never carries a query string or a fragment, and its host is lower-cased.
///
/// # Examples
///
/// ```
/// use newsharvest::utils::normalize_url;
///
/// assert_eq!(
///     normalize_url("https://Example.com/news/", Some("../2025/story?utm=x#top")),
///     Some("https://example.com/2025/story".to_string()),
/// );
/// assert_eq!(normalize_url("https://example.com/", Some("/photo.JPG")), None);
/// ```
pub fn normalize_url(base: &str, href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() || has_denied_extension(href) {
        return None;
    }
    let base = Url::parse(base).ok()?;
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") || resolved.host_str().is_none() {
        return None;
    }
    resolved.set_fragment(None);
    resolved.set_query(None);
    Some(resolved.to_string())
}

/// SHA-256 hex digest of a URL string.
pub fn url_hash(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element with whitespace collapsed. Tags never leak through.
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backing off to a char boundary) with
/// an ellipsis and byte count appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    const BASE: &str = "https://www.example.com/seccion/";

    #[test]
    fn test_normalize_rejects_denied_extensions() {
        for href in [
            "/foto.jpg", "/foto.JPEG", "img.png", "a.gif", "b.webp", "c.svg", "/doc.pdf",
            "x.doc", "x.docx", "x.xls", "x.xlsx", "x.ppt", "x.pptx", "x.zip", "x.rar ",
        ] {
            assert_eq!(normalize_url(BASE, Some(href)), None, "{href}");
        }
    }

    #[test]
    fn test_normalize_rejects_empty_and_missing() {
        assert_eq!(normalize_url(BASE, None), None);
        assert_eq!(normalize_url(BASE, Some("")), None);
        assert_eq!(normalize_url(BASE, Some("   ")), None);
    }

    #[test]
    fn test_normalize_rejects_non_http_schemes() {
        assert_eq!(normalize_url(BASE, Some("mailto:news@example.com")), None);
        assert_eq!(normalize_url(BASE, Some("javascript:void(0)")), None);
        assert_eq!(normalize_url(BASE, Some("tel:+5112345")), None);
    }

    #[test]
    fn test_normalize_strips_query_and_fragment() {
        let hrefs = [
            "/2025/05/nota?utm_source=x",
            "nota#comentarios",
            "https://other.com/a/b?x=1&y=2#frag",
            "?page=2",
            "#top",
        ];
        for href in hrefs {
            let out = normalize_url(BASE, Some(href)).unwrap();
            let parsed = Url::parse(&out).unwrap();
            assert!(parsed.query().is_none(), "{out}");
            assert!(parsed.fragment().is_none(), "{out}");
            assert!(!out.contains('?') && !out.contains('#'), "{out}");
        }
    }

    #[test]
    fn test_normalize_resolves_relative() {
        assert_eq!(
            normalize_url(BASE, Some("nota-uno")),
            Some("https://www.example.com/seccion/nota-uno".to_string())
        );
        assert_eq!(
            normalize_url(BASE, Some("/raiz")),
            Some("https://www.example.com/raiz".to_string())
        );
        assert_eq!(
            normalize_url(BASE, Some("//cdn.example.com/x")),
            Some("https://cdn.example.com/x".to_string())
        );
    }

    #[test]
    fn test_url_hash_is_stable_hex() {
        let a = url_hash("https://example.com/a");
        assert_eq!(a.len(), 64);
        assert_eq!(a, url_hash("https://example.com/a"));
        assert_ne!(a, url_hash("https://example.com/b"));
    }

    #[test]
    fn test_element_text_strips_markup() {
        let html = Html::parse_fragment("<p>Hola <b>mundo</b>\n  <i>cruel</i></p>");
        let p = Selector::parse("p").unwrap();
        let el = html.select(&p).next().unwrap();
        assert_eq!(element_text(&el), "Hola mundo cruel");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "ñññññ";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with('ñ'));
    }
}
