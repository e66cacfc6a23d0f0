//! Publication date.
//!
//! The first `<time>` element is tried (its non-blank `datetime` attribute,
//! else its text), then the usual publication meta tags. Offsets are normalised to UTC
//! and naive timestamps are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::utils::element_text;

static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());

static META_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "meta[property='article:published_time']",
        "meta[name='article:published_time']",
        "meta[name='pubdate']",
        "meta[name='date']",
        "meta[itemprop='datePublished']",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const SPANISH_MONTHS: &[&str] = &[
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

// "6 de mayo de 2025", "06 de Mayo del 2025"
static SPANISH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s+de\s+([a-záéíóú]+)\s+(?:de|del)\s+(\d{4})\b").unwrap());

fn parse_spanish_date(raw: &str) -> Option<NaiveDate> {
    let caps = SPANISH_DATE.captures(raw)?;
    let month_name = caps[2].to_lowercase();
    let month = match month_name.as_str() {
        "setiembre" => 9,
        name => SPANISH_MONTHS.iter().position(|m| *m == name)? as u32 + 1,
    };
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[1].parse().ok()?)
}

/// Parse the date formats news sites commonly emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // ISO 8601 with a compact offset such as +0500
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    parse_spanish_date(raw)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Publication date if the page declares a parseable one.
pub fn extract_published(document: &Html) -> Option<DateTime<Utc>> {
    if let Some(time) = document.select(&TIME_SELECTOR).next() {
        let raw = time
            .value()
            .attr("datetime")
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| element_text(&time));
        if let Some(dt) = parse_timestamp(&raw) {
            return Some(dt);
        }
    }
    META_SELECTORS.iter().find_map(|selector| {
        let content = document.select(selector).next()?.value().attr("content")?;
        parse_timestamp(content)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_timestamp("Tue, 06 May 2025 14:30:00 -0500"), Some(utc(2025, 5, 6, 19, 30)));
        assert_eq!(parse_timestamp("2025-05-06T14:30:00-05:00"), Some(utc(2025, 5, 6, 19, 30)));
        assert_eq!(parse_timestamp("2025-05-06T14:30:00Z"), Some(utc(2025, 5, 6, 14, 30)));
        assert_eq!(parse_timestamp("2025-05-06 14:30:00"), Some(utc(2025, 5, 6, 14, 30)));
        assert_eq!(parse_timestamp("2025-05-06"), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("06/05/2025"), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("hace 3 horas"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_parse_fractional_seconds_with_compact_offset() {
        assert_eq!(parse_timestamp("2025-05-06T14:30:00.000+0500"), Some(utc(2025, 5, 6, 9, 30)));
        assert_eq!(parse_timestamp("2025-05-06 14:30:00 -0500"), Some(utc(2025, 5, 6, 19, 30)));
    }

    #[test]
    fn test_parse_month_names() {
        assert_eq!(parse_timestamp("May 6, 2025"), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("Sep 21, 2025"), Some(utc(2025, 9, 21, 0, 0)));
        assert_eq!(parse_timestamp("06 May 2025"), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("6 December 2025"), Some(utc(2025, 12, 6, 0, 0)));
    }

    #[test]
    fn test_parse_spanish_long_dates() {
        assert_eq!(parse_timestamp("6 de mayo de 2025"), Some(utc(2025, 5, 6, 0, 0)));
        assert_eq!(parse_timestamp("Lima, 21 de Setiembre del 2025"), Some(utc(2025, 9, 21, 0, 0)));
        assert_eq!(parse_timestamp("31 de febrero de 2025"), None);
        assert_eq!(parse_timestamp("6 de brumario de 2025"), None);
    }

    #[test]
    fn test_time_empty_attribute_falls_back_to_text() {
        let doc = Html::parse_document(r#"<p><time datetime="">2025-05-06 08:15:00</time></p>"#);
        assert_eq!(extract_published(&doc), Some(utc(2025, 5, 6, 8, 15)));
        let doc = Html::parse_document(r#"<p><time datetime="  ">6 de mayo de 2025</time></p>"#);
        assert_eq!(extract_published(&doc), Some(utc(2025, 5, 6, 0, 0)));
    }

    #[test]
    fn test_time_datetime_attribute() {
        let doc = Html::parse_document(r#"<p><time datetime="2025-05-06T10:00:00Z">6 de mayo</time></p>"#);
        assert_eq!(extract_published(&doc), Some(utc(2025, 5, 6, 10, 0)));
    }

    #[test]
    fn test_time_text_when_no_attribute() {
        let doc = Html::parse_document("<p><time> 2025-05-06 08:15:00 </time></p>");
        assert_eq!(extract_published(&doc), Some(utc(2025, 5, 6, 8, 15)));
    }

    #[test]
    fn test_unparseable_time_falls_back_to_meta() {
        let doc = Html::parse_document(
            r#"<html><head><meta itemprop="datePublished" content="2025-05-01"></head>
            <body><time>ayer</time></body></html>"#,
        );
        assert_eq!(extract_published(&doc), Some(utc(2025, 5, 1, 0, 0)));
    }

    #[test]
    fn test_no_date() {
        let doc = Html::parse_document("<p>sin fecha</p>");
        assert_eq!(extract_published(&doc), None);
    }
}
