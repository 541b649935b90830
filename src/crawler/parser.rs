//! HTML parser for client-side redirects
//!
//! A browser follows `<meta http-equiv="refresh" content="0; url=...">` as
//! part of loading a page; this module finds such redirects so the HTTP
//! fetcher can do the same.

use scraper::{Html, Selector};
use url::Url;

/// Refreshes scheduled later than this are treated as periodic reloads
const MAX_REFRESH_DELAY_SECS: u64 = 5;

/// Returns the target of an immediate meta refresh redirect, if the page has one
///
/// # Arguments
///
/// * `html` - The HTML content to inspect
/// * `base_url` - The URL the page was loaded from, for resolving relative targets
///
/// # Example
///
/// ```
/// use https_parity::crawler::extract_meta_refresh;
/// use url::Url;
///
/// let html = r#"<html><head><meta http-equiv="refresh" content="0; url=/home"></head></html>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let target = extract_meta_refresh(html, &base).unwrap();
/// assert_eq!(target.as_str(), "https://example.com/home");
/// ```
pub fn extract_meta_refresh(html: &str, base_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[http-equiv][content]").ok()?;

    document
        .select(&selector)
        .filter(|element| {
            element
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|element| element.value().attr("content"))
        .filter_map(parse_refresh_content)
        .filter(|(delay, _)| *delay <= MAX_REFRESH_DELAY_SECS)
        .filter_map(|(_, target)| base_url.join(target?).ok())
        .find(|target| {
            matches!(target.scheme(), "http" | "https") && target.as_str() != base_url.as_str()
        })
}

/// Splits a refresh `content` value into its delay and optional target
fn parse_refresh_content(content: &str) -> Option<(u64, Option<&str>)> {
    let content = content.trim();
    let (delay, rest) = match content.find(|c| c == ';' || c == ',') {
        Some(i) => (&content[..i], Some(&content[i + 1..])),
        None => (content, None),
    };

    let delay = delay.trim().split('.').next()?.parse::<u64>().ok()?;

    let target = rest.map(str::trim).and_then(|rest| {
        let rest = match rest.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("url=") => &rest[4..],
            _ => rest,
        };
        let rest = rest.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        (!rest.is_empty()).then_some(rest)
    });

    Some((delay, target))
}
