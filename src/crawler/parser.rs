//! HTML parser for extracting crawl targets
//!
//! This module pulls the two target sets out of a rendered page:
//! - anchor targets (from `<a href>`)
//! - image targets (from `<img src>`)

use crate::url::resolve_link;
use scraper::{Html, Selector};
use url::Url;

/// Targets extracted from one rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Absolute anchor targets, in document order
    pub anchors: Vec<Url>,

    /// Absolute image targets, in document order
    pub images: Vec<Url>,
}

/// Parses HTML content and extracts anchor and image targets
///
/// # Extraction Rules
///
/// **Anchors:** every `<a href="...">`, including `rel="nofollow"` and
/// `download` links, since a dead download is still a dead link.
///
/// **Images:** every `<img src="...">`.
///
/// **Dropped:** `javascript:`, `mailto:`, `tel:` and `data:` references,
/// fragment-only links, and anything that does not resolve to http(s).
///
/// Repeated targets are kept; the ledger deduplicates them.
///
/// # Example
///
/// ```
/// use link_ledger::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<a href="/a">A</a><img src="/logo.png">"#;
/// let base_url = Url::parse("https://site.test/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.anchors[0].as_str(), "https://site.test/a");
/// assert_eq!(parsed.images[0].as_str(), "https://site.test/logo.png");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        anchors: extract_attr(&document, "a[href]", "href", base_url),
        images: extract_attr(&document, "img[src]", "src", base_url),
    }
}

/// Anchor targets of a page
pub fn extract_anchors(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    extract_attr(&document, "a[href]", "href", base_url)
}

/// Image targets of a page
pub fn extract_images(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    extract_attr(&document, "img[src]", "src", base_url)
}

fn extract_attr(document: &Html, selector: &str, attr: &str, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .filter_map(|value| resolve_link(value, base_url))
        .collect()
}
