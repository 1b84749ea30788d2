use crate::UrlError;
use url::Url;

/// Normalizes a URL into the form used as a ledger key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but http and https
/// 3. Reject URLs without a host
/// 4. Remove the fragment (everything after #)
///
/// Hosts come out lowercase from parsing. Paths, queries and trailing
/// slashes are left alone: two spellings the server treats differently
/// must stay two ledger entries.
///
/// # Examples
///
/// ```
/// use link_ledger::url::normalize_url;
///
/// let url = normalize_url("https://App.Example.COM/reports#summary").unwrap();
/// assert_eq!(url.as_str(), "https://app.example.com/reports");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Same as [`normalize_url`] for an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves an href or src attribute against the page it was found on
///
/// Returns None if the reference should not become a task:
/// - empty values
/// - javascript:, mailto:, tel: and data: references
/// - fragment-only references (same page anchors)
/// - anything that does not resolve to a normalizable http(s) URL
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .and_then(|absolute| normalize_parsed(absolute).ok())
}
