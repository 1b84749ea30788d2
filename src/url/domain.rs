use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use link_ledger::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether `domain` occurs anywhere in the URL's host
///
/// This is containment, not suffix matching: with domain `app.example.com`
/// the host `app.example.com.evil.test` is considered internal too. Changing
/// that would change which pages a crawl covers.
pub fn host_contains(url: &Url, domain: &str) -> bool {
    extract_domain(url).map_or(false, |host| host.contains(domain))
}
