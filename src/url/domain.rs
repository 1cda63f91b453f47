use url::Url;

/// Extracts the lowercase host of a URL, without a `www.` prefix
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_sync::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Origin.example/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("origin.example".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        }
    })
}

/// Returns true if both URLs live on the same site
///
/// Ports are ignored; the origin serves everything from one host.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
