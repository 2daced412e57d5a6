//! Tracked-domain resolution.
//!
//! A tab URL maps to a normalized host identity: lowercase, no scheme, no
//! leading `www.`. Tracking is an exact match against the configured site
//! set -- no subdomain wildcarding. Anything that fails to parse, or has no
//! host at all (`about:blank`, `chrome://...` and friends), resolves to the
//! empty string, which no site set contains.

use url::Url;

/// Extract the normalized domain of a URL, or `""` if it has none.
///
/// Malformed input is not an error condition for callers: an unparseable
/// URL is simply not a tracked domain.
pub fn extract_domain(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => parsed.host_str().map(normalize_host).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Normalize a user-entered site into its stored form.
///
/// Accepts either a full URL (`https://www.Example.com/feed`) or a bare
/// host (`Example.com`); both become `example.com`. Returns `""` for input
/// that yields no usable host.
pub fn normalize_site(entry: &str) -> String {
    let entry = entry.trim();
    if entry.is_empty() {
        return String::new();
    }
    let from_url = extract_domain(entry);
    if !from_url.is_empty() {
        return from_url;
    }
    // Bare host without a scheme; reparse with one so IDN/port forms
    // normalize the same way full URLs do.
    extract_domain(&format!("https://{entry}"))
}

fn normalize_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_path_and_www() {
        assert_eq!(extract_domain("https://www.Example.com/path"), "example.com");
        assert_eq!(extract_domain("http://example.com"), "example.com");
        assert_eq!(extract_domain("https://news.example.com/x?y=1"), "news.example.com");
    }

    #[test]
    fn malformed_urls_yield_empty() {
        assert_eq!(extract_domain("not a url"), "");
        assert_eq!(extract_domain(""), "");
        assert_eq!(extract_domain("about:blank"), "");
    }

    #[test]
    fn www_stripped_once_only() {
        assert_eq!(extract_domain("https://www.www.example.com"), "www.example.com");
    }

    #[test]
    fn normalize_site_accepts_bare_hosts_and_urls() {
        assert_eq!(normalize_site("Example.com"), "example.com");
        assert_eq!(normalize_site("  www.example.com "), "example.com");
        assert_eq!(normalize_site("https://www.example.com/watch"), "example.com");
        assert_eq!(normalize_site(""), "");
    }

    #[test]
    fn subdomains_are_distinct_identities() {
        assert_ne!(extract_domain("https://m.example.com"), extract_domain("https://example.com"));
    }
}
