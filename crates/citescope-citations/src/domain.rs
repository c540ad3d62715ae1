//! URL canonicalization and domain comparison helpers.

use url::Url;

/// Canonicalize an absolute http(s) URL for de-duplication.
///
/// Drops the fragment and a trailing slash on non-root paths; the `url` crate
/// lowercases the host. Returns `None` for anything that is not a parsable
/// http(s) URL with a host.
#[must_use]
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    if host.is_empty() || !host.contains('.') {
        return None;
    }

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Some(url.to_string())
}

/// Lowercase host of a canonical URL with any leading `www.` removed.
#[must_use]
pub(crate) fn url_domain(canonical: &str) -> Option<String> {
    let url = Url::parse(canonical).ok()?;
    url.host_str().map(normalize_domain)
}

/// Normalize a configured domain for comparison.
///
/// Accepts bare hosts (`WWW.Example.com`), hosts with paths
/// (`example.com/blog`), or full URLs. Lowercases, drops the scheme, path and
/// port, strips a leading `www.` and any trailing dot.
#[must_use]
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let host = if trimmed.contains("://") {
        Url::parse(trimmed)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    } else {
        let end = trimmed.find(['/', '?', '#']).unwrap_or(trimmed.len());
        let host = &trimmed[..end];
        host.split(':').next().unwrap_or_default().to_string()
    };

    let lower = host.to_lowercase();
    let lower = lower.trim_end_matches('.');
    lower.strip_prefix("www.").unwrap_or(lower).to_string()
}

/// `true` if `domain` equals `target` or is a sub-domain of it.
///
/// Both sides are expected to be normalized. An empty target never matches.
#[must_use]
pub fn domain_matches(domain: &str, target: &str) -> bool {
    if target.is_empty() || domain.is_empty() {
        return false;
    }
    domain == target
        || domain
            .strip_suffix(target)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_fragment_and_trailing_slash() {
        assert_eq!(
            canonicalize_url("https://Example.com/docs/#intro").as_deref(),
            Some("https://example.com/docs")
        );
    }

    #[test]
    fn canonicalize_keeps_root_slash() {
        assert_eq!(
            canonicalize_url("https://ahrefs.com").as_deref(),
            Some("https://ahrefs.com/")
        );
    }

    #[test]
    fn canonicalize_keeps_query() {
        assert_eq!(
            canonicalize_url("https://example.com/search?q=seo").as_deref(),
            Some("https://example.com/search?q=seo")
        );
    }

    #[test]
    fn canonicalize_rejects_non_http_and_garbage() {
        assert!(canonicalize_url("ftp://example.com/file").is_none());
        assert!(canonicalize_url("mailto:someone@example.com").is_none());
        assert!(canonicalize_url("not a url").is_none());
        assert!(canonicalize_url("https://").is_none());
        assert!(canonicalize_url("http://localhost/admin").is_none());
    }

    #[test]
    fn normalize_domain_variants() {
        assert_eq!(normalize_domain("WWW.SoldierData.com"), "soldierdata.com");
        assert_eq!(normalize_domain("https://www.ahrefs.com/blog"), "ahrefs.com");
        assert_eq!(normalize_domain("semrush.com/features"), "semrush.com");
        assert_eq!(normalize_domain("moz.com:443"), "moz.com");
        assert_eq!(normalize_domain("example.com."), "example.com");
    }

    #[test]
    fn subdomain_matches_parent() {
        assert!(domain_matches("blog.ahrefs.com", "ahrefs.com"));
        assert!(domain_matches("ahrefs.com", "ahrefs.com"));
    }

    #[test]
    fn lookalike_suffix_does_not_match() {
        assert!(!domain_matches("notahrefs.com", "ahrefs.com"));
        assert!(!domain_matches("ahrefs.com.evil.io", "ahrefs.com"));
    }

    #[test]
    fn empty_target_never_matches() {
        assert!(!domain_matches("example.com", ""));
    }

    #[test]
    fn url_domain_strips_www() {
        assert_eq!(
            url_domain("https://www.soldierdata.com/x").as_deref(),
            Some("soldierdata.com")
        );
    }
}
