//! URL to domain normalization.

use url::Url;

/// Domain assigned to `file://` URLs.
pub const LOCAL_FILES_DOMAIN: &str = "Local Files";
/// Domain assigned when no host can be extracted. Parsed hosts are never
/// capitalized, so this cannot collide with a real domain.
pub const UNKNOWN_DOMAIN: &str = "Unknown";

/// Reduce a URL to the domain sessions are keyed by.
///
/// Strips the scheme, port and a single leading `www.`. Unparsable URLs and
/// URLs without a host map to [`UNKNOWN_DOMAIN`].
pub fn normalize_domain(url: &str) -> String {
    let trimmed = url.trim();
    if has_file_scheme(trimmed) {
        return LOCAL_FILES_DOMAIN.to_string();
    }

    let Ok(parsed) = Url::parse(trimmed) else {
        return UNKNOWN_DOMAIN.to_string();
    };
    if parsed.scheme() == "file" {
        return LOCAL_FILES_DOMAIN.to_string();
    }

    // host_str() never includes the port; IPv6 literals keep their brackets.
    let host = parsed.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        UNKNOWN_DOMAIN.to_string()
    } else {
        host.to_string()
    }
}

/// True for the sentinel domains that do not name a real site.
pub fn is_sentinel_domain(domain: &str) -> bool {
    domain == UNKNOWN_DOMAIN || domain.is_empty()
}

fn has_file_scheme(url: &str) -> bool {
    url.get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("file://"))
}
