//! Domain helpers shared by the write path (deriving `incidents.domain` from a
//! page URL) and the public read path (matching and grouping by domain).

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;

lazy_static! {
    /// Leading http/https scheme, case-insensitive
    static ref SCHEME_REGEX: Regex = Regex::new(r"(?i)^https?://").unwrap();

    /// Leading `www.` label
    static ref WWW_REGEX: Regex = Regex::new(r"^www\.").unwrap();
}

/// Host of a page URL as stored in `incidents.domain`
///
/// Lowercased, without scheme or port. Returns `None` when the URL does not
/// parse or has no host.
pub fn host_of(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url.trim()).ok()?;
    url.host_str()
        .map(|h| h.trim_end_matches('.').to_lowercase())
        .filter(|h| !h.is_empty())
}

/// Normalize a user-supplied domain for matching
///
/// Trims, case-folds, strips an `http(s)://` scheme, a port and a leading
/// `www.`. Anything after the host (path, query) is dropped.
pub fn normalize_domain(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = SCHEME_REGEX.replace(&lowered, "");
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority.split(':').next().unwrap_or_default();
    WWW_REGEX.replace(host, "").into_owned()
}

/// Normalized domain of a full URL, used when a search passes `url` instead
/// of `domain`
pub fn normalized_domain_of_url(raw_url: &str) -> Option<String> {
    host_of(raw_url)
        .map(|h| normalize_domain(&h))
        .filter(|d| !d.is_empty())
}
