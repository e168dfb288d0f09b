use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Page URLs must carry an explicit http/https scheme and a host
    /// - Valid: "https://a.example/x", "http://shop.example"
    /// - Invalid: "a.example", "ftp://a.example", "https://"
    pub static ref PAGE_URL_REGEX: Regex = Regex::new(r"(?i)^https?://[^\s/?#]+\S*$").unwrap();
}

/// Parse a boolean submitted as a multipart text field
///
/// Accepts `true/1/yes/on` and `false/0/no/off/""` (case-insensitive).
pub fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
