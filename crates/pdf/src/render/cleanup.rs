use std::sync::OnceLock;

use regex::Regex;

/// Normalize a shown string into a text segment.
///
/// Runs of whitespace collapse to a single space and the result is trimmed.
/// An empty return value means the string carried no visible text.
pub fn normalize_segment(text: &str) -> String {
    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_spaces.replace_all(text, " ").trim().to_string()
}
