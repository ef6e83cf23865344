//! Log sanitization utilities
//!
//! Keeps token values and long response bodies out of debug/error logs.

/// Maximum number of bytes of a response body included in log output.
const TRUNCATE_LIMIT: usize = 256;

/// Number of leading characters of a secret that may appear in logs.
const SECRET_PREFIX_CHARS: usize = 4;

/// Largest char boundary at or below `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

/// Truncate a response body for logging.
///
/// Bodies within the limit are returned unchanged; longer ones are cut at a
/// char boundary and suffixed with their total size.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Mask a secret (token, password) leaving a short prefix for correlation.
pub fn mask_secret(s: &str) -> String {
    if s.chars().count() <= SECRET_PREFIX_CHARS * 2 {
        return "***".to_string();
    }
    let prefix: String = s.chars().take(SECRET_PREFIX_CHARS).collect();
    format!("{prefix}***")
}
