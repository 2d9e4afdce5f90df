//! Small text and clock helpers.

const MAX_ERROR_TEXT_CHARS: usize = 180;

/// Trim optional text; blank values collapse to `None`.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

/// Only plain HTTP(S) endpoints are accepted for sync.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Drop trailing slashes so endpoints compare and join consistently.
pub fn trim_trailing_slash(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

/// Shorten a server response body before it lands in an error message.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(MAX_ERROR_TEXT_CHARS).collect()
}

/// Wall-clock time as Unix milliseconds, the unit every queue timestamp uses.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" token ".to_string())).as_deref(),
            Some("token")
        );
    }

    #[test]
    fn only_http_schemes_pass() {
        assert!(is_http_url("http://10.0.0.5:8080"));
        assert!(is_http_url("https://sync.example.com"));
        assert!(!is_http_url("ws://sync.example.com"));
        assert!(!is_http_url("sync.example.com"));
    }

    #[test]
    fn trailing_slashes_are_removed() {
        assert_eq!(
            trim_trailing_slash("https://sync.example.com/v1//"),
            "https://sync.example.com/v1"
        );
    }

    #[test]
    fn long_error_bodies_are_cut() {
        let body = "<html>".repeat(100);
        assert_eq!(compact_text(&body).chars().count(), MAX_ERROR_TEXT_CHARS);
        assert_eq!(compact_text("  bad gateway \n"), "bad gateway");
    }
}
