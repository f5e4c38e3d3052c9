//! Utility functions for URL handling and size formatting

/// Rewrite a leading `http://` scheme to `https://`
///
/// # Examples
///
/// ```
/// use vidfeed::utils::enforce_https;
///
/// assert_eq!(enforce_https("http://example.com/a.jpg"), "https://example.com/a.jpg");
/// assert_eq!(enforce_https("https://example.com/a.jpg"), "https://example.com/a.jpg");
/// ```
#[must_use]
pub fn enforce_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Format a byte count as megabytes with two decimals (e.g. "1.50MB")
#[must_use]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforce_https_only_touches_scheme() {
        assert_eq!(
            enforce_https("http://i0.hdslb.com/x.jpg?ref=http://a"),
            "https://i0.hdslb.com/x.jpg?ref=http://a"
        );
        assert_eq!(enforce_https("//cdn.example/x.jpg"), "//cdn.example/x.jpg");
        assert_eq!(enforce_https(""), "");
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(0), "0.00MB");
        assert_eq!(format_megabytes(1024 * 1024 * 3 / 2), "1.50MB");
    }
}
