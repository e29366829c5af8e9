//! HTTP outcome classification and block-page detection.

use vantage_core::HttpOutcome;

/// Block-notice phrasing used by Indian ISPs and the telecom regulator.
///
/// Matched against the lower-cased body snippet.
pub const BLOCKPAGE_PHRASES: [&str; 3] = [
    "blocked as per the instructions received from the department of telecommunications",
    "this url has been blocked as per order of the competent authority",
    "has been blocked as per the directions received from the competent authorities",
];

const DNS_NOT_FOUND: &str = "name or service not known";

/// Map raw signals to an outcome label, first match wins.
///
/// A status code always takes precedence over recorded errors; `error_text`
/// is inspected case-insensitively.
#[must_use]
pub fn classify_outcome(status: Option<u16>, error_text: &str, final_url: &str) -> HttpOutcome {
    match status {
        Some(401 | 403) => return HttpOutcome::AccessDenied,
        Some(200..=299) => return HttpOutcome::Success,
        Some(300..=399) => return HttpOutcome::Redirect,
        Some(400..=499) => return HttpOutcome::ClientError,
        Some(500..=599) => return HttpOutcome::ServerError,
        _ => {}
    }

    if !error_text.trim().is_empty() {
        let lowered = error_text.to_lowercase();
        if lowered.contains("timeout") {
            return HttpOutcome::Timeout;
        }
        if lowered.contains("connection") || lowered.contains(DNS_NOT_FOUND) {
            return HttpOutcome::ConnectionError;
        }
        return HttpOutcome::OtherError;
    }

    if final_url.is_empty() {
        HttpOutcome::NoResponse
    } else {
        HttpOutcome::Success
    }
}

/// Returns true if the snippet contains a known block-notice phrase
#[must_use]
pub fn detect_blockpage(snippet: &str) -> bool {
    if snippet.is_empty() {
        return false;
    }
    let lowered = snippet.to_lowercase();
    BLOCKPAGE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Classify and apply the block-page override.
///
/// The status code is not touched; only the label changes.
#[must_use]
pub fn classify(status: Option<u16>, error_text: &str, final_url: &str, snippet: &str) -> HttpOutcome {
    if detect_blockpage(snippet) {
        return HttpOutcome::BlockpageIndia;
    }
    classify_outcome(status, error_text, final_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ranges_take_precedence() {
        let cases = [
            (401, HttpOutcome::AccessDenied),
            (403, HttpOutcome::AccessDenied),
            (200, HttpOutcome::Success),
            (204, HttpOutcome::Success),
            (301, HttpOutcome::Redirect),
            (404, HttpOutcome::ClientError),
            (451, HttpOutcome::ClientError),
            (500, HttpOutcome::ServerError),
            (503, HttpOutcome::ServerError),
        ];
        for (status, expected) in cases {
            assert_eq!(
                classify_outcome(Some(status), "timeout: https://a.in/: slow", ""),
                expected,
                "status {status}"
            );
        }
    }

    #[test]
    fn error_text_rules_apply_without_status() {
        assert_eq!(classify_outcome(None, "timeout: timed out after 10.0s", ""), HttpOutcome::Timeout);
        assert_eq!(classify_outcome(None, "Read TIMEOUT", ""), HttpOutcome::Timeout);
        assert_eq!(
            classify_outcome(None, "connection: https://a.in/: refused", ""),
            HttpOutcome::ConnectionError
        );
        assert_eq!(
            classify_outcome(None, "dns: [Errno -2] Name or service not known", ""),
            HttpOutcome::ConnectionError
        );
        assert_eq!(classify_outcome(None, "http: too many redirects", ""), HttpOutcome::OtherError);
    }

    #[test]
    fn timeout_wins_over_connection() {
        let text = "connection: https://a.in/: reset | timeout: http://a.in/: timed out";
        assert_eq!(classify_outcome(None, text, ""), HttpOutcome::Timeout);
    }

    #[test]
    fn no_signal_depends_on_final_url() {
        assert_eq!(classify_outcome(None, "", "https://a.in/"), HttpOutcome::Success);
        assert_eq!(classify_outcome(None, "", ""), HttpOutcome::NoResponse);
        assert_eq!(classify_outcome(None, "   ", ""), HttpOutcome::NoResponse);
    }

    #[test]
    fn out_of_range_status_falls_through() {
        assert_eq!(classify_outcome(Some(600), "", "https://a.in/"), HttpOutcome::Success);
        assert_eq!(classify_outcome(Some(101), "timeout: x", ""), HttpOutcome::Timeout);
    }

    #[test]
    fn blockpage_overrides_success() {
        let body = "<html><body>This URL has been blocked as per order of the Competent Authority</body></html>";
        assert!(detect_blockpage(body));
        assert_eq!(classify(Some(200), "", "http://a.in/", body), HttpOutcome::BlockpageIndia);
    }

    #[test]
    fn clean_body_is_not_a_blockpage() {
        assert!(!detect_blockpage(""));
        assert!(!detect_blockpage("<html>Welcome to example.in</html>"));
        assert_eq!(classify(Some(200), "", "https://a.in/", "<p>hi</p>"), HttpOutcome::Success);
    }

    #[test]
    fn classification_is_deterministic() {
        let first = classify(None, "connection: refused", "", "");
        for _ in 0..5 {
            assert_eq!(classify(None, "connection: refused", "", ""), first);
        }
    }
}
