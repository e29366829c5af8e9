//! Mapping of transport errors into recorded [`ProbeError`]s.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use hickory_resolver::ResolveError;
use vantage_core::{ProbeError, ProbeErrorKind};

/// Render an error and all of its sources as `outer: inner: ...`
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let rendered = inner.to_string();
        // Some wrappers already repeat their source in Display
        if !text.contains(&rendered) {
            text.push_str(": ");
            text.push_str(&rendered);
        }
        source = inner.source();
    }
    text
}

/// A probe that ran out of its time budget
pub(crate) fn timed_out(budget: Duration) -> ProbeError {
    ProbeError::new(
        ProbeErrorKind::Timeout,
        format!("timed out after {:.1}s", budget.as_secs_f64()),
    )
}

/// Socket-level failure from a TCP connect or TLS handshake
pub(crate) fn from_io(err: &io::Error) -> ProbeError {
    let detail = error_chain(err);
    let kind = match err.kind() {
        io::ErrorKind::TimedOut => ProbeErrorKind::Timeout,
        io::ErrorKind::InvalidData => ProbeErrorKind::Tls,
        _ if is_lookup_failure(&detail) => ProbeErrorKind::Dns,
        _ => ProbeErrorKind::Connection,
    };
    ProbeError::new(kind, detail)
}

/// Resolver failure other than an empty answer
pub(crate) fn from_resolve(err: &ResolveError) -> ProbeError {
    let detail = error_chain(err);
    let lowered = detail.to_lowercase();
    let kind = if lowered.contains("timed out") || lowered.contains("timeout") {
        ProbeErrorKind::Timeout
    } else {
        ProbeErrorKind::Dns
    };
    ProbeError::new(kind, detail)
}

/// Failed HTTP attempt, tagged with the URL that was requested
pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> ProbeError {
    let kind = if err.is_timeout() {
        ProbeErrorKind::Timeout
    } else if err.is_connect() {
        ProbeErrorKind::Connection
    } else if err.is_redirect() || err.is_request() || err.is_body() || err.is_decode() {
        ProbeErrorKind::Http
    } else {
        ProbeErrorKind::Other
    };
    let err = err.without_url();
    ProbeError::new(kind, format!("{url}: {}", error_chain(&err)))
}

fn is_lookup_failure(detail: &str) -> bool {
    let lowered = detail.to_lowercase();
    lowered.contains("failed to lookup address") || lowered.contains("name or service not known")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_probe_kinds() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        assert_eq!(from_io(&refused).kind, ProbeErrorKind::Connection);

        let slow = io::Error::new(io::ErrorKind::TimedOut, "deadline");
        assert_eq!(from_io(&slow).kind, ProbeErrorKind::Timeout);

        let lookup = io::Error::other("failed to lookup address information: Name or service not known");
        assert_eq!(from_io(&lookup).kind, ProbeErrorKind::Dns);
    }

    #[test]
    fn timeout_renders_with_tag() {
        let err = timed_out(Duration::from_secs(5));
        assert_eq!(err.to_string(), "timeout: timed out after 5.0s");
    }

    #[test]
    fn chain_includes_sources_once() {
        #[derive(Debug)]
        struct Outer(io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("handshake failed")
            }
        }
        impl StdError for Outer {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(io::Error::new(io::ErrorKind::InvalidData, "bad certificate"));
        assert_eq!(error_chain(&err), "handshake failed: bad certificate");
    }
}
