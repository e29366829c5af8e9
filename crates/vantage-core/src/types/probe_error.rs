//! Structured probe failures recorded as evidence.
//!
//! A probe failure is data, not control flow: it is stored in the row and
//! later inspected by the outcome classifier. Stores render it as
//! `kind: detail` and parse it back; text without a known kind prefix (for
//! example rows written by older tooling) is kept verbatim as
//! [`ProbeErrorKind::Other`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Machine-classifiable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeErrorKind {
    /// The probe's time budget ran out
    Timeout,
    /// Connection refused, reset or unreachable
    Connection,
    /// Resolver failure (NXDOMAIN, SERVFAIL, no nameserver reachable)
    Dns,
    /// Resolution succeeded but returned no A/AAAA records
    NoRecords,
    /// TLS handshake or certificate failure
    Tls,
    /// HTTP-level failure (redirect loop, malformed response)
    Http,
    /// Failure outside of any probe, caught by the measurer
    Pipeline,
    /// Anything else, including legacy free-text errors
    Other,
}

impl ProbeErrorKind {
    const TAGGED: [Self; 7] = [
        Self::Timeout,
        Self::Connection,
        Self::Dns,
        Self::NoRecords,
        Self::Tls,
        Self::Http,
        Self::Pipeline,
    ];

    /// Tag used as the rendered prefix
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Dns => "dns",
            Self::NoRecords => "no_records",
            Self::Tls => "tls",
            Self::Http => "http",
            Self::Pipeline => "pipeline",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded probe failure: a kind plus human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError {
    /// Failure category
    pub kind: ProbeErrorKind,
    /// Free-text detail, usually the underlying error chain
    pub detail: String,
}

impl ProbeError {
    /// Create a new probe error
    #[must_use]
    pub fn new(kind: ProbeErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Failure caught at the measurer boundary
    #[must_use]
    pub fn pipeline(detail: impl Into<String>) -> Self {
        Self::new(ProbeErrorKind::Pipeline, detail)
    }

    /// Parse rendered text, falling back to [`ProbeErrorKind::Other`]
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        s.split_once(": ")
            .and_then(|(tag, detail)| {
                ProbeErrorKind::TAGGED
                    .into_iter()
                    .find(|k| k.as_str() == tag)
                    .map(|kind| Self::new(kind, detail))
            })
            .unwrap_or_else(|| Self::new(ProbeErrorKind::Other, s))
    }
}

impl std::error::Error for ProbeError {}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ProbeErrorKind::Other => f.write_str(&self.detail),
            kind => write!(f, "{kind}: {}", self.detail),
        }
    }
}

impl FromStr for ProbeError {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lossy(s))
    }
}

impl Serialize for ProbeError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProbeError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lossy(&raw))
    }
}

/// Separator between multiple errors stored in one column
pub const ERROR_SEPARATOR: &str = " | ";

/// Render a list of errors into one column value
#[must_use]
pub fn join_errors(errors: &[ProbeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(ERROR_SEPARATOR)
}

/// Parse a column value back into its errors; empty text yields none
#[must_use]
pub fn split_errors(text: &str) -> Vec<ProbeError> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(ERROR_SEPARATOR)
        .map(ProbeError::parse_lossy)
        .collect()
}

/// Serde adapter storing `Vec<ProbeError>` as one joined string column.
pub mod error_list {
    use super::{join_errors, split_errors, ProbeError};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a single joined string
    pub fn serialize<S: Serializer>(errors: &[ProbeError], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&join_errors(errors))
    }

    /// Deserialize from a joined string; missing or empty means no errors
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ProbeError>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(split_errors).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_errors_round_trip() {
        let err = ProbeError::new(ProbeErrorKind::Connection, "https://example.in/: refused");
        let text = err.to_string();
        assert_eq!(text, "connection: https://example.in/: refused");
        assert_eq!(text.parse::<ProbeError>(), Ok(err));
    }

    #[test]
    fn legacy_text_is_kept_verbatim() {
        let legacy = "ConnectionError: HTTPSConnectionPool(host='x', port=443)";
        let err = ProbeError::parse_lossy(legacy);
        assert_eq!(err.kind, ProbeErrorKind::Other);
        assert_eq!(err.to_string(), legacy);
    }

    #[test]
    fn join_and_split_are_inverse() {
        let errors = vec![
            ProbeError::new(ProbeErrorKind::Timeout, "https://a.in/: timed out"),
            ProbeError::new(ProbeErrorKind::Connection, "http://a.in/: refused"),
        ];
        let joined = join_errors(&errors);
        assert_eq!(
            joined,
            "timeout: https://a.in/: timed out | connection: http://a.in/: refused"
        );
        assert_eq!(split_errors(&joined), errors);
        assert!(split_errors("  ").is_empty());
    }
}
