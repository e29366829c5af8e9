use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Normalized HTTP outcome for one domain measurement.
///
/// This is a closed taxonomy: every stored row carries exactly one of these
/// labels, serialized in `snake_case`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpOutcome {
    /// 2xx response, or a recorded final URL with no status and no error
    Success,
    /// 3xx response that was not followed further
    Redirect,
    /// 401 or 403
    AccessDenied,
    /// Any other 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// No response; the transport reported a timeout
    Timeout,
    /// No response; the connection could not be established
    ConnectionError,
    /// No response; some other transport error
    OtherError,
    /// Nothing at all was recorded
    NoResponse,
    /// Body matched a known ISP/regulator block notice
    BlockpageIndia,
}

impl HttpOutcome {
    /// Every member of the taxonomy, in declaration order
    pub const ALL: [Self; 10] = [
        Self::Success,
        Self::Redirect,
        Self::AccessDenied,
        Self::ClientError,
        Self::ServerError,
        Self::Timeout,
        Self::ConnectionError,
        Self::OtherError,
        Self::NoResponse,
        Self::BlockpageIndia,
    ];

    /// Stable label used in stores and reports
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Redirect => "redirect",
            Self::AccessDenied => "access_denied",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection_error",
            Self::OtherError => "other_error",
            Self::NoResponse => "no_response",
            Self::BlockpageIndia => "blockpage_india",
        }
    }

    /// Returns true for outcomes counted as reachable (success or redirect)
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::Redirect)
    }

    /// Returns true if the outcome came from a block-page match
    #[must_use]
    pub const fn is_blockpage(&self) -> bool {
        matches!(self, Self::BlockpageIndia)
    }
}

impl std::fmt::Display for HttpOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpOutcome {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == needle)
            .ok_or_else(|| CoreError::unknown("http outcome", s))
    }
}
