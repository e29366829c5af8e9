use thiserror::Error;

/// Result type alias for measurement setup and pipeline operations
pub type Result<T> = std::result::Result<T, MeasureError>;

/// Failures that happen outside of an individual probe.
///
/// Probe failures themselves are recorded in the row as
/// [`vantage_core::ProbeError`]; these errors either abort the run before it
/// starts (client setup) or degrade a single domain's row.
#[derive(Error, Debug)]
pub enum MeasureError {
    /// Resolver could not be built
    #[error("resolver setup failed: {0}")]
    Resolver(String),

    /// HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    /// TLS connector could not be built
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Domain name cannot be probed at all
    #[error("invalid domain {domain:?}: {reason}")]
    InvalidDomain {
        /// The rejected domain
        domain: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// The measurement task died
    #[error("measurement task failed: {0}")]
    Task(String),
}
