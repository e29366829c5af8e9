//! Per-run probe configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Browser-like user agent sent with every HTTP request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Public resolver queried alongside the system resolver
pub const DEFAULT_PUBLIC_RESOLVER: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

/// Settings for one measurement run.
///
/// Built once per invocation and handed to the measurer; nothing here is
/// global or mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Only measure the first N included domains
    pub domain_limit: Option<usize>,
    /// Budget for each resolver lookup
    pub dns_timeout: Duration,
    /// Budget for each TCP connect
    pub tcp_timeout: Duration,
    /// Budget for each HTTP attempt, body included
    pub http_timeout: Duration,
    /// Budget for the TLS connect + handshake
    pub tls_timeout: Duration,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
    /// Public resolver address
    pub public_resolver: IpAddr,
    /// Maximum body bytes kept as snippet
    pub body_snippet_limit: usize,
    /// Maximum redirects followed per attempt
    pub max_redirects: usize,
    /// Rows buffered before each store flush
    pub batch_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            domain_limit: None,
            dns_timeout: Duration::from_secs(4),
            tcp_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            tls_timeout: Duration::from_secs(6),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            public_resolver: DEFAULT_PUBLIC_RESOLVER,
            body_snippet_limit: 2000,
            max_redirects: 10,
            batch_size: 25,
        }
    }
}

impl RunConfig {
    /// Limit the run to the first `limit` domains
    #[must_use]
    pub const fn domain_limit(mut self, limit: Option<usize>) -> Self {
        self.domain_limit = limit;
        self
    }

    /// Use the same budget for every probe
    #[must_use]
    pub const fn uniform_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self.tcp_timeout = timeout;
        self.http_timeout = timeout;
        self.tls_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set the public resolver
    #[must_use]
    pub const fn public_resolver(mut self, resolver: IpAddr) -> Self {
        self.public_resolver = resolver;
        self
    }

    /// Set the flush batch size; zero is treated as one
    #[must_use]
    pub const fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 { 1 } else { size };
        self
    }
}
