//! DNS probe against the system resolver and a fixed public resolver.

use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{ResolveError, TokioResolver};
use tracing::debug;
use vantage_core::{ProbeError, ProbeErrorKind};

use crate::config::RunConfig;
use crate::error::{MeasureError, Result};
use crate::failure;

/// Outcome of resolving one domain with one resolver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DnsResult {
    /// At least one address came back and no lookup failed
    pub ok: bool,
    /// Addresses in answer order, A before AAAA
    pub addresses: Vec<IpAddr>,
    /// Failure, if any
    pub error: Option<ProbeError>,
}

impl DnsResult {
    /// Addresses joined with `;`
    #[must_use]
    pub fn joined_addresses(&self) -> String {
        self.addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Both resolver results for one domain; neither takes precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DnsPair {
    /// System resolver
    pub local: DnsResult,
    /// Public resolver
    pub public: DnsResult,
}

/// Resolves A and AAAA records through two independent resolvers.
pub struct DnsProbe {
    local: TokioResolver,
    public: TokioResolver,
    timeout: Duration,
}

impl DnsProbe {
    /// Build both resolvers from the run configuration
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.dns_timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        let local = TokioResolver::builder_tokio()
            .map_err(|e| MeasureError::Resolver(format!("system resolver: {e}")))?
            .with_options(opts.clone())
            .build();

        let servers = NameServerConfigGroup::from_ips_clear(&[config.public_resolver], 53, true);
        let public = TokioResolver::builder_with_config(
            ResolverConfig::from_parts(None, vec![], servers),
            TokioConnectionProvider::default(),
        )
        .with_options(opts)
        .build();

        Ok(Self {
            local,
            public,
            timeout: config.dns_timeout,
        })
    }

    /// Resolve with both resolvers concurrently
    pub async fn resolve(&self, domain: &str) -> DnsPair {
        let (local, public) = tokio::join!(
            lookup(&self.local, domain, self.timeout),
            lookup(&self.public, domain, self.timeout),
        );
        DnsPair { local, public }
    }
}

/// A then AAAA. An empty answer for one type is skipped; any other failure
/// ends the lookup and is recorded.
async fn lookup(resolver: &TokioResolver, domain: &str, budget: Duration) -> DnsResult {
    let mut addresses = Vec::new();

    let v4 = tokio::time::timeout(budget, resolver.ipv4_lookup(domain)).await;
    match v4 {
        Ok(Ok(answer)) => addresses.extend(answer.iter().map(|a| IpAddr::V4(a.0))),
        Ok(Err(e)) if is_empty_answer(&e) => debug!(domain, "no A records"),
        Ok(Err(e)) => return failed(addresses, failure::from_resolve(&e)),
        Err(_) => return failed(addresses, failure::timed_out(budget)),
    }

    let v6 = tokio::time::timeout(budget, resolver.ipv6_lookup(domain)).await;
    match v6 {
        Ok(Ok(answer)) => addresses.extend(answer.iter().map(|a| IpAddr::V6(a.0))),
        Ok(Err(e)) if is_empty_answer(&e) => debug!(domain, "no AAAA records"),
        Ok(Err(e)) => return failed(addresses, failure::from_resolve(&e)),
        Err(_) => return failed(addresses, failure::timed_out(budget)),
    }

    if addresses.is_empty() {
        return failed(
            addresses,
            ProbeError::new(ProbeErrorKind::NoRecords, "No A/AAAA records"),
        );
    }

    DnsResult {
        ok: true,
        addresses,
        error: None,
    }
}

/// NOERROR with no records of the requested type. NXDOMAIN is a failure.
fn is_empty_answer(err: &ResolveError) -> bool {
    err.is_no_records_found() && !err.is_nx_domain()
}

fn failed(addresses: Vec<IpAddr>, error: ProbeError) -> DnsResult {
    debug!(error = %error, "dns lookup failed");
    DnsResult {
        ok: false,
        addresses,
        error: Some(error),
    }
}
