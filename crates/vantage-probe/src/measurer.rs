//! One domain in, one complete measurement row out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument, warn};
use vantage_core::{timestamp_at, DomainEntry, MeasurementRow, RunStamp};

use crate::config::RunConfig;
use crate::dns::{DnsPair, DnsProbe};
use crate::error::{MeasureError, Result};
use crate::http::{HttpProbe, HttpResult};
use crate::tcp::{check_tcp, TcpResult};
use crate::tls::{TlsProbe, TlsResult};

/// Anything that can turn a domain entry into a row.
///
/// Implementations never fail: problems are recorded in the row.
#[async_trait]
pub trait Measure: Send + Sync {
    /// Measure one domain for the given run
    async fn measure(&self, entry: &DomainEntry, stamp: &RunStamp) -> MeasurementRow;
}

/// Runs every probe for a domain concurrently.
pub struct DomainMeasurer {
    inner: Arc<Probes>,
}

struct Probes {
    dns: DnsProbe,
    http: HttpProbe,
    tls: TlsProbe,
    tcp_timeout: Duration,
}

impl Clone for DomainMeasurer {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl DomainMeasurer {
    /// Build all probe clients once for the run
    pub fn new(config: &RunConfig) -> Result<Self> {
        let probes = Probes {
            dns: DnsProbe::from_config(config)?,
            http: HttpProbe::from_config(config)?,
            tls: TlsProbe::from_config(config)?,
            tcp_timeout: config.tcp_timeout,
        };
        Ok(Self {
            inner: Arc::new(probes),
        })
    }
}

#[async_trait]
impl Measure for DomainMeasurer {
    #[instrument(skip_all, fields(domain = %entry.domain, run_id = %stamp.run_id))]
    async fn measure(&self, entry: &DomainEntry, stamp: &RunStamp) -> MeasurementRow {
        let timestamp = timestamp_at(Utc::now());

        if let Err(e) = validate_domain(&entry.domain) {
            warn!(error = %e, "domain rejected");
            return MeasurementRow::pipeline_failure(stamp, entry, timestamp, &e.to_string());
        }

        let probes = Arc::clone(&self.inner);
        let domain = entry.domain.clone();
        settle(async move { probes.run(&domain).await }, stamp, entry, timestamp).await
    }
}

/// Run the probe set on its own task; a panic or cancellation still yields a row
async fn settle<F>(work: F, stamp: &RunStamp, entry: &DomainEntry, timestamp: String) -> MeasurementRow
where
    F: Future<Output = Evidence> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(evidence) => evidence.into_row(stamp, entry, timestamp),
        Err(join) => {
            let err = MeasureError::Task(join.to_string());
            warn!(error = %err, "measurement degraded to pipeline failure");
            MeasurementRow::pipeline_failure(stamp, entry, timestamp, &err.to_string())
        }
    }
}

impl Probes {
    async fn run(&self, domain: &str) -> Evidence {
        let (dns, tcp_80, tcp_443, http, tls) = tokio::join!(
            self.dns.resolve(domain),
            check_tcp(domain, 80, self.tcp_timeout),
            check_tcp(domain, 443, self.tcp_timeout),
            self.http.fetch(domain),
            self.tls.inspect(domain, 443),
        );
        debug!(domain, dns_local = dns.local.ok, tcp_443 = tcp_443.ok, tls = tls.ok, "probes finished");
        Evidence {
            dns,
            tcp_80,
            tcp_443,
            http,
            tls,
        }
    }
}

/// Raw probe results before they are flattened into a row
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    /// Both resolvers
    pub dns: DnsPair,
    /// Port 80 connect
    pub tcp_80: TcpResult,
    /// Port 443 connect
    pub tcp_443: TcpResult,
    /// HTTPS/HTTP fetch
    pub http: HttpResult,
    /// TLS handshake
    pub tls: TlsResult,
}

impl Evidence {
    /// Flatten into the store row and classify the HTTP outcome
    #[must_use]
    pub fn into_row(self, stamp: &RunStamp, entry: &DomainEntry, timestamp: String) -> MeasurementRow {
        let http_outcome = Some(self.http.outcome());
        MeasurementRow {
            run_id: stamp.run_id.clone(),
            vantage: stamp.vantage.clone(),
            timestamp,
            domain: entry.domain.clone(),
            category: entry.category.clone(),
            subcategory: entry.subcategory.clone(),
            tcp_80_ok: self.tcp_80.ok,
            tcp_80_error: self.tcp_80.error,
            tcp_443_ok: self.tcp_443.ok,
            tcp_443_error: self.tcp_443.error,
            dns_local_ok: self.dns.local.ok,
            dns_local_ips: self.dns.local.joined_addresses(),
            dns_local_error: self.dns.local.error,
            dns_public_ok: self.dns.public.ok,
            dns_public_ips: self.dns.public.joined_addresses(),
            dns_public_error: self.dns.public.error,
            http_final_url: self.http.final_url,
            http_status_code: self.http.status,
            http_outcome,
            http_errors: self.http.errors,
            http_body_snippet: self.http.snippet,
            tls_ok: self.tls.ok,
            tls_issuer: self.tls.issuer,
            tls_not_before: self.tls.not_before,
            tls_not_after: self.tls.not_after,
            tls_error: self.tls.error,
        }
    }
}

/// Reject names no probe could ever reach
fn validate_domain(domain: &str) -> Result<()> {
    let reason = if domain.is_empty() {
        "empty domain"
    } else if domain.len() > 253 {
        "longer than 253 characters"
    } else if domain.chars().any(|c| c.is_whitespace() || matches!(c, '/' | ':' | '@' | '?' | '#')) {
        "contains characters not allowed in a host name"
    } else {
        return Ok(());
    };
    Err(MeasureError::InvalidDomain {
        domain: domain.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vantage_core::{HttpOutcome, ProbeError, ProbeErrorKind};

    fn stamp() -> RunStamp {
        RunStamp::starting_at("IN-home", Utc.with_ymd_and_hms(2025, 12, 11, 12, 0, 0).unwrap())
    }

    #[test]
    fn validation_rejects_unreachable_names() {
        assert!(validate_domain("example.in").is_ok());
        assert!(validate_domain("").is_err());
        assert!(validate_domain("bad domain.in").is_err());
        assert!(validate_domain("https://example.in/").is_err());
        assert!(validate_domain(&"a".repeat(254)).is_err());
    }

    #[test]
    fn evidence_flattens_into_row() {
        let mut evidence = Evidence::default();
        evidence.tcp_443.ok = true;
        evidence.dns.local.ok = true;
        evidence.dns.local.addresses = vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()];
        evidence.dns.public.error = Some(ProbeError::new(ProbeErrorKind::Dns, "SERVFAIL"));
        evidence.http.status = Some(200);
        evidence.http.final_url = "https://example.in/".into();
        evidence.http.snippet = "<html>ok</html>".into();
        evidence.tls.ok = true;
        evidence.tls.issuer = "commonName=R3".into();

        let entry = DomainEntry::new("example.in", "News", "national");
        let row = evidence.into_row(&stamp(), &entry, "2025-12-11T12:00:01Z".into());

        assert_eq!(row.run_id, "20251211T120000Z");
        assert_eq!(row.vantage, "IN-home");
        assert_eq!(row.domain, "example.in");
        assert_eq!(row.dns_local_ips, "10.0.0.1;10.0.0.2");
        assert!(!row.dns_public_ok);
        assert_eq!(row.http_outcome, Some(HttpOutcome::Success));
        assert!(row.tcp_443_ok && !row.tcp_80_ok);
        assert_eq!(row.issuer(), Some("commonName=R3"));
    }

    #[test]
    fn empty_evidence_is_no_response() {
        let entry = DomainEntry::new("example.in", "", "");
        let row = Evidence::default().into_row(&stamp(), &entry, "t".into());
        assert_eq!(row.http_outcome, Some(HttpOutcome::NoResponse));
        assert!(row.http_status_code.is_none() && row.http_errors.is_empty());
    }

    #[tokio::test]
    async fn invalid_domain_still_yields_a_row() {
        let Ok(measurer) = DomainMeasurer::new(&RunConfig::default()) else {
            // No system resolver configuration available
            return;
        };
        let entry = DomainEntry::new("not a domain", "News", "");
        let row = measurer.measure(&entry, &stamp()).await;

        assert_eq!(row.domain, "not a domain");
        assert!(!row.timestamp.is_empty());
        assert_eq!(row.http_outcome, Some(HttpOutcome::OtherError));
        let err = row.tcp_80_error.unwrap();
        assert_eq!(err.kind, ProbeErrorKind::Pipeline);
        assert!(err.detail.starts_with("Pipeline error: invalid domain"));
    }

    async fn exploding_probes() -> Evidence {
        panic!("resolver exploded")
    }

    #[tokio::test]
    async fn panicking_probes_degrade_to_pipeline_row() {
        let entry = DomainEntry::new("example.in", "News", "national");
        let row = settle(exploding_probes(), &stamp(), &entry, "2025-12-11T12:00:01Z".into()).await;

        assert_eq!(row.domain, "example.in");
        assert_eq!(row.category, "News");
        assert_eq!(row.run_id, "20251211T120000Z");
        assert_eq!(row.http_outcome, Some(HttpOutcome::OtherError));
        assert!(!row.tcp_80_ok && !row.tcp_443_ok && !row.dns_local_ok && !row.dns_public_ok && !row.tls_ok);

        let errors = [
            row.tcp_80_error.clone(),
            row.tcp_443_error.clone(),
            row.dns_local_error.clone(),
            row.dns_public_error.clone(),
            row.tls_error.clone(),
            row.http_errors.first().cloned(),
        ];
        for err in errors {
            let err = err.unwrap();
            assert_eq!(err.kind, ProbeErrorKind::Pipeline);
            assert!(err.detail.starts_with("Pipeline error: measurement task failed"));
            assert_eq!(err.to_string().split(": ").next(), Some("pipeline"));
        }
    }

    #[tokio::test]
    async fn completed_probes_flatten_normally() {
        let entry = DomainEntry::new("example.in", "", "");
        let row = settle(async { Evidence::default() }, &stamp(), &entry, "t".into()).await;
        assert_eq!(row.http_outcome, Some(HttpOutcome::NoResponse));
        assert!(row.tcp_80_error.is_none());
    }
}
