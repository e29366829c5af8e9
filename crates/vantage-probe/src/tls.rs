//! TLS handshake probe and leaf certificate inspection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;
use vantage_core::{ProbeError, ProbeErrorKind};
use x509_parser::oid_registry::{
    Oid, OID_X509_COMMON_NAME, OID_X509_COUNTRY_NAME, OID_X509_LOCALITY_NAME,
    OID_X509_ORGANIZATIONAL_UNIT, OID_X509_ORGANIZATION_NAME, OID_X509_STATE_OR_PROVINCE_NAME,
};
use x509_parser::time::ASN1Time;
use x509_parser::x509::X509Name;

use crate::config::RunConfig;
use crate::error::{MeasureError, Result};
use crate::failure;

/// Format of the validity window fields
pub const CERT_TIME_FORMAT: &str = "%b %e %H:%M:%S %Y GMT";

/// Certificate facts from a successful handshake; empty fields on failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TlsResult {
    /// Handshake completed and the chain validated
    pub ok: bool,
    /// Issuer DN as `key=value` pairs joined by `, `
    pub issuer: String,
    /// Validity start
    pub not_before: String,
    /// Validity end
    pub not_after: String,
    /// Failure, if any
    pub error: Option<ProbeError>,
}

impl TlsResult {
    fn failed(error: ProbeError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Performs validating handshakes against the webpki root set.
#[derive(Clone)]
pub struct TlsProbe {
    connector: TlsConnector,
    timeout: Duration,
}

impl TlsProbe {
    /// Build the shared connector
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let client = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| MeasureError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(client)),
            timeout: config.tls_timeout,
        })
    }

    /// Handshake with `domain:port`, using the domain as server name
    pub async fn inspect(&self, domain: &str, port: u16) -> TlsResult {
        let server_name = match ServerName::try_from(domain.to_string()) {
            Ok(name) => name,
            Err(e) => {
                return TlsResult::failed(ProbeError::new(
                    ProbeErrorKind::Tls,
                    format!("invalid server name {domain:?}: {e}"),
                ))
            }
        };

        let handshake = async {
            let tcp = TcpStream::connect((domain, port)).await?;
            self.connector.connect(server_name, tcp).await
        };

        let stream = match tokio::time::timeout(self.timeout, handshake).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                debug!(domain, port, error = %e, "tls handshake failed");
                return TlsResult::failed(failure::from_io(&e));
            }
            Err(_) => return TlsResult::failed(failure::timed_out(self.timeout)),
        };

        let (_, session) = stream.get_ref();
        let Some(leaf) = session.peer_certificates().and_then(<[_]>::first) else {
            return TlsResult::failed(ProbeError::new(
                ProbeErrorKind::Tls,
                "server presented no certificate",
            ));
        };

        match x509_parser::parse_x509_certificate(leaf.as_ref()) {
            Ok((_, cert)) => TlsResult {
                ok: true,
                issuer: flatten_name(cert.issuer()),
                not_before: format_time(cert.validity().not_before),
                not_after: format_time(cert.validity().not_after),
                error: None,
            },
            Err(e) => TlsResult::failed(ProbeError::new(
                ProbeErrorKind::Tls,
                format!("certificate parse failed: {e}"),
            )),
        }
    }
}

/// `commonName=R3, organizationName=Let's Encrypt, countryName=US`
fn flatten_name(name: &X509Name<'_>) -> String {
    name.iter_attributes()
        .map(|attr| {
            let value = attr
                .as_str()
                .map_or_else(|_| String::from_utf8_lossy(attr.as_slice()).into_owned(), str::to_string);
            format!("{}={value}", attribute_name(attr.attr_type()))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn attribute_name(oid: &Oid<'_>) -> String {
    let known = [
        (OID_X509_COMMON_NAME, "commonName"),
        (OID_X509_COUNTRY_NAME, "countryName"),
        (OID_X509_ORGANIZATION_NAME, "organizationName"),
        (OID_X509_ORGANIZATIONAL_UNIT, "organizationalUnitName"),
        (OID_X509_LOCALITY_NAME, "localityName"),
        (OID_X509_STATE_OR_PROVINCE_NAME, "stateOrProvinceName"),
    ];
    known
        .iter()
        .find(|(candidate, _)| candidate == oid)
        .map_or_else(|| oid.to_id_string(), |(_, label)| (*label).to_string())
}

fn format_time(t: ASN1Time) -> String {
    let at: DateTime<Utc> = Utc.timestamp_opt(t.timestamp(), 0).single().unwrap_or_default();
    at.format(CERT_TIME_FORMAT).to_string()
}
