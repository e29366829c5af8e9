//! Raw measurement rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;
use super::outcome::HttpOutcome;
use super::probe_error::{error_list, ProbeError};

/// Format of run identifiers; lexicographic order equals time order
pub const RUN_ID_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Format of per-row timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Build a run identifier such as `20251211T123456Z`
#[must_use]
pub fn run_id_at(now: DateTime<Utc>) -> String {
    now.format(RUN_ID_FORMAT).to_string()
}

/// Build a row timestamp such as `2025-12-11T12:34:56Z`
#[must_use]
pub fn timestamp_at(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// One entry of the domain list that is eligible for probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEntry {
    /// Domain name, trimmed
    pub domain: String,
    /// Category bucket (e.g. `Civil Society & NGOs`)
    #[serde(default)]
    pub category: String,
    /// Free-text subcategory
    #[serde(default)]
    pub subcategory: String,
}

impl DomainEntry {
    /// Create a new entry
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        category: impl Into<String>,
        subcategory: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }
}

/// Identity of the run a row belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    /// Time-sortable run identifier
    pub run_id: String,
    /// Vantage label
    pub vantage: String,
}

impl RunStamp {
    /// Create a stamp for a new run starting at `now`
    #[must_use]
    pub fn starting_at(vantage: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id_at(now),
            vantage: vantage.into(),
        }
    }
}

/// One domain measured once from one vantage during one run.
///
/// Field order is the store's column order. Rows are append-only: once
/// written they are never rewritten except by a schema upgrade, which only
/// adds columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    /// Run identifier
    pub run_id: String,
    /// Vantage label
    pub vantage: String,
    /// When the domain measurement started
    #[serde(rename = "timestamp_utc")]
    pub timestamp: String,
    /// Domain name
    pub domain: String,
    /// Category bucket
    #[serde(default)]
    pub category: String,
    /// Free-text subcategory
    #[serde(default)]
    pub subcategory: String,

    /// TCP connect to port 80 succeeded
    #[serde(deserialize_with = "lenient::bool_flag")]
    pub tcp_80_ok: bool,
    /// TCP port 80 failure
    #[serde(default)]
    pub tcp_80_error: Option<ProbeError>,
    /// TCP connect to port 443 succeeded
    #[serde(deserialize_with = "lenient::bool_flag")]
    pub tcp_443_ok: bool,
    /// TCP port 443 failure
    #[serde(default)]
    pub tcp_443_error: Option<ProbeError>,

    /// System resolver returned at least one address
    #[serde(deserialize_with = "lenient::bool_flag")]
    pub dns_local_ok: bool,
    /// System resolver addresses, `;`-joined
    #[serde(default)]
    pub dns_local_ips: String,
    /// System resolver failure
    #[serde(default)]
    pub dns_local_error: Option<ProbeError>,
    /// Public resolver returned at least one address
    #[serde(deserialize_with = "lenient::bool_flag")]
    pub dns_public_ok: bool,
    /// Public resolver addresses, `;`-joined
    #[serde(default)]
    pub dns_public_ips: String,
    /// Public resolver failure
    #[serde(default)]
    pub dns_public_error: Option<ProbeError>,

    /// URL after redirects, empty if no response
    #[serde(default)]
    pub http_final_url: String,
    /// Status code of the response, if any
    #[serde(default, deserialize_with = "lenient::status_code")]
    pub http_status_code: Option<u16>,
    /// Classified outcome
    #[serde(default)]
    pub http_outcome: Option<HttpOutcome>,
    /// One error per failed attempt
    #[serde(rename = "http_error", default, with = "error_list")]
    pub http_errors: Vec<ProbeError>,
    /// Bounded prefix of the decoded body
    #[serde(default)]
    pub http_body_snippet: String,

    /// TLS handshake succeeded
    #[serde(deserialize_with = "lenient::bool_flag")]
    pub tls_ok: bool,
    /// Flattened issuer distinguished name
    #[serde(default)]
    pub tls_issuer: String,
    /// Certificate validity start
    #[serde(default)]
    pub tls_not_before: String,
    /// Certificate validity end
    #[serde(default)]
    pub tls_not_after: String,
    /// TLS failure
    #[serde(default)]
    pub tls_error: Option<ProbeError>,
}

impl MeasurementRow {
    /// Column names in store order
    pub const COLUMNS: [&'static str; 26] = [
        "run_id",
        "vantage",
        "timestamp_utc",
        "domain",
        "category",
        "subcategory",
        "tcp_80_ok",
        "tcp_80_error",
        "tcp_443_ok",
        "tcp_443_error",
        "dns_local_ok",
        "dns_local_ips",
        "dns_local_error",
        "dns_public_ok",
        "dns_public_ips",
        "dns_public_error",
        "http_final_url",
        "http_status_code",
        "http_outcome",
        "http_error",
        "http_body_snippet",
        "tls_ok",
        "tls_issuer",
        "tls_not_before",
        "tls_not_after",
        "tls_error",
    ];

    /// A row where every check failed with the same pipeline error.
    ///
    /// Used when measuring a domain fails outside of any probe, so that the
    /// domain still appears in the run.
    #[must_use]
    pub fn pipeline_failure(
        stamp: &RunStamp,
        entry: &DomainEntry,
        timestamp: String,
        message: &str,
    ) -> Self {
        let err = ProbeError::pipeline(format!("Pipeline error: {message}"));
        Self {
            run_id: stamp.run_id.clone(),
            vantage: stamp.vantage.clone(),
            timestamp,
            domain: entry.domain.clone(),
            category: entry.category.clone(),
            subcategory: entry.subcategory.clone(),
            tcp_80_ok: false,
            tcp_80_error: Some(err.clone()),
            tcp_443_ok: false,
            tcp_443_error: Some(err.clone()),
            dns_local_ok: false,
            dns_local_ips: String::new(),
            dns_local_error: Some(err.clone()),
            dns_public_ok: false,
            dns_public_ips: String::new(),
            dns_public_error: Some(err.clone()),
            http_final_url: String::new(),
            http_status_code: None,
            http_outcome: Some(HttpOutcome::OtherError),
            http_errors: vec![err.clone()],
            http_body_snippet: String::new(),
            tls_ok: false,
            tls_issuer: String::new(),
            tls_not_before: String::new(),
            tls_not_after: String::new(),
            tls_error: Some(err),
        }
    }

    /// Issuer as an optional value; empty means no certificate
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        Some(self.tls_issuer.as_str()).filter(|s| !s.trim().is_empty())
    }

    /// Returns true if this row was classified as a block page
    #[must_use]
    pub fn is_blockpage(&self) -> bool {
        self.http_outcome.is_some_and(|o| o.is_blockpage())
    }
}
