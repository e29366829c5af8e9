//! Derived per-domain tables.
//!
//! None of these are ground truth: each is recomputed from the raw rows (and
//! the external feed) on demand.

use serde::{Deserialize, Serialize};

use super::labels::{CensorshipClass, DiffLabel};
use super::lenient;
use super::outcome::HttpOutcome;

/// Per-domain external feed statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedAggregate {
    /// Domain name
    pub domain: String,
    /// Number of feed measurements for the domain
    pub total_measurements: u64,
    /// Measurements with a failure, anomaly or blocking signal
    pub failure_count: u64,
    /// `failure_count / total_measurements`, `0.0` when there are none
    pub failure_rate: f64,
}

impl FeedAggregate {
    /// Aggregate for a domain the feed never measured
    #[must_use]
    pub fn empty(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Build from counts, guarding against division by zero
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(domain: impl Into<String>, total: u64, failures: u64) -> Self {
        let failure_rate = if total == 0 {
            0.0
        } else {
            failures as f64 / total as f64
        };
        Self {
            domain: domain.into(),
            total_measurements: total,
            failure_count: failures,
            failure_rate,
        }
    }
}

/// One domain's latest-run summary at the local vantage, joined with the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    /// Domain name
    pub domain: String,
    /// Category bucket
    #[serde(default)]
    pub category: String,
    /// Free-text subcategory
    #[serde(default)]
    pub subcategory: String,
    /// Most frequent outcome in the latest run
    #[serde(default)]
    pub local_http_outcome: Option<HttpOutcome>,
    /// Most frequent issuer in the latest run
    #[serde(default, deserialize_with = "lenient::non_empty")]
    pub local_tls_issuer: Option<String>,
    /// Feed measurement count
    #[serde(default)]
    pub feed_total_measurements: u64,
    /// Feed failure count
    #[serde(default)]
    pub feed_failure_count: u64,
    /// Feed failure rate, never missing
    #[serde(default)]
    pub feed_failure_rate: f64,
}

/// One domain's outcome at two vantages, with the derived diff label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VantageComparison {
    /// Domain name
    pub domain: String,
    /// Category bucket
    #[serde(default)]
    pub category: String,
    /// Free-text subcategory
    #[serde(default)]
    pub subcategory: String,
    /// Local most frequent outcome
    #[serde(default)]
    pub local_http_outcome: Option<HttpOutcome>,
    /// Local most frequent status code
    #[serde(default, deserialize_with = "lenient::status_code")]
    pub local_status_code: Option<u16>,
    /// Any local row was a block page
    #[serde(deserialize_with = "lenient::bool_flag")]
    pub local_blockpage_flag: bool,
    /// Remote most frequent outcome; null when the remote never measured the domain
    #[serde(default)]
    pub remote_http_outcome: Option<HttpOutcome>,
    /// Remote most frequent status code
    #[serde(default, deserialize_with = "lenient::status_code")]
    pub remote_status_code: Option<u16>,
    /// Any remote row was a block page; null when unmatched
    #[serde(default, deserialize_with = "lenient::optional_bool_flag")]
    pub remote_blockpage_flag: Option<bool>,
    /// Derived verdict
    pub vantage_diff_flag: DiffLabel,
}

/// The classification output consumed by dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSummary {
    /// Domain name
    pub domain: String,
    /// Category bucket
    #[serde(default)]
    pub category: String,
    /// Free-text subcategory
    #[serde(default)]
    pub subcategory: String,
    /// Most frequent local outcome
    #[serde(default)]
    pub local_http_outcome: Option<HttpOutcome>,
    /// Most frequent local issuer
    #[serde(default, deserialize_with = "lenient::non_empty")]
    pub local_tls_issuer: Option<String>,
    /// Feed measurement count
    #[serde(default)]
    pub feed_total_measurements: u64,
    /// Feed failure count
    #[serde(default)]
    pub feed_failure_count: u64,
    /// Feed failure rate
    #[serde(default)]
    pub feed_failure_rate: f64,
    /// Cross-vantage verdict, `unknown` without a comparison
    #[serde(default)]
    pub vantage_diff_flag: DiffLabel,
    /// Final verdict
    pub censorship_class: CensorshipClass,
}

impl EnrichedSummary {
    /// Attach the derived labels to a summary row
    #[must_use]
    pub fn from_summary(summary: DomainSummary, diff: DiffLabel, class: CensorshipClass) -> Self {
        Self {
            domain: summary.domain,
            category: summary.category,
            subcategory: summary.subcategory,
            local_http_outcome: summary.local_http_outcome,
            local_tls_issuer: summary.local_tls_issuer,
            feed_total_measurements: summary.feed_total_measurements,
            feed_failure_count: summary.feed_failure_count,
            feed_failure_rate: summary.feed_failure_rate,
            vantage_diff_flag: diff,
            censorship_class: class,
        }
    }
}

/// One cleaned external feed measurement.
///
/// Signal columns keep the feed's own rendering; truthiness is decided at
/// aggregation time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedRecord {
    /// Measurement start time as reported by the feed
    #[serde(default)]
    pub measurement_start_time: String,
    /// Normalized bare domain
    pub domain: String,
    /// Original tested input (usually a URL)
    #[serde(default)]
    pub input: String,
    /// Probe country code
    #[serde(default)]
    pub probe_cc: String,
    /// Probe network
    #[serde(default)]
    pub probe_asn: String,
    /// Feed test name
    #[serde(default)]
    pub test_name: String,
    /// Transport failure, if any
    #[serde(default)]
    pub failure: String,
    /// Feed anomaly flag
    #[serde(default)]
    pub anomaly: String,
    /// Analysis-level anomaly flag
    #[serde(default)]
    pub analysis_anomaly: String,
    /// General blocking signal
    #[serde(default)]
    pub blocking_general: String,
    /// Blocking type, if classified
    #[serde(default)]
    pub blocking_type: String,
}
