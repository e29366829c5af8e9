//! Analysis of stored measurement rows.
//!
//! Everything here is a pure function over rows already loaded from disk:
//!
//! - [`aggregate_latest`] reduces a vantage's latest run to one row per domain
//! - [`compare_vantages`] labels each domain by how two vantages disagree
//! - [`aggregate_feed`] and [`summarize`] merge in external failure rates
//! - [`enrich`] assigns each domain a censorship class
//! - [`run_report`] describes a single run
//!
//! # Example
//!
//! ```rust,ignore
//! let comparisons = vantage_analysis::compare_vantages(&rows, "IN-home", "VPN-EU")?;
//! for c in vantage_analysis::suspicious(&comparisons) {
//!     println!("{} {}", c.domain, c.vantage_diff_flag);
//! }
//! ```

pub mod aggregate;
pub mod classify;
pub mod compare;
mod error;
pub mod feed;
mod merge;
pub mod report;
mod tally;

pub use aggregate::{aggregate_latest, blockpage_domains, latest_run_id, DomainAggregate, RunAggregate};
pub use classify::{class_counts, classify_domain, enrich, CensorshipInput, CensorshipRule, CENSORSHIP_RULES};
pub use compare::{compare, compare_vantages, diff_label, suspicious, DiffRule, DiffSignals, DIFF_RULES};
pub use error::{AnalysisError, Result};
pub use feed::{aggregate_feed, is_failure, is_truthy};
pub use merge::{merge_summary, summarize};
pub use report::{run_report, select_run, DnsMismatch, RunReport, NO_CERT};
pub use tally::{most_common, Tally};
