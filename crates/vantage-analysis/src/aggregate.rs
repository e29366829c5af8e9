//! Latest-run aggregation for one vantage.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use vantage_core::{HttpOutcome, MeasurementRow};

use crate::error::{AnalysisError, Result};
use crate::tally::Tally;

/// One domain reduced over the rows of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainAggregate {
    /// Domain name
    pub domain: String,
    /// Category of the first row seen
    pub category: String,
    /// Subcategory of the first row seen
    pub subcategory: String,
    /// Most frequent non-null outcome
    pub http_outcome: Option<HttpOutcome>,
    /// Most frequent status code
    pub status_code: Option<u16>,
    /// Most frequent non-empty issuer
    pub tls_issuer: Option<String>,
    /// Any row was classified as a block page
    pub blockpage: bool,
    /// Rows that went into this aggregate
    pub rows: usize,
}

/// Aggregates of one vantage's latest run, ordered by domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunAggregate {
    /// Vantage label
    pub vantage: String,
    /// Selected run
    pub run_id: String,
    /// Per-domain aggregates, sorted by domain
    pub domains: Vec<DomainAggregate>,
}

impl RunAggregate {
    /// Look up a domain
    #[must_use]
    pub fn get(&self, domain: &str) -> Option<&DomainAggregate> {
        self.domains
            .binary_search_by(|d| d.domain.as_str().cmp(domain))
            .ok()
            .map(|i| &self.domains[i])
    }
}

/// Greatest run id recorded for a vantage
#[must_use]
pub fn latest_run_id<'a>(rows: &'a [MeasurementRow], vantage: &str) -> Option<&'a str> {
    rows.iter()
        .filter(|r| r.vantage == vantage)
        .map(|r| r.run_id.as_str())
        .max()
}

/// Reduce the latest run of `vantage` to one aggregate per domain.
///
/// Rows of other runs are never mixed in. An unknown vantage, or a selected
/// run left without rows, is an error rather than an empty result.
pub fn aggregate_latest(rows: &[MeasurementRow], vantage: &str) -> Result<RunAggregate> {
    let run_id = latest_run_id(rows, vantage).ok_or_else(|| AnalysisError::NoRowsForVantage {
        vantage: vantage.to_string(),
    })?;

    let run_rows: Vec<&MeasurementRow> = rows
        .iter()
        .filter(|r| r.vantage == vantage && r.run_id == run_id)
        .collect();
    if run_rows.is_empty() {
        return Err(AnalysisError::EmptyRun {
            vantage: vantage.to_string(),
            run_id: run_id.to_string(),
        });
    }

    let mut grouped: BTreeMap<&str, Vec<&MeasurementRow>> = BTreeMap::new();
    for row in run_rows {
        grouped.entry(row.domain.as_str()).or_default().push(row);
    }

    let domains: Vec<DomainAggregate> = grouped
        .into_iter()
        .map(|(domain, rows)| reduce_domain(domain, &rows))
        .collect();

    debug!(vantage, run_id, domains = domains.len(), "aggregated latest run");
    Ok(RunAggregate {
        vantage: vantage.to_string(),
        run_id: run_id.to_string(),
        domains,
    })
}

fn reduce_domain(domain: &str, rows: &[&MeasurementRow]) -> DomainAggregate {
    let first = rows[0];
    let outcomes: Tally<HttpOutcome> = rows.iter().filter_map(|r| r.http_outcome).collect();
    let statuses: Tally<u16> = rows.iter().filter_map(|r| r.http_status_code).collect();
    let issuers: Tally<&str> = rows.iter().filter_map(|r| r.issuer()).collect();

    DomainAggregate {
        domain: domain.to_string(),
        category: first.category.clone(),
        subcategory: first.subcategory.clone(),
        http_outcome: outcomes.most_common().copied(),
        status_code: statuses.most_common().copied(),
        tls_issuer: issuers.most_common().map(|s| (*s).to_string()),
        blockpage: rows.iter().any(|r| r.is_blockpage()),
        rows: rows.len(),
    }
}

/// Domains with at least one block page at `vantage`, across all runs
#[must_use]
pub fn blockpage_domains(rows: &[MeasurementRow], vantage: &str) -> BTreeSet<String> {
    rows.iter()
        .filter(|r| r.vantage == vantage && r.is_blockpage())
        .map(|r| r.domain.clone())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use vantage_core::{DomainEntry, RunStamp};

    /// Minimal row builder shared by this crate's tests
    pub(crate) fn row(
        run_id: &str,
        vantage: &str,
        domain: &str,
        outcome: Option<HttpOutcome>,
        status: Option<u16>,
        issuer: &str,
    ) -> MeasurementRow {
        let stamp = RunStamp {
            run_id: run_id.to_string(),
            vantage: vantage.to_string(),
        };
        let entry = DomainEntry::new(domain, "News", "national");
        let mut row = MeasurementRow::pipeline_failure(&stamp, &entry, "2025-01-01T00:00:00Z".into(), "x");
        row.http_outcome = outcome;
        row.http_status_code = status;
        row.tls_issuer = issuer.to_string();
        row
    }

    #[test]
    fn only_latest_run_is_aggregated() {
        let rows = vec![
            row("20250101T000000Z", "IN-home", "a.in", Some(HttpOutcome::Timeout), None, ""),
            row("20250102T000000Z", "IN-home", "a.in", Some(HttpOutcome::Success), Some(200), "commonName=R3"),
            row("20250103T000000Z", "VPN-EU", "a.in", Some(HttpOutcome::ServerError), Some(500), ""),
        ];
        let agg = aggregate_latest(&rows, "IN-home").unwrap();
        assert_eq!(agg.run_id, "20250102T000000Z");
        assert_eq!(agg.domains.len(), 1);
        let a = agg.get("a.in").unwrap();
        assert_eq!(a.http_outcome, Some(HttpOutcome::Success));
        assert_eq!(a.status_code, Some(200));
        assert_eq!(a.tls_issuer.as_deref(), Some("commonName=R3"));
        assert_eq!(a.rows, 1);
    }

    #[test]
    fn most_frequent_values_win_with_first_seen_ties() {
        let run = "20250101T000000Z";
        let rows = vec![
            row(run, "IN-home", "b.in", None, None, ""),
            row(run, "IN-home", "b.in", Some(HttpOutcome::Timeout), None, "commonName=X"),
            row(run, "IN-home", "b.in", Some(HttpOutcome::Success), Some(200), "commonName=Y"),
            row(run, "IN-home", "b.in", Some(HttpOutcome::Success), Some(200), ""),
            row(run, "IN-home", "b.in", Some(HttpOutcome::Timeout), None, ""),
        ];
        let agg = aggregate_latest(&rows, "IN-home").unwrap();
        let b = agg.get("b.in").unwrap();
        assert_eq!(b.http_outcome, Some(HttpOutcome::Timeout));
        assert_eq!(b.tls_issuer.as_deref(), Some("commonName=X"));
        assert_eq!(b.rows, 5);
    }

    #[test]
    fn output_is_ordered_by_domain() {
        let run = "20250101T000000Z";
        let rows = vec![
            row(run, "IN-home", "z.in", None, None, ""),
            row(run, "IN-home", "a.in", None, None, ""),
            row(run, "IN-home", "m.in", None, None, ""),
        ];
        let agg = aggregate_latest(&rows, "IN-home").unwrap();
        let names: Vec<_> = agg.domains.iter().map(|d| d.domain.as_str()).collect();
        assert_eq!(names, ["a.in", "m.in", "z.in"]);
        assert!(agg.get("q.in").is_none());
    }

    #[test]
    fn unknown_vantage_is_an_error() {
        let rows = vec![row("20250101T000000Z", "IN-home", "a.in", None, None, "")];
        assert_eq!(
            aggregate_latest(&rows, "VPN-EU"),
            Err(AnalysisError::NoRowsForVantage {
                vantage: "VPN-EU".into()
            })
        );
        assert!(aggregate_latest(&[], "IN-home").is_err());
    }

    #[test]
    fn blockpage_flag_and_seen_set() {
        let rows = vec![
            row("20250101T000000Z", "IN-home", "a.in", Some(HttpOutcome::BlockpageIndia), Some(200), ""),
            row("20250102T000000Z", "IN-home", "a.in", Some(HttpOutcome::Success), Some(200), ""),
            row("20250102T000000Z", "IN-home", "b.in", Some(HttpOutcome::BlockpageIndia), Some(200), ""),
            row("20250102T000000Z", "VPN-EU", "c.in", Some(HttpOutcome::BlockpageIndia), Some(200), ""),
        ];
        let agg = aggregate_latest(&rows, "IN-home").unwrap();
        assert!(!agg.get("a.in").unwrap().blockpage);
        assert!(agg.get("b.in").unwrap().blockpage);

        let seen = blockpage_domains(&rows, "IN-home");
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), ["a.in", "b.in"]);
    }
}
