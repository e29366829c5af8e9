//! Descriptive report over a single run.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use vantage_core::MeasurementRow;

use crate::aggregate::latest_run_id;
use crate::error::{AnalysisError, Result};
use crate::tally::Tally;

/// Issuer label for rows without a certificate
pub const NO_CERT: &str = "NO_CERT";

/// Outcome label for rows without a classified outcome
pub const NO_OUTCOME: &str = "none";

const TOP_ISSUERS: usize = 15;

/// A domain the public resolver answered while the local one did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsMismatch {
    /// Domain name
    pub domain: String,
    /// Category bucket
    pub category: String,
    /// Local resolver error
    pub dns_local_error: String,
}

/// Summary statistics for one vantage's run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Vantage the report covers
    pub vantage: String,
    /// Run the report covers
    pub run_id: String,
    /// Rows in the run
    pub rows: usize,
    /// Distinct domains in the run
    pub domains: usize,
    /// Outcome label and row count, most frequent first
    pub outcome_counts: Vec<(String, usize)>,
    /// Category, then outcome, then number of distinct domains
    pub outcomes_by_category: BTreeMap<String, BTreeMap<String, usize>>,
    /// Most frequent issuers, at most 15
    pub top_issuers: Vec<(String, usize)>,
    /// Share of rows where the local resolver succeeded
    pub dns_local_ok_fraction: f64,
    /// Share of rows where the public resolver succeeded
    pub dns_public_ok_fraction: f64,
    /// Rows where only the public resolver succeeded
    pub dns_mismatches: Vec<DnsMismatch>,
}

/// Pick the rows a report covers.
///
/// With a vantage, its latest run. Without one, the latest run overall at
/// the vantage contributing the most rows to it (first seen on ties).
pub fn select_run<'a>(
    rows: &'a [MeasurementRow],
    vantage: Option<&str>,
) -> Result<(String, String, Vec<&'a MeasurementRow>)> {
    let (vantage, run_id) = match vantage {
        Some(v) => {
            let run = latest_run_id(rows, v).ok_or_else(|| AnalysisError::NoRowsForVantage {
                vantage: v.to_string(),
            })?;
            (v.to_string(), run.to_string())
        }
        None => {
            let run = rows
                .iter()
                .map(|r| r.run_id.as_str())
                .max()
                .ok_or(AnalysisError::NoRows)?;
            let busiest = rows
                .iter()
                .filter(|r| r.run_id == run)
                .map(|r| r.vantage.as_str())
                .collect::<Tally<_>>()
                .most_common()
                .map(|v| (*v).to_string())
                .ok_or(AnalysisError::NoRows)?;
            (busiest, run.to_string())
        }
    };

    let selected: Vec<&MeasurementRow> = rows
        .iter()
        .filter(|r| r.vantage == vantage && r.run_id == run_id)
        .collect();
    if selected.is_empty() {
        return Err(AnalysisError::EmptyRun { vantage, run_id });
    }
    Ok((vantage, run_id, selected))
}

/// Build the report for the selected run
pub fn run_report(rows: &[MeasurementRow], vantage: Option<&str>) -> Result<RunReport> {
    let (vantage, run_id, selected) = select_run(rows, vantage)?;

    let outcome_label = |r: &MeasurementRow| {
        r.http_outcome
            .map_or_else(|| NO_OUTCOME.to_string(), |o| o.as_str().to_string())
    };

    let outcome_counts = selected.iter().map(|r| outcome_label(r)).collect::<Tally<_>>().ranked();

    let mut by_category: BTreeMap<String, BTreeMap<String, BTreeSet<&str>>> = BTreeMap::new();
    for r in &selected {
        by_category
            .entry(r.category.clone())
            .or_default()
            .entry(outcome_label(r))
            .or_default()
            .insert(r.domain.as_str());
    }
    let outcomes_by_category = by_category
        .into_iter()
        .map(|(category, outcomes)| {
            let counts = outcomes.into_iter().map(|(o, d)| (o, d.len())).collect();
            (category, counts)
        })
        .collect();

    let mut top_issuers = selected
        .iter()
        .map(|r| r.issuer().unwrap_or(NO_CERT).to_string())
        .collect::<Tally<_>>()
        .ranked();
    top_issuers.truncate(TOP_ISSUERS);

    let total = selected.len();
    let local_ok = selected.iter().filter(|r| r.dns_local_ok).count();
    let public_ok = selected.iter().filter(|r| r.dns_public_ok).count();
    let dns_mismatches = selected
        .iter()
        .filter(|r| r.dns_public_ok && !r.dns_local_ok)
        .map(|r| DnsMismatch {
            domain: r.domain.clone(),
            category: r.category.clone(),
            dns_local_error: r
                .dns_local_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        })
        .collect();

    let domains = selected.iter().map(|r| r.domain.as_str()).collect::<BTreeSet<_>>().len();

    Ok(RunReport {
        vantage,
        run_id,
        rows: total,
        domains,
        outcome_counts,
        outcomes_by_category,
        top_issuers,
        dns_local_ok_fraction: fraction(local_ok, total),
        dns_public_ok_fraction: fraction(public_ok, total),
        dns_mismatches,
    })
}

#[allow(clippy::cast_precision_loss)]
fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::row;
    use vantage_core::{HttpOutcome, ProbeError, ProbeErrorKind};

    fn sample() -> Vec<MeasurementRow> {
        let mut rows = vec![
            row("20250101T000000Z", "IN-home", "old.in", Some(HttpOutcome::Timeout), None, ""),
            row("20250102T000000Z", "IN-home", "a.in", Some(HttpOutcome::Success), Some(200), "commonName=R3"),
            row("20250102T000000Z", "IN-home", "b.in", Some(HttpOutcome::Success), Some(200), ""),
            row("20250102T000000Z", "IN-home", "c.in", Some(HttpOutcome::BlockpageIndia), Some(200), ""),
            row("20250102T000000Z", "VPN-EU", "a.in", Some(HttpOutcome::Success), Some(200), ""),
        ];
        rows[1].dns_local_ok = true;
        rows[1].dns_public_ok = true;
        rows[2].dns_public_ok = true;
        rows[2].dns_local_error = Some(ProbeError::new(ProbeErrorKind::Dns, "NXDOMAIN"));
        rows
    }

    #[test]
    fn without_vantage_picks_busiest_vantage_of_latest_run() {
        let rows = sample();
        let (vantage, run, selected) = select_run(&rows, None).unwrap();
        assert_eq!(vantage, "IN-home");
        assert_eq!(run, "20250102T000000Z");
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn report_counts_the_selected_run() {
        let rows = sample();
        let report = run_report(&rows, Some("IN-home")).unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.domains, 3);
        assert_eq!(
            report.outcome_counts,
            vec![("success".to_string(), 2), ("blockpage_india".to_string(), 1)]
        );
        assert_eq!(report.outcomes_by_category["News"]["success"], 2);
        assert_eq!(report.top_issuers[0], (NO_CERT.to_string(), 2));
        assert!((report.dns_local_ok_fraction - 1.0 / 3.0).abs() < 1e-9);
        assert!((report.dns_public_ok_fraction - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.dns_mismatches.len(), 1);
        assert_eq!(report.dns_mismatches[0].domain, "b.in");
        assert_eq!(report.dns_mismatches[0].dns_local_error, "dns: NXDOMAIN");
    }

    #[test]
    fn empty_store_is_an_error() {
        assert_eq!(select_run(&[], None).unwrap_err(), AnalysisError::NoRows);
        assert!(run_report(&sample(), Some("VPN-US")).is_err());
    }
}
