//! Cross-vantage comparison.
//!
//! Each joined domain is labelled by the first matching row of
//! [`DIFF_RULES`]. A `None` cell in a rule matches either value.

use tracing::info;
use vantage_core::{DiffLabel, HttpOutcome, MeasurementRow, VantageComparison};

use crate::aggregate::{aggregate_latest, DomainAggregate, RunAggregate};
use crate::error::Result;

/// The four booleans a diff label is decided from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffSignals {
    /// Local outcome is success or redirect
    pub local_success: bool,
    /// Remote outcome is success or redirect; false when unmatched
    pub remote_success: bool,
    /// Any local row was a block page
    pub local_blockpage: bool,
    /// Any remote row was a block page; false when unmatched
    pub remote_blockpage: bool,
}

/// One row of the decision table.
#[derive(Debug, Clone, Copy)]
pub struct DiffRule {
    /// Required local success, `None` for any
    pub local_success: Option<bool>,
    /// Required remote success
    pub remote_success: Option<bool>,
    /// Required local block page
    pub local_blockpage: Option<bool>,
    /// Required remote block page
    pub remote_blockpage: Option<bool>,
    /// Label when the row matches
    pub label: DiffLabel,
}

impl DiffRule {
    const fn new(
        local_success: Option<bool>,
        remote_success: Option<bool>,
        local_blockpage: Option<bool>,
        remote_blockpage: Option<bool>,
        label: DiffLabel,
    ) -> Self {
        Self {
            local_success,
            remote_success,
            local_blockpage,
            remote_blockpage,
            label,
        }
    }

    /// Returns true if every constrained cell equals the signal
    #[must_use]
    pub fn matches(&self, s: DiffSignals) -> bool {
        fn cell(want: Option<bool>, got: bool) -> bool {
            want.map_or(true, |w| w == got)
        }
        cell(self.local_success, s.local_success)
            && cell(self.remote_success, s.remote_success)
            && cell(self.local_blockpage, s.local_blockpage)
            && cell(self.remote_blockpage, s.remote_blockpage)
    }
}

/// Evaluated top to bottom. Row order is part of the output contract: the
/// remote-blockpage row only matches inputs the local-success/remote-failure
/// row above it has already claimed.
pub const DIFF_RULES: [DiffRule; 7] = [
    DiffRule::new(Some(true), Some(true), None, None, DiffLabel::BothSuccess),
    DiffRule::new(Some(false), Some(true), Some(true), None, DiffLabel::IndiaBlockpageRemoteOk),
    DiffRule::new(Some(false), Some(true), Some(false), None, DiffLabel::IndiaBlockedRemoteOk),
    DiffRule::new(Some(true), Some(false), None, None, DiffLabel::RemoteBlockedIndiaOk),
    DiffRule::new(Some(false), Some(false), None, None, DiffLabel::BothBad),
    DiffRule::new(Some(true), Some(false), None, Some(true), DiffLabel::RemoteBlockpageIndiaOk),
    DiffRule::new(None, None, None, None, DiffLabel::Other),
];

/// First matching rule's label
#[must_use]
pub fn diff_label(signals: DiffSignals) -> DiffLabel {
    DIFF_RULES
        .iter()
        .find(|rule| rule.matches(signals))
        .map_or(DiffLabel::Other, |rule| rule.label)
}

fn is_success(outcome: Option<HttpOutcome>) -> bool {
    outcome.is_some_and(|o| o.is_success())
}

/// Left-join `local` with `remote` on domain and label each row
#[must_use]
pub fn compare(local: &RunAggregate, remote: &RunAggregate) -> Vec<VantageComparison> {
    local
        .domains
        .iter()
        .map(|l| compare_domain(l, remote.get(&l.domain)))
        .collect()
}

fn compare_domain(local: &DomainAggregate, remote: Option<&DomainAggregate>) -> VantageComparison {
    let signals = DiffSignals {
        local_success: is_success(local.http_outcome),
        remote_success: is_success(remote.and_then(|r| r.http_outcome)),
        local_blockpage: local.blockpage,
        remote_blockpage: remote.is_some_and(|r| r.blockpage),
    };
    VantageComparison {
        domain: local.domain.clone(),
        category: local.category.clone(),
        subcategory: local.subcategory.clone(),
        local_http_outcome: local.http_outcome,
        local_status_code: local.status_code,
        local_blockpage_flag: local.blockpage,
        remote_http_outcome: remote.and_then(|r| r.http_outcome),
        remote_status_code: remote.and_then(|r| r.status_code),
        remote_blockpage_flag: remote.map(|r| r.blockpage),
        vantage_diff_flag: diff_label(signals),
    }
}

/// Aggregate both vantages' latest runs and compare them
pub fn compare_vantages(
    rows: &[MeasurementRow],
    local_vantage: &str,
    remote_vantage: &str,
) -> Result<Vec<VantageComparison>> {
    let local = aggregate_latest(rows, local_vantage)?;
    let remote = aggregate_latest(rows, remote_vantage)?;
    let comparisons = compare(&local, &remote);
    info!(
        local = local_vantage,
        local_run = %local.run_id,
        remote = remote_vantage,
        remote_run = %remote.run_id,
        domains = comparisons.len(),
        "compared vantages"
    );
    Ok(comparisons)
}

/// Rows where the local side looks interfered with, in input order
pub fn suspicious(comparisons: &[VantageComparison]) -> impl Iterator<Item = &VantageComparison> {
    comparisons
        .iter()
        .filter(|c| c.vantage_diff_flag.is_local_suspicious())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::row;
    use crate::error::AnalysisError;

    fn signals(ls: bool, rs: bool, lb: bool, rb: bool) -> DiffSignals {
        DiffSignals {
            local_success: ls,
            remote_success: rs,
            local_blockpage: lb,
            remote_blockpage: rb,
        }
    }

    #[test]
    fn each_rule_fires_for_its_row() {
        assert_eq!(diff_label(signals(true, true, false, false)), DiffLabel::BothSuccess);
        assert_eq!(diff_label(signals(true, true, true, true)), DiffLabel::BothSuccess);
        assert_eq!(diff_label(signals(false, true, true, false)), DiffLabel::IndiaBlockpageRemoteOk);
        assert_eq!(diff_label(signals(false, true, false, false)), DiffLabel::IndiaBlockedRemoteOk);
        assert_eq!(diff_label(signals(true, false, false, false)), DiffLabel::RemoteBlockedIndiaOk);
        assert_eq!(diff_label(signals(false, false, true, true)), DiffLabel::BothBad);
    }

    #[test]
    fn remote_blockpage_row_is_shadowed() {
        assert_eq!(diff_label(signals(true, false, false, true)), DiffLabel::RemoteBlockedIndiaOk);
        let shadowed = &DIFF_RULES[5];
        assert_eq!(shadowed.label, DiffLabel::RemoteBlockpageIndiaOk);
        assert!(shadowed.matches(signals(true, false, false, true)));
    }

    #[test]
    fn every_combination_gets_a_non_other_label() {
        for bits in 0_u8..16 {
            let s = signals(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            assert_ne!(diff_label(s), DiffLabel::Other, "{s:?}");
        }
    }

    #[test]
    fn local_success_remote_blockpage_is_remote_blocked() {
        let rows = vec![
            row("20250101T000000Z", "IN-home", "x.in", Some(HttpOutcome::Success), Some(200), ""),
            row("20250101T000000Z", "VPN-EU", "x.in", Some(HttpOutcome::BlockpageIndia), Some(200), ""),
        ];
        let result = compare_vantages(&rows, "IN-home", "VPN-EU").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].vantage_diff_flag, DiffLabel::RemoteBlockedIndiaOk);
        assert_eq!(result[0].remote_blockpage_flag, Some(true));
    }

    #[test]
    fn both_success_needs_success_or_redirect_on_both_sides() {
        let run = "20250101T000000Z";
        let rows = vec![
            row(run, "IN-home", "a.in", Some(HttpOutcome::Redirect), Some(301), ""),
            row(run, "VPN-EU", "a.in", Some(HttpOutcome::Success), Some(200), ""),
            row(run, "IN-home", "b.in", Some(HttpOutcome::ClientError), Some(404), ""),
            row(run, "VPN-EU", "b.in", Some(HttpOutcome::Success), Some(200), ""),
        ];
        let result = compare_vantages(&rows, "IN-home", "VPN-EU").unwrap();
        assert_eq!(result[0].vantage_diff_flag, DiffLabel::BothSuccess);
        assert_eq!(result[1].vantage_diff_flag, DiffLabel::IndiaBlockedRemoteOk);
        assert_eq!(suspicious(&result).count(), 1);
    }

    #[test]
    fn local_only_domain_keeps_null_remote_fields() {
        let run = "20250101T000000Z";
        let rows = vec![
            row(run, "IN-home", "ok.in", Some(HttpOutcome::Success), Some(200), ""),
            row(run, "IN-home", "down.in", Some(HttpOutcome::Timeout), None, ""),
            row(run, "VPN-EU", "other.in", Some(HttpOutcome::Success), Some(200), ""),
        ];
        let result = compare_vantages(&rows, "IN-home", "VPN-EU").unwrap();
        assert_eq!(result.len(), 2);

        let down = &result[0];
        assert_eq!(down.domain, "down.in");
        assert!(down.remote_http_outcome.is_none());
        assert!(down.remote_status_code.is_none());
        assert!(down.remote_blockpage_flag.is_none());
        assert_eq!(down.vantage_diff_flag, DiffLabel::BothBad);

        assert_eq!(result[1].vantage_diff_flag, DiffLabel::RemoteBlockedIndiaOk);
    }

    #[test]
    fn missing_remote_vantage_fails() {
        let rows = vec![row("20250101T000000Z", "IN-home", "a.in", None, None, "")];
        let err = compare_vantages(&rows, "IN-home", "VPN-EU").unwrap_err();
        assert!(matches!(err, AnalysisError::NoRowsForVantage { vantage } if vantage == "VPN-EU"));
    }
}
