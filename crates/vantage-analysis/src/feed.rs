//! Per-domain failure statistics from the external feed.

use std::collections::BTreeMap;

use vantage_core::{FeedAggregate, FeedRecord};

/// Feed signal truthiness.
///
/// Empty, `false`, `0`, `none`, `nan` (any case) and any numeric zero are
/// false; everything else, such as a failure string or `true`, is true.
#[must_use]
pub fn is_truthy(raw: &str) -> bool {
    let value = raw.trim().to_lowercase();
    if matches!(value.as_str(), "" | "false" | "0" | "none" | "nan") {
        return false;
    }
    !value.parse::<f64>().is_ok_and(|n| n == 0.0)
}

/// A measurement counts as failed if any of its three signals is set
#[must_use]
pub fn is_failure(record: &FeedRecord) -> bool {
    is_truthy(&record.failure) || is_truthy(&record.anomaly) || is_truthy(&record.blocking_general)
}

/// Count measurements and failures per domain, ordered by domain
#[must_use]
pub fn aggregate_feed(records: &[FeedRecord]) -> BTreeMap<String, FeedAggregate> {
    let mut counts: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for record in records {
        let entry = counts.entry(record.domain.as_str()).or_default();
        entry.0 += 1;
        if is_failure(record) {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(domain, (total, failures))| {
            (domain.to_string(), FeedAggregate::from_counts(domain, total, failures))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(domain: &str, failure: &str, anomaly: &str, blocking: &str) -> FeedRecord {
        FeedRecord {
            domain: domain.to_string(),
            failure: failure.to_string(),
            anomaly: anomaly.to_string(),
            blocking_general: blocking.to_string(),
            ..FeedRecord::default()
        }
    }

    #[test]
    fn falsy_spellings() {
        for raw in ["", "  ", "False", "0", "0.0", "-0", "None", "NaN"] {
            assert!(!is_truthy(raw), "{raw:?}");
        }
        for raw in ["True", "1", "1.0", "generic_timeout_error", "dns"] {
            assert!(is_truthy(raw), "{raw:?}");
        }
    }

    #[test]
    fn any_signal_marks_failure() {
        assert!(!is_failure(&record("a.in", "", "False", "0.0")));
        assert!(is_failure(&record("a.in", "connection_reset", "", "")));
        assert!(is_failure(&record("a.in", "", "True", "")));
        assert!(is_failure(&record("a.in", "", "", "1.0")));
    }

    #[test]
    fn aggregates_per_domain() {
        let records = vec![
            record("b.in", "", "", ""),
            record("a.in", "dns_nxdomain_error", "", ""),
            record("a.in", "", "", ""),
            record("a.in", "", "True", ""),
            record("a.in", "", "", ""),
        ];
        let agg = aggregate_feed(&records);
        let keys: Vec<_> = agg.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a.in", "b.in"]);

        let a = &agg["a.in"];
        assert_eq!((a.total_measurements, a.failure_count), (4, 2));
        assert!((a.failure_rate - 0.5).abs() < f64::EPSILON);
        assert!(agg["b.in"].failure_rate.abs() < f64::EPSILON);
    }
}
