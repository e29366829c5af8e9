//! Join of the local run aggregate with feed statistics.

use std::collections::BTreeMap;

use vantage_core::{DomainSummary, FeedAggregate, MeasurementRow};

use crate::aggregate::{aggregate_latest, RunAggregate};
use crate::error::Result;

/// Left-join the run aggregate with the feed; unmeasured domains get zeros
#[must_use]
pub fn merge_summary(local: &RunAggregate, feed: &BTreeMap<String, FeedAggregate>) -> Vec<DomainSummary> {
    local
        .domains
        .iter()
        .map(|d| {
            let stats = feed
                .get(&d.domain)
                .cloned()
                .unwrap_or_else(|| FeedAggregate::empty(&d.domain));
            DomainSummary {
                domain: d.domain.clone(),
                category: d.category.clone(),
                subcategory: d.subcategory.clone(),
                local_http_outcome: d.http_outcome,
                local_tls_issuer: d.tls_issuer.clone(),
                feed_total_measurements: stats.total_measurements,
                feed_failure_count: stats.failure_count,
                feed_failure_rate: stats.failure_rate,
            }
        })
        .collect()
}

/// Aggregate the latest run of `vantage` and merge it with the feed
pub fn summarize(
    rows: &[MeasurementRow],
    vantage: &str,
    feed: &BTreeMap<String, FeedAggregate>,
) -> Result<Vec<DomainSummary>> {
    let local = aggregate_latest(rows, vantage)?;
    Ok(merge_summary(&local, feed))
}
