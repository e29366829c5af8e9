//! Derived tables and where they live in the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use vantage_core::{DomainSummary, EnrichedSummary, FeedRecord, VantageComparison};

use crate::error::{Result, StoreError};
use crate::io::{read_table, write_table};

/// Domain list file name
pub const DOMAINS_FILE: &str = "domains.csv";
/// Raw measurement store file name
pub const MEASUREMENTS_FILE: &str = "raw_measurements.csv";
/// Cleaned feed file name
pub const FEED_FILE: &str = "ooni_webconnectivity_clean.csv";
/// Merged summary file name
pub const SUMMARY_FILE: &str = "domain_level_summary.csv";
/// Classified summary file name
pub const ENRICHED_FILE: &str = "domain_level_summary_enriched.csv";

const COMPARISON_PREFIX: &str = "vantage_comparison_";

/// Columns of the merged summary
pub const SUMMARY_COLUMNS: [&str; 8] = [
    "domain",
    "category",
    "subcategory",
    "local_http_outcome",
    "local_tls_issuer",
    "feed_total_measurements",
    "feed_failure_count",
    "feed_failure_rate",
];

/// Columns of a comparison file
pub const COMPARISON_COLUMNS: [&str; 10] = [
    "domain",
    "category",
    "subcategory",
    "local_http_outcome",
    "local_status_code",
    "local_blockpage_flag",
    "remote_http_outcome",
    "remote_status_code",
    "remote_blockpage_flag",
    "vantage_diff_flag",
];

/// Columns of the classified summary
pub const ENRICHED_COLUMNS: [&str; 10] = [
    "domain",
    "category",
    "subcategory",
    "local_http_outcome",
    "local_tls_issuer",
    "feed_total_measurements",
    "feed_failure_count",
    "feed_failure_rate",
    "vantage_diff_flag",
    "censorship_class",
];

/// Columns of the cleaned feed
pub const FEED_COLUMNS: [&str; 11] = [
    "measurement_start_time",
    "domain",
    "input",
    "probe_cc",
    "probe_asn",
    "test_name",
    "failure",
    "anomaly",
    "analysis_anomaly",
    "blocking_general",
    "blocking_type",
];

/// File layout under one data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default domain list
    pub fn domains(&self) -> PathBuf {
        self.root.join(DOMAINS_FILE)
    }

    /// Raw measurement store
    pub fn measurements(&self) -> PathBuf {
        self.root.join(MEASUREMENTS_FILE)
    }

    /// Cleaned feed
    pub fn feed(&self) -> PathBuf {
        self.root.join(FEED_FILE)
    }

    /// Merged summary
    pub fn summary(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    /// Classified summary
    pub fn enriched(&self) -> PathBuf {
        self.root.join(ENRICHED_FILE)
    }

    /// Comparison file for a vantage pair
    pub fn comparison(&self, local: &str, remote: &str) -> PathBuf {
        self.root.join(comparison_file_name(local, remote))
    }
}

/// `vantage_comparison_{local}_vs_{remote}.csv`
#[must_use]
pub fn comparison_file_name(local: &str, remote: &str) -> String {
    format!("{COMPARISON_PREFIX}{local}_vs_{remote}.csv")
}

/// First comparison file for `local` in sorted name order, if any
pub fn find_comparison_file(dir: &Path, local: &str) -> Result<Option<PathBuf>> {
    let prefix = format!("{COMPARISON_PREFIX}{local}_vs_");
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) && name.ends_with(".csv") {
            matches.push(name);
        }
    }
    matches.sort();
    let found = matches.into_iter().next().map(|name| dir.join(name));
    debug!(dir = %dir.display(), local, ?found, "looked for comparison file");
    Ok(found)
}

/// Write the merged summary
pub fn write_summary(path: &Path, rows: &[DomainSummary]) -> Result<()> {
    write_table(path, &SUMMARY_COLUMNS, rows)
}

/// Read the merged summary; an empty file is an input error
pub fn read_summary(path: &Path) -> Result<Vec<DomainSummary>> {
    non_empty(path, read_table(path)?)
}

/// Write a comparison file
pub fn write_comparison(path: &Path, rows: &[VantageComparison]) -> Result<()> {
    write_table(path, &COMPARISON_COLUMNS, rows)
}

/// Read a comparison file; may be empty
pub fn read_comparison(path: &Path) -> Result<Vec<VantageComparison>> {
    read_table(path)
}

/// Write the classified summary
pub fn write_enriched(path: &Path, rows: &[EnrichedSummary]) -> Result<()> {
    write_table(path, &ENRICHED_COLUMNS, rows)
}

/// Read the classified summary; an empty file is an input error
pub fn read_enriched(path: &Path) -> Result<Vec<EnrichedSummary>> {
    non_empty(path, read_table(path)?)
}

/// Write the cleaned feed
pub fn write_feed(path: &Path, rows: &[FeedRecord]) -> Result<()> {
    write_table(path, &FEED_COLUMNS, rows)
}

/// Read the cleaned feed; an empty file is an input error
pub fn read_feed(path: &Path) -> Result<Vec<FeedRecord>> {
    non_empty(path, read_table(path)?)
}

fn non_empty<T>(path: &Path, rows: Vec<T>) -> Result<Vec<T>> {
    if rows.is_empty() {
        Err(StoreError::Empty {
            path: path.to_path_buf(),
        })
    } else {
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use vantage_core::{CensorshipClass, DiffLabel, HttpOutcome};

    fn summary(domain: &str) -> DomainSummary {
        DomainSummary {
            domain: domain.to_string(),
            category: "News".to_string(),
            subcategory: "national, daily".to_string(),
            local_http_outcome: Some(HttpOutcome::Timeout),
            local_tls_issuer: None,
            feed_total_measurements: 4,
            feed_failure_count: 1,
            feed_failure_rate: 0.25,
        }
    }

    fn comparison(domain: &str) -> VantageComparison {
        VantageComparison {
            domain: domain.to_string(),
            category: "News".to_string(),
            subcategory: String::new(),
            local_http_outcome: Some(HttpOutcome::Success),
            local_status_code: Some(200),
            local_blockpage_flag: false,
            remote_http_outcome: None,
            remote_status_code: None,
            remote_blockpage_flag: None,
            vantage_diff_flag: DiffLabel::RemoteBlockedIndiaOk,
        }
    }

    fn serde_header<T: Serialize>(row: &T) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(row).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        text.lines().next().unwrap().to_string()
    }

    #[test]
    fn declared_columns_match_field_names() {
        assert_eq!(serde_header(&summary("a.in")), SUMMARY_COLUMNS.join(","));
        assert_eq!(serde_header(&comparison("a.in")), COMPARISON_COLUMNS.join(","));
        let enriched = EnrichedSummary::from_summary(summary("a.in"), DiffLabel::Unknown, CensorshipClass::Normal);
        assert_eq!(serde_header(&enriched), ENRICHED_COLUMNS.join(","));
        let feed = FeedRecord {
            domain: "a.in".to_string(),
            ..FeedRecord::default()
        };
        assert_eq!(serde_header(&feed), FEED_COLUMNS.join(","));
    }

    #[test]
    fn summary_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path().join("nested"));
        let rows = vec![summary("a.in"), summary("b.in")];
        write_summary(&data.summary(), &rows).unwrap();
        assert_eq!(read_summary(&data.summary()).unwrap(), rows);
    }

    #[test]
    fn empty_tables_keep_their_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(comparison_file_name("IN-home", "VPN-EU"));
        write_comparison(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), COMPARISON_COLUMNS.join(","));
        assert!(read_comparison(&path).unwrap().is_empty());

        write_summary(&dir.path().join(SUMMARY_FILE), &[]).unwrap();
        assert!(matches!(
            read_summary(&dir.path().join(SUMMARY_FILE)).unwrap_err(),
            StoreError::Empty { .. }
        ));
    }

    #[test]
    fn finds_first_comparison_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDir::new(dir.path());
        assert_eq!(find_comparison_file(dir.path(), "IN-home").unwrap(), None);

        for remote in ["VPN-US", "VPN-EU"] {
            write_comparison(&data.comparison("IN-home", remote), &[comparison("a.in")]).unwrap();
        }
        write_comparison(&data.comparison("VPN-EU", "IN-home"), &[]).unwrap();

        let found = find_comparison_file(dir.path(), "IN-home").unwrap().unwrap();
        assert!(found.ends_with("vantage_comparison_IN-home_vs_VPN-EU.csv"));
        assert_eq!(read_comparison(&found).unwrap(), vec![comparison("a.in")]);
    }

    #[test]
    fn missing_table_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_enriched(&dir.path().join(ENRICHED_FILE)).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }
}
