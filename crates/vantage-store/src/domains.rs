//! The curated domain list.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};
use vantage_core::DomainEntry;

use crate::error::{Result, StoreError};
use crate::io::open_reader;

#[derive(Debug, Deserialize)]
struct ListRow {
    domain: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    subcategory: String,
    #[serde(default)]
    include_flag: String,
}

fn included(flag: &str) -> bool {
    flag.trim().eq_ignore_ascii_case("yes")
}

/// Load the entries marked for probing, in file order.
///
/// `limit` keeps only the first N included entries.
pub fn load_domains(path: &Path, limit: Option<usize>) -> Result<Vec<DomainEntry>> {
    let mut reader = open_reader(path, csv::Trim::All)?;
    let headers = reader
        .headers()
        .map_err(|e| StoreError::csv(path, e))?
        .clone();
    for column in ["domain", "include_flag"] {
        if !headers.iter().any(|h| h == column) {
            return Err(StoreError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let mut entries = Vec::new();
    for record in reader.deserialize::<ListRow>() {
        let row = record.map_err(|e| StoreError::csv(path, e))?;
        if !included(&row.include_flag) {
            continue;
        }
        if row.domain.is_empty() {
            warn!(path = %path.display(), "skipping included row without a domain");
            continue;
        }
        entries.push(DomainEntry::new(row.domain, row.category, row.subcategory));
        if limit.is_some_and(|n| entries.len() >= n) {
            break;
        }
    }
    debug!(path = %path.display(), count = entries.len(), "loaded domain list");
    Ok(entries)
}

/// Canonical form used to match feed hosts: lower-case, no leading `www.`
#[must_use]
pub fn canonical_domain(domain: &str) -> String {
    let lower = domain.trim().to_lowercase();
    match lower.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => lower,
    }
}

/// The canonical set of included domains
#[must_use]
pub fn allowed_domains(entries: &[DomainEntry]) -> BTreeSet<String> {
    entries.iter().map(|e| canonical_domain(&e.domain)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn list(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const LIST: &str = "domain,category,subcategory,include_flag\n\
        example.in , News , national , yes\n\
        skipped.in,News,,no\n\
        www.Gov.in,Government-Telecom,portal, YES \n\
        third.in,Civil Society & NGOs,,Yes\n";

    #[test]
    fn keeps_included_rows_trimmed() {
        let file = list(LIST);
        let entries = load_domains(file.path(), None).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], DomainEntry::new("example.in", "News", "national"));
        assert_eq!(entries[1].domain, "www.Gov.in");
        assert_eq!(entries[2].category, "Civil Society & NGOs");
    }

    #[test]
    fn limit_counts_included_rows_only() {
        let file = list(LIST);
        let entries = load_domains(file.path(), Some(2)).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.domain.as_str()).collect();
        assert_eq!(names, ["example.in", "www.Gov.in"]);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_domains(&dir.path().join("domains.csv"), None).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[test]
    fn missing_flag_column_is_rejected() {
        let file = list("domain,category\na.in,News\n");
        let err = load_domains(file.path(), None).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn { column: "include_flag", .. }));
    }

    #[test]
    fn allowed_set_is_canonical() {
        let file = list(LIST);
        let allowed = allowed_domains(&load_domains(file.path(), None).unwrap());
        assert!(allowed.contains("gov.in"));
        assert!(allowed.contains("example.in"));
        assert!(!allowed.contains("skipped.in"));
    }
}
