//! The append-only raw measurement store.
//!
//! Rows are appended once per flushed batch and never rewritten, with one
//! exception: a store written by an older release is upgraded in place, once,
//! to the current column set. The upgrade only adds columns and fills them
//! with declared defaults.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info, instrument};
use vantage_core::MeasurementRow;

use crate::error::{Result, StoreError};
use crate::io::{ensure_parent, is_new_or_empty, open_reader, replace_with};

/// Column layout generations of the measurement store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// Single-vantage layout without a `vantage` column
    PreVantage,
    /// Multi-vantage layout without `http_body_snippet`
    PreSnippet,
    /// Every column of [`MeasurementRow::COLUMNS`]
    Current,
}

impl SchemaVersion {
    /// Detect the layout from a header row
    #[must_use]
    pub fn detect<S: AsRef<str>>(header: &[S]) -> Self {
        let has = |column: &str| header.iter().any(|h| h.as_ref().trim() == column);
        if !has("vantage") {
            Self::PreVantage
        } else if MeasurementRow::COLUMNS.iter().all(|c| has(c)) {
            Self::Current
        } else {
            Self::PreSnippet
        }
    }
}

/// Value given to a column that an older store lacks
#[must_use]
pub fn column_default(column: &str) -> &'static str {
    match column {
        "vantage" => "unknown",
        _ => "",
    }
}

/// What [`MeasurementStore::migrate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Migration {
    /// No store yet, or an empty one
    Absent,
    /// Already at the current layout
    UpToDate,
    /// Rewritten with the current layout
    Upgraded {
        /// Layout that was found
        from: SchemaVersion,
        /// Columns that were added
        added: Vec<&'static str>,
        /// Rows carried over
        rows: usize,
    },
}

/// Maps current columns onto an older header.
struct Upgrade {
    positions: Vec<Option<usize>>,
}

impl Upgrade {
    fn new(header: &StringRecord) -> Self {
        let positions = MeasurementRow::COLUMNS
            .iter()
            .map(|column| header.iter().position(|h| h.trim() == *column))
            .collect();
        Self { positions }
    }

    fn missing(&self) -> Vec<&'static str> {
        MeasurementRow::COLUMNS
            .iter()
            .zip(&self.positions)
            .filter(|(_, pos)| pos.is_none())
            .map(|(column, _)| *column)
            .collect()
    }

    fn apply(&self, record: &StringRecord) -> StringRecord {
        MeasurementRow::COLUMNS
            .iter()
            .zip(&self.positions)
            .map(|(column, pos)| match pos {
                Some(i) => record.get(*i).unwrap_or_default(),
                None => column_default(column),
            })
            .collect()
    }
}

/// CSV file of [`MeasurementRow`]s keyed by (run_id, vantage, domain).
#[derive(Debug, Clone)]
pub struct MeasurementStore {
    path: PathBuf,
}

impl MeasurementStore {
    /// Store backed by `path`; nothing is touched until used
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> Result<(StringRecord, Vec<StringRecord>)> {
        let mut reader = open_reader(&self.path, csv::Trim::None)?;
        let header = reader
            .headers()
            .map_err(|e| StoreError::csv(&self.path, e))?
            .clone();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| StoreError::csv(&self.path, e))?;
        Ok((header, records))
    }

    /// Upgrade an older store to the current layout.
    ///
    /// Safe to call on every run: a missing, empty or current store is left
    /// alone. The rewrite goes through a temp file and a rename.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn migrate(&self) -> Result<Migration> {
        if is_new_or_empty(&self.path)? {
            return Ok(Migration::Absent);
        }
        let (header, records) = self.read_records()?;
        let names: Vec<&str> = header.iter().collect();
        let from = SchemaVersion::detect(&names);
        if from == SchemaVersion::Current {
            debug!("store layout is current");
            return Ok(Migration::UpToDate);
        }

        let upgrade = Upgrade::new(&header);
        let added = upgrade.missing();
        replace_with(&self.path, |writer| {
            writer
                .write_record(MeasurementRow::COLUMNS)
                .map_err(|e| StoreError::csv(&self.path, e))?;
            for record in &records {
                writer
                    .write_record(&upgrade.apply(record))
                    .map_err(|e| StoreError::csv(&self.path, e))?;
            }
            Ok(())
        })?;

        info!(?from, ?added, rows = records.len(), "upgraded measurement store");
        Ok(Migration::Upgraded {
            from,
            added,
            rows: records.len(),
        })
    }

    /// Append rows, writing the header only into a new or empty file
    pub fn append(&self, rows: &[MeasurementRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        ensure_parent(&self.path)?;
        let needs_header = is_new_or_empty(&self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer
                .write_record(MeasurementRow::COLUMNS)
                .map_err(|e| StoreError::csv(&self.path, e))?;
        }
        for row in rows {
            writer.serialize(row).map_err(|e| StoreError::csv(&self.path, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
        debug!(path = %self.path.display(), rows = rows.len(), "appended rows");
        Ok(())
    }

    /// Every stored row in file order.
    ///
    /// Older layouts are read through the same column mapping the upgrade
    /// uses, so reading never requires a prior [`migrate`](Self::migrate).
    pub fn read_all(&self) -> Result<Vec<MeasurementRow>> {
        if is_new_or_empty(&self.path)? && self.path.exists() {
            return Ok(Vec::new());
        }
        let (header, records) = self.read_records()?;
        let upgrade = Upgrade::new(&header);
        let columns = StringRecord::from(MeasurementRow::COLUMNS.to_vec());
        records
            .iter()
            .map(|record| {
                upgrade
                    .apply(record)
                    .deserialize(Some(&columns))
                    .map_err(|e| StoreError::csv(&self.path, e))
            })
            .collect()
    }
}
