//! CSV file plumbing shared by the stores.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};

/// Open a headed CSV file; `trim` applies to headers and fields
pub(crate) fn open_reader(path: &Path, trim: csv::Trim) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::Missing {
            path: path.to_path_buf(),
        },
        _ => StoreError::io(path, e),
    })?;
    Ok(csv::ReaderBuilder::new().trim(trim).flexible(true).from_reader(file))
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))
        }
        _ => Ok(()),
    }
}

/// Returns true if the file is absent or has zero length
pub(crate) fn is_new_or_empty(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Write `path` through a temp file in the same directory, then rename.
///
/// Readers see either the old contents or the new ones, never a mix.
pub(crate) fn replace_with<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<NamedTempFile>) -> Result<()>,
{
    ensure_parent(path)?;
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(tmp);
    fill(&mut writer)?;
    let tmp = writer
        .into_inner()
        .map_err(|e| StoreError::io(path, e.into_error()))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Read every row of a derived table
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = open_reader(path, csv::Trim::None)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| StoreError::csv(path, e))
}

/// Replace a derived table with `rows` under the given header
pub fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    replace_with(path, |writer| {
        writer
            .write_record(header)
            .map_err(|e| StoreError::csv(path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| StoreError::csv(path, e))?;
        }
        Ok(())
    })
}
