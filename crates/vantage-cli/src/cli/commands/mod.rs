//! Command implementations.

pub mod analyze;
pub mod classify;
pub mod compare;
pub mod config;
pub mod ingest;
pub mod measure;
pub mod merge;
pub mod summary;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use vantage_core::MeasurementRow;
use vantage_store::{DataDir, MeasurementStore};

use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration
    pub config: Config,

    /// Where the configuration was looked up
    pub config_path: PathBuf,

    /// Data directory layout
    pub data: DataDir,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}

impl Context {
    /// The local vantage: the flag if given, else the configured one.
    pub fn vantage(&self, flag: Option<String>) -> String {
        flag.unwrap_or_else(|| self.config.vantage.clone())
    }

    /// The remote vantage: the flag if given, else the configured one.
    pub fn remote_vantage(&self, flag: Option<String>) -> String {
        flag.unwrap_or_else(|| self.config.remote_vantage.clone())
    }

    /// The measurement store of the data directory.
    pub fn store(&self) -> MeasurementStore {
        MeasurementStore::new(self.data.measurements())
    }

    /// Every stored measurement row.
    pub fn read_measurements(&self) -> Result<Vec<MeasurementRow>> {
        let store = self.store();
        store
            .read_all()
            .with_context(|| format!("Failed to read measurements from {}", store.path().display()))
    }

    /// Whether pretty output is selected.
    pub fn pretty(&self) -> bool {
        self.output_format == OutputFormat::Pretty
    }
}
