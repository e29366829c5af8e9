//! # vantage-cli
//!
//! Command-line interface for the vantage measurement pipeline.
//!
//! ## Commands
//!
//! - **measure**: probe every included domain and append rows to the store
//! - **ingest**: fetch and clean the external feed
//! - **merge**, **compare**, **classify**: derive the summary tables
//! - **analyze**, **summary**: describe a run or the classification
//! - **config**: show the effective configuration
//!
//! Every command takes `--output pretty|json|csv|yaml`.

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
