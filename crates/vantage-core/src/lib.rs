//! Core types for vantage reachability measurements.
//!
//! This crate provides the foundational types shared by the probe engine,
//! the analysis engine and the stores:
//!
//! - **Taxonomies**: [`HttpOutcome`], [`DiffLabel`] and [`CensorshipClass`]
//! - **Rows**: [`MeasurementRow`] and the derived summary tables
//! - **Errors**: [`ProbeError`] (recorded evidence) and [`CoreError`]
//!
//! # Example
//!
//! ```rust
//! use vantage_core::{HttpOutcome, ProbeError, ProbeErrorKind};
//!
//! let err = ProbeError::new(ProbeErrorKind::Timeout, "operation timed out");
//! assert_eq!(err.to_string(), "timeout: operation timed out");
//! assert!(HttpOutcome::Redirect.is_success());
//! ```

#![doc(html_root_url = "https://docs.rs/vantage-core/0.3.0")]

mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::*;
