//! Reachability probes for vantage.
//!
//! Each probe checks one protocol against one domain and records what it saw,
//! failures included, without ever aborting:
//!
//! - [`dns`]: A/AAAA lookups through the system resolver and a public resolver
//! - [`tcp`]: connects to ports 80 and 443
//! - [`http`]: HTTPS GET with a single plain-HTTP fallback
//! - [`tls`]: validating handshake and issuer extraction
//!
//! [`DomainMeasurer`] runs all of them concurrently for a domain and flattens
//! the evidence into a [`vantage_core::MeasurementRow`]; [`Runner`] drives a
//! whole run with batched flushing and cancellation.
//!
//! # Example
//!
//! ```rust,ignore
//! use vantage_probe::{DomainMeasurer, Measure, RunConfig};
//! use vantage_core::{DomainEntry, RunStamp};
//!
//! let measurer = DomainMeasurer::new(&RunConfig::default())?;
//! let stamp = RunStamp::starting_at("IN-home", chrono::Utc::now());
//! let row = measurer.measure(&DomainEntry::new("example.in", "News", ""), &stamp).await;
//! println!("{} -> {:?}", row.domain, row.http_outcome);
//! ```

pub mod classify;
mod config;
pub mod dns;
mod error;
mod failure;
pub mod http;
mod measurer;
mod runner;
pub mod tcp;
pub mod tls;

pub use classify::{classify_outcome, detect_blockpage, BLOCKPAGE_PHRASES};
pub use config::{RunConfig, DEFAULT_PUBLIC_RESOLVER, DEFAULT_USER_AGENT};
pub use error::{MeasureError, Result};
pub use measurer::{DomainMeasurer, Evidence, Measure};
pub use runner::{RunOutcome, Runner};
