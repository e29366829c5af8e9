//! On-disk stores for vantage.
//!
//! All persistent state is CSV under one data directory (see [`DataDir`]):
//! the curated domain list, the append-only [`MeasurementStore`], the cleaned
//! external feed and the derived summary tables. Derived tables are replaced
//! atomically; the measurement store only ever grows.
//!
//! The [`feed`] module fetches and cleans the external feed.

mod domains;
mod error;
pub mod feed;
mod io;
mod measurements;
pub mod tables;

pub use domains::{allowed_domains, canonical_domain, load_domains};
pub use error::{Result, StoreError};
pub use feed::{clean_feed, FeedFetcher, FeedFetcherBuilder, FeedMeasurement, FeedQuery};
pub use io::{read_table, write_table};
pub use measurements::{column_default, MeasurementStore, Migration, SchemaVersion};
pub use tables::{
    comparison_file_name, find_comparison_file, read_comparison, read_enriched, read_feed, read_summary,
    write_comparison, write_enriched, write_feed, write_summary, DataDir,
};
