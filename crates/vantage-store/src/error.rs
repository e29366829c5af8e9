use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised while reading or writing stores and fetching the feed
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required input file does not exist
    #[error("required file not found: {}", path.display())]
    Missing {
        /// Path that was expected
        path: PathBuf,
    },

    /// A file exists but holds no usable rows
    #[error("no rows in {}", path.display())]
    Empty {
        /// The empty file
        path: PathBuf,
    },

    /// A required column is absent from a file's header
    #[error("{} has no {column:?} column", path.display())]
    MissingColumn {
        /// The offending file
        path: PathBuf,
        /// The column that was looked for
        column: &'static str,
    },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding failure
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: csv::Error,
    },

    /// Feed client could not be built
    #[error("feed client setup failed: {0}")]
    Client(String),

    /// A feed page kept failing after every retry
    #[error("failed to fetch {url} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        /// Page URL
        url: String,
        /// Attempts made
        attempts: u32,
        /// Last failure seen
        last_error: String,
    },

    /// The feed had no measurement for any allowed domain
    #[error("no feed measurements matched the {allowed} allowed domains")]
    NoFeedMatches {
        /// Size of the allowed set
        allowed: usize,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
