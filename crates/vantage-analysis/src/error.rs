use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised instead of producing an empty or mixed-run aggregate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The store holds no rows for this vantage
    #[error("no rows found for vantage '{vantage}'")]
    NoRowsForVantage {
        /// Requested vantage
        vantage: String,
    },

    /// The selected run has no rows left after filtering
    #[error("no rows found for vantage '{vantage}' at run_id {run_id}")]
    EmptyRun {
        /// Requested vantage
        vantage: String,
        /// Selected run
        run_id: String,
    },

    /// The store holds no rows at all
    #[error("no measurement rows available")]
    NoRows,
}
