use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while interpreting stored values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A label is not a member of its closed taxonomy
    #[error("unknown {taxonomy} label: {value:?}")]
    UnknownLabel {
        /// Which taxonomy was being parsed
        taxonomy: &'static str,
        /// The offending value
        value: String,
    },
}

impl CoreError {
    pub(crate) fn unknown(taxonomy: &'static str, value: &str) -> Self {
        Self::UnknownLabel {
            taxonomy,
            value: value.to_string(),
        }
    }
}
