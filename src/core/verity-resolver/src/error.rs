//! Resolver error types.

use thiserror::Error;

/// Errors that can occur during principal resolution.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Resolver configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Directory search matched more than one entry.
    #[error("multiple search results found but not allowed: {count} entries for {filter}")]
    TooManyResults {
        /// Filter that was searched.
        filter: String,
        /// Number of entries returned.
        count: usize,
    },
}

impl From<verity_directory::DirectoryError> for ResolverError {
    fn from(e: verity_directory::DirectoryError) -> Self {
        ResolverError::Configuration(e.to_string())
    }
}
