//! Directory error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while searching a directory.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Directory server could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Search did not complete in time.
    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    /// Directory server answered with a protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Search filter template or filter string is malformed.
    #[error("invalid search filter: {0}")]
    InvalidFilter(String),
}
