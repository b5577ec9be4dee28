//! Password policy error types.

use thiserror::Error;

/// Errors that can occur while enforcing the password policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Policy configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The password has expired, or its expiration cannot be computed from
    /// the directory data.
    #[error("password policy enforcement failed: {0}")]
    Enforcement(String),
}

impl From<verity_directory::DirectoryError> for PolicyError {
    fn from(e: verity_directory::DirectoryError) -> Self {
        PolicyError::Configuration(e.to_string())
    }
}
