//! Identity error types.

use thiserror::Error;

/// Errors that can occur when building identity values.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Principal identifier is empty or blank.
    #[error("invalid principal id: {0:?}")]
    InvalidPrincipalId(String),

    /// Credential is missing a required component.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}
