//! Authentication error types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use verity_resolver::ResolverError;

/// Closed set of reasons a handler can reject a credential.
///
/// The variant name is the outcome code reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FailureKind {
    /// Account is locked.
    AccountLocked,
    /// Wrong secret.
    FailedLogin,
    /// Credential (password) has expired.
    CredentialExpired,
    /// Account is disabled.
    AccountDisabled,
    /// Login attempted from a forbidden location.
    InvalidLoginLocation,
    /// Login attempted outside the allowed hours.
    InvalidLoginTime,
    /// No such account.
    AccountNotFound,
    /// Password must be changed before logging in.
    AccountPasswordMustChange,
    /// No handler supports the credential.
    UnsupportedCredential,
    /// Handler did not answer in time.
    Timeout,
}

impl FailureKind {
    /// Precedence used when none is configured.
    pub const DEFAULT_PRECEDENCE: [FailureKind; 6] = [
        FailureKind::AccountLocked,
        FailureKind::FailedLogin,
        FailureKind::CredentialExpired,
        FailureKind::AccountDisabled,
        FailureKind::InvalidLoginLocation,
        FailureKind::InvalidLoginTime,
    ];

    /// Outcome code.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountLocked => "AccountLocked",
            Self::FailedLogin => "FailedLogin",
            Self::CredentialExpired => "CredentialExpired",
            Self::AccountDisabled => "AccountDisabled",
            Self::InvalidLoginLocation => "InvalidLoginLocation",
            Self::InvalidLoginTime => "InvalidLoginTime",
            Self::AccountNotFound => "AccountNotFound",
            Self::AccountPasswordMustChange => "AccountPasswordMustChange",
            Self::UnsupportedCredential => "UnsupportedCredential",
            Self::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure reported by one handler for one credential.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{handler_name} rejected credential ({kind}): {message}")]
pub struct HandlerError {
    /// Handler that produced the failure.
    pub handler_name: String,
    /// Failure kind.
    pub kind: FailureKind,
    /// Detail for logs. Never shown to end users.
    pub message: String,
}

impl HandlerError {
    /// Creates a handler error.
    pub fn new(handler_name: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            handler_name: handler_name.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Aggregate failure of one authentication attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize)]
#[error("no credential was successfully authenticated ({} handler error(s))", .handler_errors.len())]
pub struct AuthenticationException {
    handler_errors: BTreeMap<String, HandlerError>,
}

impl AuthenticationException {
    /// Creates an empty exception.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a handler error under `key`, normally `handler[credential id]`.
    /// A later error under the same key replaces the earlier one.
    pub fn record(&mut self, key: impl Into<String>, error: HandlerError) {
        self.handler_errors.insert(key.into(), error);
    }

    /// Builder-style [`record`](Self::record).
    pub fn with(mut self, key: impl Into<String>, error: HandlerError) -> Self {
        self.record(key, error);
        self
    }

    /// Errors keyed by handler and credential.
    pub fn handler_errors(&self) -> &BTreeMap<String, HandlerError> {
        &self.handler_errors
    }

    /// Consumes the exception, returning the error map.
    pub fn into_handler_errors(self) -> BTreeMap<String, HandlerError> {
        self.handler_errors
    }

    /// Returns `true` if at least one error carries `kind`.
    pub fn contains(&self, kind: FailureKind) -> bool {
        self.handler_errors.values().any(|e| e.kind == kind)
    }

    /// Returns `true` if no error was recorded.
    pub fn is_empty(&self) -> bool {
        self.handler_errors.is_empty()
    }
}

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was authenticated, or the policy was not satisfied.
    #[error("authentication failed: {0}")]
    Failed(AuthenticationException),

    /// Principal resolution failed hard (e.g. ambiguous directory match).
    #[error("principal resolution failed: {0}")]
    Resolver(ResolverError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller abandoned the attempt.
    #[error("authentication cancelled")]
    Cancelled,
}

impl From<ResolverError> for AuthError {
    fn from(e: ResolverError) -> Self {
        AuthError::Resolver(e)
    }
}

impl From<AuthenticationException> for AuthError {
    fn from(e: AuthenticationException) -> Self {
        AuthError::Failed(e)
    }
}
