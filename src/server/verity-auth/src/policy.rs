//! Authentication success policies.

use std::sync::Arc;

use serde::Deserialize;

use crate::{AuthError, Authentication};

/// Decides whether an authentication attempt succeeded.
pub trait AuthenticationPolicy: Send + Sync {
    /// Returns `true` if the authentication satisfies the policy.
    fn is_satisfied_by(&self, authentication: &Authentication) -> bool;

    /// Returns `true` if the manager may stop trying credentials as soon as
    /// the policy is satisfied.
    fn stop_on_success(&self) -> bool {
        false
    }

    /// Returns the name of this policy for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Satisfied by at least one successful credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyAuthenticationPolicy {
    /// Try every credential even after a success.
    pub try_all: bool,
}

impl AuthenticationPolicy for AnyAuthenticationPolicy {
    fn is_satisfied_by(&self, authentication: &Authentication) -> bool {
        !authentication.successes.is_empty()
    }

    fn stop_on_success(&self) -> bool {
        !self.try_all
    }

    fn name(&self) -> &'static str {
        "any"
    }
}

/// Satisfied only when every submitted credential succeeded.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllAuthenticationPolicy;

impl AuthenticationPolicy for AllAuthenticationPolicy {
    fn is_satisfied_by(&self, authentication: &Authentication) -> bool {
        !authentication.successes.is_empty() && authentication.failures.is_empty()
    }

    fn name(&self) -> &'static str {
        "all"
    }
}

/// Satisfied when a named handler contributed a success.
#[derive(Debug, Clone)]
pub struct RequiredHandlerAuthenticationPolicy {
    /// Handler that must succeed.
    pub handler_name: String,
    /// Try every credential even after the required handler succeeded.
    pub try_all: bool,
}

impl AuthenticationPolicy for RequiredHandlerAuthenticationPolicy {
    fn is_satisfied_by(&self, authentication: &Authentication) -> bool {
        authentication.has_success_from(&self.handler_name)
    }

    fn stop_on_success(&self) -> bool {
        !self.try_all
    }

    fn name(&self) -> &'static str {
        "required-handler"
    }
}

/// Policy selection as written in configuration files.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// [`AnyAuthenticationPolicy`].
    Any {
        /// See [`AnyAuthenticationPolicy::try_all`].
        #[serde(default)]
        try_all: bool,
    },
    /// [`AllAuthenticationPolicy`].
    All,
    /// [`RequiredHandlerAuthenticationPolicy`].
    RequiredHandler {
        /// See [`RequiredHandlerAuthenticationPolicy::handler_name`].
        handler: String,
        /// See [`RequiredHandlerAuthenticationPolicy::try_all`].
        #[serde(default)]
        try_all: bool,
    },
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::Any { try_all: false }
    }
}

impl PolicyConfig {
    /// Builds the configured policy.
    pub fn build(&self) -> Result<Arc<dyn AuthenticationPolicy>, AuthError> {
        match self {
            Self::Any { try_all } => Ok(Arc::new(AnyAuthenticationPolicy { try_all: *try_all })),
            Self::All => Ok(Arc::new(AllAuthenticationPolicy)),
            Self::RequiredHandler { handler, try_all } => {
                if handler.trim().is_empty() {
                    return Err(AuthError::Configuration(
                        "required handler name cannot be empty".into(),
                    ));
                }
                Ok(Arc::new(RequiredHandlerAuthenticationPolicy {
                    handler_name: handler.clone(),
                    try_all: *try_all,
                }))
            },
        }
    }
}
