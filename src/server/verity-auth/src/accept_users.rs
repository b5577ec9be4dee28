//! Username/password handler backed by a static user table.
//!
//! Stored passwords are either plain text or Argon2 PHC strings.

use std::collections::{HashMap, HashSet};
use std::fmt;

use argon2::PasswordHash;
use async_trait::async_trait;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use verity_identity::{Credential, Principal};

use crate::hashed_token::verify_hash;
use crate::{AuthError, AuthenticationHandler, FailureKind, HandlerError, HandlerResult};

const DEFAULT_NAME: &str = "accept-users";

/// Configuration for [`AcceptUsersHandler`].
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AcceptUsersConfig {
    /// Handler name.
    pub name: String,
    /// Username to stored password.
    pub users: HashMap<String, String>,
    /// Users whose account is locked.
    pub locked: HashSet<String>,
    /// Users whose account is disabled.
    pub disabled: HashSet<String>,
}

impl Default for AcceptUsersConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            users: HashMap::new(),
            locked: HashSet::new(),
            disabled: HashSet::new(),
        }
    }
}

impl fmt::Debug for AcceptUsersConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users: Vec<&String> = self.users.keys().collect();
        users.sort();
        f.debug_struct("AcceptUsersConfig")
            .field("name", &self.name)
            .field("users", &users)
            .field("locked", &self.locked)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl AcceptUsersConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.name.trim().is_empty() {
            return Err(AuthError::Configuration("handler name cannot be empty".into()));
        }
        if self.users.is_empty() {
            return Err(AuthError::Configuration(format!(
                "handler {} has no users",
                self.name
            )));
        }
        for (username, stored) in &self.users {
            if stored.starts_with("$argon2") && PasswordHash::new(stored).is_err() {
                return Err(AuthError::Configuration(format!(
                    "invalid password hash for user {}",
                    username
                )));
            }
        }
        Ok(())
    }
}

/// Accepts username/password credentials listed in its table.
pub struct AcceptUsersHandler {
    config: AcceptUsersConfig,
}

impl AcceptUsersHandler {
    /// Creates a new handler.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the configuration is invalid.
    pub fn new(config: AcceptUsersConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a handler for one plain-text user.
    pub fn single(username: &str, password: &str) -> Result<Self, AuthError> {
        let mut config = AcceptUsersConfig::default();
        config.users.insert(username.to_string(), password.to_string());
        Self::new(config)
    }

    fn fail(&self, kind: FailureKind, message: impl Into<String>) -> HandlerError {
        HandlerError::new(self.config.name.as_str(), kind, message)
    }

    async fn verify(&self, stored: &str, password: &Zeroizing<String>) -> Result<bool, HandlerError> {
        if !stored.starts_with("$argon2") {
            return Ok(stored.as_bytes().ct_eq(password.as_bytes()).into());
        }
        verify_hash(&self.config.name, stored.to_string(), password.clone()).await
    }
}

#[async_trait]
impl AuthenticationHandler for AcceptUsersHandler {
    async fn authenticate(&self, credential: &Credential) -> Result<HandlerResult, HandlerError> {
        let Credential::UsernamePassword { username, password } = credential else {
            return Err(self.fail(
                FailureKind::UnsupportedCredential,
                "expected a username/password credential",
            ));
        };

        let stored = self
            .config
            .users
            .get(username)
            .ok_or_else(|| self.fail(FailureKind::AccountNotFound, format!("{} not found", username)))?;

        if !self.verify(stored, password).await? {
            debug!(handler = %self.config.name, username = %username, "Password mismatch");
            return Err(self.fail(FailureKind::FailedLogin, "password mismatch"));
        }
        if self.config.locked.contains(username) {
            return Err(self.fail(FailureKind::AccountLocked, format!("{} is locked", username)));
        }
        if self.config.disabled.contains(username) {
            return Err(self.fail(FailureKind::AccountDisabled, format!("{} is disabled", username)));
        }

        let principal = Principal::new(username.as_str())
            .map_err(|e| self.fail(FailureKind::FailedLogin, e.to_string()))?;
        Ok(HandlerResult::new(self.config.name.as_str(), credential, principal)
            .with_metadata("credentialType", "password"))
    }

    fn supports(&self, credential: &Credential) -> bool {
        matches!(credential, Credential::UsernamePassword { .. })
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
