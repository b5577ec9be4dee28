//! Component wiring and the login flow.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use verity_auth::{
    AcceptUsersHandler, AuthError, AuthenticationManager, FailureClassifier, HashedTokenHandler,
    LoginOutcome, RegisteredHandler,
};
use verity_directory::DirectorySearchPort;
use verity_directory_memory::MemoryDirectory;
use verity_identity::{Credential, Principal};
use verity_password_policy::{PasswordPolicyEngine, PasswordStatus, PolicyError};
use verity_resolver::{DirectoryPrincipalResolver, PrincipalResolver, UsernamePrincipalResolver};

use crate::config::VerityConfig;

/// Name recorded for password policy failures.
const PASSWORD_POLICY_SOURCE: &str = "password-policy";

/// Opens the directory fixture, or an empty directory when none is given.
pub async fn open_directory(path: Option<&Path>) -> Result<Arc<MemoryDirectory>> {
    match path {
        Some(path) => {
            let directory = MemoryDirectory::open(path)
                .await
                .context("Failed to load directory fixture")?;
            Ok(Arc::new(directory))
        },
        None => {
            warn!("No directory fixture given, directory searches will find nothing");
            Ok(Arc::new(MemoryDirectory::default()))
        },
    }
}

/// Every configured component.
pub struct Verity {
    manager: AuthenticationManager,
    resolver: Option<Arc<DirectoryPrincipalResolver>>,
    policy: Option<PasswordPolicyEngine>,
    classifier: FailureClassifier,
    handler_names: Vec<String>,
}

impl Verity {
    /// Builds and validates every component.
    pub fn build(config: &VerityConfig, directory: Arc<dyn DirectorySearchPort>) -> Result<Self> {
        let resolver = config
            .resolver
            .clone()
            .map(|c| {
                DirectoryPrincipalResolver::new(Arc::new(UsernamePrincipalResolver), directory.clone(), c)
            })
            .transpose()
            .context("Invalid resolver configuration")?
            .map(Arc::new);

        let mut handlers = Vec::new();
        if let Some(users) = &config.accept_users {
            let handler = AcceptUsersHandler::new(users.clone()).context("Invalid accept_users configuration")?;
            handlers.push(RegisteredHandler::new(Arc::new(handler)));
        }
        if !config.tokens.is_empty() {
            let handler = HashedTokenHandler::with_static_hashes(config.tokens.clone());
            handlers.push(RegisteredHandler::new(Arc::new(handler)));
        }
        if let Some(resolver) = &resolver {
            let resolver: Arc<dyn PrincipalResolver> = resolver.clone();
            handlers = handlers
                .into_iter()
                .map(|h| h.with_resolver(resolver.clone()))
                .collect();
        }
        let handler_names = handlers.iter().map(|h| h.handler.name().to_string()).collect();

        let manager =
            AuthenticationManager::new(handlers, &config.manager).context("Invalid manager configuration")?;

        let policy = config
            .password_policy
            .clone()
            .map(|c| PasswordPolicyEngine::new(directory.clone(), c))
            .transpose()
            .context("Invalid password_policy configuration")?;

        Ok(Self {
            manager,
            resolver,
            policy,
            classifier: FailureClassifier::new(config.failures.clone()),
            handler_names,
        })
    }

    /// Human-readable summary of the configured components.
    pub fn summary(&self) -> Vec<String> {
        vec![
            format!("handlers: {}", self.handler_names.join(", ")),
            format!("directory resolver: {}", enabled(self.resolver.is_some())),
            format!("password policy: {}", enabled(self.policy.is_some())),
            format!(
                "failure precedence: {}",
                self.classifier
                    .precedence()
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ]
    }

    /// Runs one login: authentication, then the password policy check.
    pub async fn login(&self, credentials: &[Credential], cancel: &CancellationToken) -> Result<LoginOutcome> {
        let authentication = match self.manager.authenticate_with_cancel(credentials, cancel).await {
            Ok(authentication) => authentication,
            Err(e @ AuthError::Failed(_)) => {
                let outcome = LoginOutcome::from_error(&self.classifier, &e);
                info!(code = outcome.code(), "Login failed");
                return Ok(outcome);
            },
            Err(e) => return Err(e).context("Login aborted"),
        };

        let days = match &self.policy {
            None => None,
            Some(engine) => match engine.days_until_expiration(authentication.principal.id()).await {
                Ok(status) => Some(status.as_days()),
                Err(PolicyError::Enforcement(message)) => {
                    warn!(principal = %authentication.principal, "Password expired");
                    return Ok(LoginOutcome::password_expired(
                        &self.classifier,
                        PASSWORD_POLICY_SOURCE,
                        &message,
                    ));
                },
                Err(e) => return Err(e).context("Password policy check failed"),
            },
        };

        Ok(LoginOutcome::success(authentication, days))
    }

    /// Re-resolves a principal id against the directory.
    pub async fn resolve(&self, id: &str) -> Result<Option<Principal>> {
        let Some(resolver) = &self.resolver else {
            bail!("No directory resolver configured");
        };
        let initial = Principal::new(id).context("Invalid principal id")?;
        resolver
            .resolve_principal(&initial)
            .await
            .context("Principal resolution failed")
    }

    /// Computes the password status of a user.
    pub async fn password_status(&self, user: &str) -> Result<PasswordStatus> {
        let Some(engine) = &self.policy else {
            bail!("No password policy configured");
        };
        Ok(engine.days_until_expiration(user).await?)
    }
}

fn enabled(on: bool) -> &'static str {
    if on {
        "enabled"
    } else {
        "disabled"
    }
}
