//! Authentication manager.
//!
//! Runs submitted credentials through the handler chain and merges the
//! successes into one [`Authentication`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use verity_identity::Credential;

use crate::{
    AuthError, Authentication, AuthenticationContextBuilder, AuthenticationException,
    AuthenticationPolicy, FailureKind, HandlerError, HandlerResult, PolicyConfig,
    RegisteredHandler,
};

/// How credentials of one attempt are dispatched to handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One credential at a time, in submission order.
    #[default]
    Sequential,
    /// All credentials at once.
    Concurrent,
}

/// Configuration for [`AuthenticationManager`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Dispatch mode.
    pub dispatch: DispatchMode,
    /// Upper bound for one handler invocation, in milliseconds.
    pub handler_timeout_ms: u64,
    /// Success policy.
    pub policy: PolicyConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Sequential,
            handler_timeout_ms: 5000,
            policy: PolicyConfig::default(),
        }
    }
}

/// Result of running one credential.
enum Attempt {
    Success(Authentication),
    Skipped,
    Failed(String, HandlerError),
}

/// Authenticates credentials against an ordered handler chain.
pub struct AuthenticationManager {
    handlers: Vec<RegisteredHandler>,
    policy: Arc<dyn AuthenticationPolicy>,
    dispatch: DispatchMode,
    handler_timeout: Duration,
}

impl AuthenticationManager {
    /// Creates a new manager.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the chain is empty or the
    /// configuration is invalid.
    pub fn new(handlers: Vec<RegisteredHandler>, config: &ManagerConfig) -> Result<Self, AuthError> {
        if handlers.is_empty() {
            return Err(AuthError::Configuration(
                "at least one authentication handler is required".into(),
            ));
        }
        if config.handler_timeout_ms == 0 {
            return Err(AuthError::Configuration("handler timeout must be > 0".into()));
        }
        let policy = config.policy.build()?;

        info!(
            handlers = handlers.len(),
            policy = policy.name(),
            dispatch = ?config.dispatch,
            "Authentication manager configured"
        );

        Ok(Self {
            handlers,
            policy,
            dispatch: config.dispatch,
            handler_timeout: Duration::from_millis(config.handler_timeout_ms),
        })
    }

    /// Replaces the success policy.
    pub fn with_policy(mut self, policy: Arc<dyn AuthenticationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Authenticates the credentials.
    ///
    /// # Errors
    ///
    /// * [`AuthError::Failed`] - no credential succeeded, or the policy is not
    ///   satisfied
    /// * [`AuthError::Resolver`] - a paired resolver failed hard
    pub async fn authenticate(&self, credentials: &[Credential]) -> Result<Authentication, AuthError> {
        self.authenticate_with_cancel(credentials, &CancellationToken::new())
            .await
    }

    /// Authenticates the credentials, abandoning in-flight work when `cancel`
    /// fires.
    ///
    /// A cancelled attempt discards everything collected and returns
    /// [`AuthError::Cancelled`].
    pub async fn authenticate_with_cancel(
        &self,
        credentials: &[Credential],
        cancel: &CancellationToken,
    ) -> Result<Authentication, AuthError> {
        if credentials.is_empty() {
            warn!("No credentials submitted");
            return Err(AuthError::Failed(AuthenticationException::new()));
        }

        let builder = AuthenticationContextBuilder::new();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.dispatch(credentials, &builder) => Some(result),
        };
        let Some(result) = outcome else {
            builder.discard().await;
            warn!("Authentication attempt cancelled");
            return Err(AuthError::Cancelled);
        };
        let failures = result?;

        let Some(mut authentication) = builder.build().await.into_authentication() else {
            info!(failures = failures.handler_errors().len(), "Authentication failed");
            return Err(AuthError::Failed(failures));
        };
        authentication.failures = failures.handler_errors().clone();

        if !self.policy.is_satisfied_by(&authentication) {
            info!(
                policy = self.policy.name(),
                principal = %authentication.principal,
                "Authentication policy not satisfied"
            );
            return Err(AuthError::Failed(failures));
        }

        info!(
            principal = %authentication.principal,
            successes = authentication.successes.len(),
            failures = authentication.failures.len(),
            "Authentication succeeded"
        );
        Ok(authentication)
    }

    async fn dispatch(
        &self,
        credentials: &[Credential],
        builder: &AuthenticationContextBuilder,
    ) -> Result<AuthenticationException, AuthError> {
        let mut failures = AuthenticationException::new();

        match self.dispatch {
            DispatchMode::Sequential => {
                for credential in credentials {
                    let attempt = self.attempt(credential, builder).await?;
                    record(attempt, builder, &mut failures).await;

                    if self.policy.stop_on_success() && self.satisfied(builder).await {
                        debug!(policy = self.policy.name(), "Policy satisfied, skipping remaining credentials");
                        break;
                    }
                }
            },
            DispatchMode::Concurrent => {
                let attempts =
                    join_all(credentials.iter().map(|c| self.attempt(c, builder))).await;
                for attempt in attempts {
                    record(attempt?, builder, &mut failures).await;
                }
            },
        }

        Ok(failures)
    }

    async fn satisfied(&self, builder: &AuthenticationContextBuilder) -> bool {
        builder
            .build()
            .await
            .authentication()
            .is_some_and(|a| self.policy.is_satisfied_by(a))
    }

    async fn attempt(
        &self,
        credential: &Credential,
        builder: &AuthenticationContextBuilder,
    ) -> Result<Attempt, AuthError> {
        let Some(registered) = self.handlers.iter().find(|h| h.handler.supports(credential)) else {
            warn!(credential = %credential, "No handler supports credential");
            let error = HandlerError::new(
                "unsupported",
                FailureKind::UnsupportedCredential,
                format!("no handler supports {}", credential),
            );
            return Ok(Attempt::Failed(failure_key("unsupported", credential), error));
        };

        let handler = registered.handler.as_ref();
        let key = handler.credential_key(credential);
        if builder.contains(&key).await {
            debug!(handler = handler.name(), credential = %credential, "Credential already authenticated");
            return Ok(Attempt::Skipped);
        }

        let mut result = match tokio::time::timeout(self.handler_timeout, handler.authenticate(credential)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                info!(handler = handler.name(), credential = %credential, kind = %e.kind, "Handler rejected credential");
                return Ok(Attempt::Failed(failure_key(handler.name(), credential), e));
            },
            Err(_) => {
                warn!(handler = handler.name(), timeout = ?self.handler_timeout, "Handler timed out");
                let error = HandlerError::new(
                    handler.name(),
                    FailureKind::Timeout,
                    format!("no answer after {:?}", self.handler_timeout),
                );
                return Ok(Attempt::Failed(failure_key(handler.name(), credential), error));
            },
        };
        result.credential_key = key;

        let result = self.resolve(registered, credential, result).await?;
        debug!(handler = handler.name(), principal = %result.principal, "Handler accepted credential");
        Ok(Attempt::Success(Authentication::from_result(result)))
    }

    /// Replaces the handler's principal with the paired resolver's.
    async fn resolve(
        &self,
        registered: &RegisteredHandler,
        credential: &Credential,
        mut result: HandlerResult,
    ) -> Result<HandlerResult, AuthError> {
        let Some(resolver) = registered.resolver.as_ref().filter(|r| r.supports(credential)) else {
            return Ok(result);
        };

        match resolver.resolve(credential).await? {
            Some(principal) => {
                debug!(resolver = resolver.name(), principal = %principal, "Principal resolved");
                result.principal = principal;
            },
            None => {
                info!(
                    resolver = resolver.name(),
                    principal = %result.principal,
                    "Resolver found no principal, keeping handler principal"
                );
            },
        }
        Ok(result)
    }
}

/// Failure key: one entry per handler and credential.
fn failure_key(handler_name: &str, credential: &Credential) -> String {
    format!("{}[{}]", handler_name, credential.id())
}

async fn record(attempt: Attempt, builder: &AuthenticationContextBuilder, failures: &mut AuthenticationException) {
    match attempt {
        Attempt::Success(authentication) => {
            builder.collect(authentication).await;
        },
        Attempt::Failed(key, error) => failures.record(key, error),
        Attempt::Skipped => {},
    }
}
