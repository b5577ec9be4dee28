//! Authentication handler trait.

use std::sync::Arc;

use async_trait::async_trait;

use verity_identity::{Credential, CredentialKey};
use verity_resolver::PrincipalResolver;

use crate::{HandlerError, HandlerResult};

/// Trait for authentication handlers.
///
/// A handler validates the credentials it supports and returns a
/// [`HandlerResult`] on success.
#[async_trait]
pub trait AuthenticationHandler: Send + Sync {
    /// Validates the given credential.
    ///
    /// # Returns
    ///
    /// * `Ok(HandlerResult)` - If the credential is valid
    /// * `Err(HandlerError)` - If validation fails
    async fn authenticate(&self, credential: &Credential) -> Result<HandlerResult, HandlerError>;

    /// Returns `true` if this handler can validate the credential.
    fn supports(&self, credential: &Credential) -> bool;

    /// Identity used to detect duplicate credentials.
    fn credential_key(&self, credential: &Credential) -> CredentialKey {
        credential.identity_key()
    }

    /// Returns the name of this handler for logging/debugging.
    fn name(&self) -> &str;
}

/// A handler in the manager's chain, optionally paired with a resolver.
#[derive(Clone)]
pub struct RegisteredHandler {
    /// The handler.
    pub handler: Arc<dyn AuthenticationHandler>,
    /// Resolver replacing the handler's principal after success.
    pub resolver: Option<Arc<dyn PrincipalResolver>>,
}

impl RegisteredHandler {
    /// Registers a handler without a resolver.
    pub fn new(handler: Arc<dyn AuthenticationHandler>) -> Self {
        Self {
            handler,
            resolver: None,
        }
    }

    /// Pairs the handler with a resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn PrincipalResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}
