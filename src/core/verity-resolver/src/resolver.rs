//! Principal resolver trait and the initial username resolver.

use async_trait::async_trait;
use tracing::debug;

use verity_identity::{Credential, Principal};

use crate::ResolverError;

/// Trait for principal resolvers.
///
/// A resolver turns a credential into a principal. `Ok(None)` means the
/// principal could not be found, which is not an error.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Returns `true` if this resolver can handle the credential.
    fn supports(&self, credential: &Credential) -> bool;

    /// Resolves the credential into a principal.
    async fn resolve(&self, credential: &Credential) -> Result<Option<Principal>, ResolverError>;

    /// Returns the name of this resolver for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Resolves a principal whose id is the credential's public identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsernamePrincipalResolver;

#[async_trait]
impl PrincipalResolver for UsernamePrincipalResolver {
    fn supports(&self, _credential: &Credential) -> bool {
        true
    }

    async fn resolve(&self, credential: &Credential) -> Result<Option<Principal>, ResolverError> {
        let principal = Principal::new(credential.id().trim()).ok();
        debug!(credential = %credential, resolved = principal.is_some(), "Initial principal resolution");
        Ok(principal)
    }

    fn name(&self) -> &'static str {
        "username"
    }
}
