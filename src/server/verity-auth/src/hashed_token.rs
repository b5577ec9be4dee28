//! Token authentication handler.
//!
//! Validates token credentials against stored Argon2id hashes.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use tracing::error;
use zeroize::Zeroizing;

use verity_identity::{Credential, Principal};

use crate::{AuthenticationHandler, FailureKind, HandlerError, HandlerResult};

/// Callback for retrieving the stored hash of a token id.
///
/// This allows the handler to be decoupled from the storage implementation.
pub type TokenHashFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Authentication handler for token credentials.
pub struct HashedTokenHandler {
    /// Function to get the stored hash for a token id.
    get_hash: TokenHashFn,
}

impl HashedTokenHandler {
    /// Creates a new token handler.
    ///
    /// # Arguments
    ///
    /// * `get_hash` - Callback that returns the stored Argon2id hash of a token.
    pub fn new(get_hash: TokenHashFn) -> Self {
        Self { get_hash }
    }

    /// Creates a handler with a static id-to-hash table.
    pub fn with_static_hashes(hashes: HashMap<String, String>) -> Self {
        Self::new(Arc::new(move |id: &str| hashes.get(id).cloned()))
    }

    fn fail(&self, kind: FailureKind, message: impl Into<String>) -> HandlerError {
        HandlerError::new(self.name(), kind, message)
    }
}

/// Verifies `secret` against an Argon2 PHC string on the blocking pool.
///
/// A malformed stored hash fails the login rather than the whole attempt.
pub(crate) async fn verify_hash(
    handler_name: &str,
    phc: String,
    secret: Zeroizing<String>,
) -> Result<bool, HandlerError> {
    let name = handler_name.to_string();
    tokio::task::spawn_blocking(move || -> Result<bool, HandlerError> {
        let parsed = PasswordHash::new(&phc).map_err(|e| {
            error!(handler = %name, error = %e, "Invalid stored hash");
            HandlerError::new(name.as_str(), FailureKind::FailedLogin, "invalid stored hash")
        })?;
        Ok(Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| {
        error!(handler = handler_name, error = %e, "Hash verification task failed");
        HandlerError::new(handler_name, FailureKind::FailedLogin, "hash verification failed")
    })?
}

#[async_trait]
impl AuthenticationHandler for HashedTokenHandler {
    async fn authenticate(&self, credential: &Credential) -> Result<HandlerResult, HandlerError> {
        let Credential::Token { id, secret } = credential else {
            return Err(self.fail(FailureKind::UnsupportedCredential, "expected a token credential"));
        };

        // Get the stored hash
        let hash = (self.get_hash)(id.as_str())
            .ok_or_else(|| self.fail(FailureKind::AccountNotFound, format!("no hash stored for {}", id)))?;

        let valid = verify_hash(self.name(), hash, secret.clone()).await?;

        if !valid {
            return Err(self.fail(FailureKind::FailedLogin, "token mismatch"));
        }

        let principal =
            Principal::new(id.as_str()).map_err(|e| self.fail(FailureKind::FailedLogin, e.to_string()))?;
        Ok(HandlerResult::new(self.name(), credential, principal).with_metadata("credentialType", "token"))
    }

    fn supports(&self, credential: &Credential) -> bool {
        matches!(credential, Credential::Token { .. })
    }

    fn name(&self) -> &str {
        "hashed-token"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
    use rand::rngs::OsRng;

    fn hash_token(token: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        argon2
            .hash_password(token.as_bytes(), &salt)
            .expect("failed to hash password")
            .to_string()
    }

    fn setup() -> HashedTokenHandler {
        let mut hashes = HashMap::new();
        hashes.insert("ci-bot".to_string(), hash_token("my-secret-token"));
        hashes.insert("broken".to_string(), "not-a-phc-string".to_string());
        HashedTokenHandler::with_static_hashes(hashes)
    }

    #[tokio::test]
    async fn test_valid_token() {
        let credential = Credential::token("ci-bot", "my-secret-token").unwrap();
        let result = setup().authenticate(&credential).await.expect("validation failed");

        assert_eq!(result.principal.id(), "ci-bot");
        assert_eq!(result.handler_name, "hashed-token");
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let credential = Credential::token("ci-bot", "wrong-token").unwrap();
        let result = setup().authenticate(&credential).await;

        assert!(matches!(result, Err(HandlerError { kind: FailureKind::FailedLogin, .. })));
    }

    #[tokio::test]
    async fn test_no_hash_stored() {
        let handler = HashedTokenHandler::new(Arc::new(|_: &str| None));
        let credential = Credential::token("ci-bot", "any-token").unwrap();
        let result = handler.authenticate(&credential).await;

        assert!(matches!(result, Err(HandlerError { kind: FailureKind::AccountNotFound, .. })));
    }

    #[tokio::test]
    async fn test_corrupt_hash() {
        let credential = Credential::token("broken", "x").unwrap();
        let result = setup().authenticate(&credential).await;

        assert!(matches!(result, Err(HandlerError { kind: FailureKind::FailedLogin, .. })));
    }

    #[test]
    fn test_supports_tokens_only() {
        let handler = setup();
        assert!(handler.supports(&Credential::token("ci-bot", "x").unwrap()));
        assert!(!handler.supports(&Credential::username_password("casuser", "x").unwrap()));
    }
}
