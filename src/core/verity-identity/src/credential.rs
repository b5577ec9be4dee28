//! Caller-submitted credentials.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::IdentityError;

/// Identity of a credential, used to detect duplicate submissions.
///
/// Two credentials with equal keys are the same credential as far as one
/// login transaction is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialKey(String);

impl CredentialKey {
    /// Creates a key from an already-normalized value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Key value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Evidence of identity submitted by a caller.
///
/// Secrets are wiped from memory on drop and never printed by `Debug`.
#[derive(Clone)]
pub enum Credential {
    /// Username and password pair.
    UsernamePassword {
        /// Login name as typed by the user.
        username: String,
        /// Password.
        password: Zeroizing<String>,
    },
    /// Opaque token (API key, one-time token, ...).
    Token {
        /// Public token identifier.
        id: String,
        /// Token secret.
        secret: Zeroizing<String>,
    },
}

impl Credential {
    /// Creates a username/password credential.
    pub fn username_password(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(IdentityError::InvalidCredential(
                "username cannot be empty".into(),
            ));
        }
        Ok(Self::UsernamePassword {
            username,
            password: Zeroizing::new(password.into()),
        })
    }

    /// Creates a token credential.
    pub fn token(id: impl Into<String>, secret: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdentityError::InvalidCredential(
                "token id cannot be empty".into(),
            ));
        }
        Ok(Self::Token {
            id,
            secret: Zeroizing::new(secret.into()),
        })
    }

    /// Parses an `ID:SECRET` token specification.
    pub fn parse_token(spec: &str) -> Result<Self, IdentityError> {
        let (id, secret) = spec
            .split_once(':')
            .ok_or_else(|| IdentityError::InvalidCredential("expected ID:SECRET".into()))?;
        Self::token(id, secret)
    }

    /// Public identifier: the username or the token id.
    pub fn id(&self) -> &str {
        match self {
            Self::UsernamePassword { username, .. } => username,
            Self::Token { id, .. } => id,
        }
    }

    /// Default identity key.
    ///
    /// Usernames compare case-insensitively, token ids exactly.
    pub fn identity_key(&self) -> CredentialKey {
        match self {
            Self::UsernamePassword { username, .. } => {
                CredentialKey(format!("password:{}", username.trim().to_lowercase()))
            },
            Self::Token { id, .. } => CredentialKey(format!("token:{}", id)),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
            Self::Token { id, .. } => f
                .debug_struct("Token")
                .field("id", id)
                .field("secret", &"[redacted]")
                .finish(),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernamePassword { username, .. } => write!(f, "{}", username),
            Self::Token { id, .. } => write!(f, "token {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_key_is_case_insensitive() {
        let a = Credential::username_password("CasUser", "Mellon").unwrap();
        let b = Credential::username_password("casuser", "other").unwrap();

        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_token_and_password_keys_differ() {
        let a = Credential::username_password("casuser", "Mellon").unwrap();
        let b = Credential::token("casuser", "Mellon").unwrap();

        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = Credential::username_password("casuser", "Mellon").unwrap();
        let printed = format!("{:?}", credential);

        assert!(printed.contains("casuser"));
        assert!(!printed.contains("Mellon"));
    }

    #[test]
    fn test_parse_token() {
        let credential = Credential::parse_token("ci-bot:s3cr3t").unwrap();
        assert_eq!(credential.id(), "ci-bot");

        assert!(matches!(
            Credential::parse_token("no-separator"),
            Err(IdentityError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_empty_username_rejected() {
        assert!(Credential::username_password("", "x").is_err());
    }
}
