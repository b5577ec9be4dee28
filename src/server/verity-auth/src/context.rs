//! Authentication results and the per-transaction context builder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use verity_identity::{AttributeValue, Attributes, Credential, CredentialKey, Principal};

use crate::HandlerError;

/// Attribute recording which handlers authenticated the principal.
pub const AUTHENTICATION_METHOD_ATTRIBUTE: &str = "authenticationMethod";

/// Outcome of one successful handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResult {
    /// Handler that validated the credential.
    pub handler_name: String,
    /// Identity of the validated credential.
    pub credential_key: CredentialKey,
    /// Principal produced by the handler.
    pub principal: Principal,
    /// Handler-specific metadata.
    pub metadata: Attributes,
}

impl HandlerResult {
    /// Creates a result keyed by the credential's default identity.
    pub fn new(handler_name: impl Into<String>, credential: &Credential, principal: Principal) -> Self {
        Self {
            handler_name: handler_name.into(),
            credential_key: credential.identity_key(),
            principal,
            metadata: Attributes::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }
}

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authentication {
    /// Principal of the first collected success.
    pub principal: Principal,
    /// One entry per distinct credential, in collection order.
    pub successes: Vec<HandlerResult>,
    /// Non-fatal failures recorded for other credentials.
    pub failures: BTreeMap<String, HandlerError>,
    /// Handler-contributed attributes.
    pub attributes: Attributes,
    /// When the first success was recorded.
    pub authenticated_at: DateTime<Utc>,
}

impl Authentication {
    /// Wraps a single handler result.
    pub fn from_result(result: HandlerResult) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(
            AUTHENTICATION_METHOD_ATTRIBUTE.to_string(),
            AttributeValue::from(result.handler_name.as_str()),
        );

        Self {
            principal: result.principal.clone(),
            successes: vec![result],
            failures: BTreeMap::new(),
            attributes,
            authenticated_at: Utc::now(),
        }
    }

    /// Credential identities that contributed to this authentication.
    pub fn credential_keys(&self) -> impl Iterator<Item = &CredentialKey> {
        self.successes.iter().map(|s| &s.credential_key)
    }

    /// Returns `true` if the named handler contributed a success.
    pub fn has_success_from(&self, handler_name: &str) -> bool {
        self.successes.iter().any(|s| s.handler_name == handler_name)
    }

    /// Names of the handlers recorded under [`AUTHENTICATION_METHOD_ATTRIBUTE`].
    pub fn authentication_methods(&self) -> Vec<&str> {
        match self.attributes.get(AUTHENTICATION_METHOD_ATTRIBUTE) {
            Some(AttributeValue::Text(method)) => vec![method.as_str()],
            Some(AttributeValue::TextList(methods)) => methods.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Output of [`AuthenticationContextBuilder::build`].
///
/// Holds an authentication if and only if something was collected.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationContext {
    authentication: Option<Authentication>,
}

impl AuthenticationContext {
    /// Merged authentication, if any.
    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    /// Consumes the context.
    pub fn into_authentication(self) -> Option<Authentication> {
        self.authentication
    }

    /// Returns `true` if an authentication is present.
    pub fn is_authenticated(&self) -> bool {
        self.authentication.is_some()
    }
}

/// Accumulates successful authentications for one login transaction.
///
/// Safe to share between tasks: every operation is serialized by an
/// internal lock.
#[derive(Debug, Default)]
pub struct AuthenticationContextBuilder {
    collected: Mutex<Vec<Authentication>>,
}

impl AuthenticationContextBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an authentication unless one of its credentials was already
    /// collected. Returns `true` if it was added.
    pub async fn collect(&self, authentication: Authentication) -> bool {
        let mut collected = self.collected.lock().await;
        let duplicate = authentication
            .credential_keys()
            .any(|key| collected.iter().any(|a| a.credential_keys().any(|k| k == key)));

        if duplicate {
            debug!(principal = %authentication.principal, "Duplicate credential, not collected");
            return false;
        }
        collected.push(authentication);
        true
    }

    /// Returns `true` if a credential with this identity was collected.
    pub async fn contains(&self, key: &CredentialKey) -> bool {
        self.collected
            .lock()
            .await
            .iter()
            .any(|a| a.credential_keys().any(|k| k == key))
    }

    /// Number of distinct authentications collected.
    pub async fn size(&self) -> usize {
        self.collected.lock().await.len()
    }

    /// Drops everything collected.
    pub async fn discard(&self) {
        self.collected.lock().await.clear();
    }

    /// Merges everything collected into one authentication.
    ///
    /// The first collected principal wins. Attributes are merged first-wins,
    /// except [`AUTHENTICATION_METHOD_ATTRIBUTE`] which accumulates the
    /// names of every contributing handler.
    pub async fn build(&self) -> AuthenticationContext {
        let collected = self.collected.lock().await;
        let Some((first, rest)) = collected.split_first() else {
            return AuthenticationContext::default();
        };

        let mut merged = first.clone();
        for authentication in rest {
            merged.successes.extend(authentication.successes.iter().cloned());
            for (key, error) in &authentication.failures {
                merged.failures.entry(key.clone()).or_insert_with(|| error.clone());
            }
            for (name, value) in &authentication.attributes {
                merge_attribute(&mut merged.attributes, name, value);
            }
        }

        AuthenticationContext {
            authentication: Some(merged),
        }
    }
}

fn merge_attribute(attributes: &mut Attributes, name: &str, value: &AttributeValue) {
    let Some(existing) = attributes.get_mut(name) else {
        attributes.insert(name.to_string(), value.clone());
        return;
    };
    if name != AUTHENTICATION_METHOD_ATTRIBUTE {
        return;
    }
    match value {
        AttributeValue::Text(method) => existing.push_text(method),
        AttributeValue::TextList(methods) => methods.iter().for_each(|m| existing.push_text(m)),
        AttributeValue::Binary(_) | AttributeValue::BinaryList(_) => {},
    }
}
