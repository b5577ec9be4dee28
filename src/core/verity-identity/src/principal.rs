//! Resolved identities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AttributeValue, Attributes, IdentityError};

/// An immutable resolved identity.
///
/// Re-resolution never mutates a principal; it produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    #[serde(default)]
    attributes: Attributes,
}

impl Principal {
    /// Creates a principal without attributes.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        Self::with_attributes(id, Attributes::new())
    }

    /// Creates a principal with the given attributes.
    pub fn with_attributes(
        id: impl Into<String>,
        attributes: Attributes,
    ) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdentityError::InvalidPrincipalId(id));
        }
        Ok(Self { id, attributes })
    }

    /// Principal identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Looks up one attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
