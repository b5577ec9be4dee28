//! Search filter templates with one substitutable parameter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DirectoryError;

/// Placeholder tokens accepted in a filter template.
///
/// `%U` is replaced with the part of the value before `@`; every other token
/// with the whole value.
const PLACEHOLDERS: [&str; 5] = ["{0}", "{user}", "%s", "%u", "%U"];

/// A filter template such as `(&(uid=%s))`.
///
/// The template must contain exactly one placeholder. Substituted values are
/// escaped per RFC 4515 so a user id cannot alter the filter structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SearchFilter {
    template: String,
    #[serde(skip)]
    placeholder: &'static str,
}

impl SearchFilter {
    /// Parses and validates a filter template.
    pub fn new(template: impl Into<String>) -> Result<Self, DirectoryError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(DirectoryError::InvalidFilter(
                "filter template cannot be empty".into(),
            ));
        }

        let mut found = Vec::new();
        for token in PLACEHOLDERS {
            for _ in template.matches(token) {
                found.push(token);
            }
        }

        match found.as_slice() {
            [placeholder] => Ok(Self {
                placeholder: *placeholder,
                template,
            }),
            [] => Err(DirectoryError::InvalidFilter(format!(
                "filter template {:?} has no parameter placeholder",
                template
            ))),
            _ => Err(DirectoryError::InvalidFilter(format!(
                "filter template {:?} has {} parameter placeholders, expected one",
                template,
                found.len()
            ))),
        }
    }

    /// Raw template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitutes the parameter into the template.
    pub fn format(&self, value: &str) -> String {
        let value = if self.placeholder == "%U" {
            value.split_once('@').map(|(local, _)| local).unwrap_or(value)
        } else {
            value
        };
        self.template.replacen(self.placeholder, &escape_value(value), 1)
    }
}

impl TryFrom<String> for SearchFilter {
    type Error = DirectoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SearchFilter> for String {
    fn from(filter: SearchFilter) -> Self {
        filter.template
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Escapes an assertion value per RFC 4515.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
    }
    escaped
}
