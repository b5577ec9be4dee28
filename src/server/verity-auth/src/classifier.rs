//! Failure precedence classification.
//!
//! Reduces the handler errors of a failed attempt to one outcome code while
//! keeping a message for every error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AuthenticationException, FailureKind, HandlerError};

/// Outcome code when no configured kind matches.
pub const UNKNOWN: &str = "UNKNOWN";

/// Message key prefix used when none is configured.
pub const DEFAULT_MESSAGE_BUNDLE_PREFIX: &str = "authenticationFailure.";

/// Returns the first kind of `precedence` carried by at least one error.
pub fn classify(
    errors: &BTreeMap<String, HandlerError>,
    precedence: &[FailureKind],
) -> Option<FailureKind> {
    precedence
        .iter()
        .copied()
        .find(|kind| errors.values().any(|e| e.kind == *kind))
}

/// Configuration for [`FailureClassifier`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FailureClassifierConfig {
    /// Recognized kinds, highest precedence first.
    pub precedence: Vec<FailureKind>,
    /// Prefix of every message key.
    pub message_bundle_prefix: String,
}

impl Default for FailureClassifierConfig {
    fn default() -> Self {
        Self {
            precedence: FailureKind::DEFAULT_PRECEDENCE.to_vec(),
            message_bundle_prefix: DEFAULT_MESSAGE_BUNDLE_PREFIX.to_string(),
        }
    }
}

/// One classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedFailure {
    /// Winning kind name, or [`UNKNOWN`].
    pub code: String,
    /// Message keys, one per collected error.
    pub messages: Vec<String>,
}

/// Maps authentication failures to a single ranked outcome code.
#[derive(Debug, Clone, Default)]
pub struct FailureClassifier {
    config: FailureClassifierConfig,
}

impl FailureClassifier {
    /// Creates a classifier.
    pub fn new(config: FailureClassifierConfig) -> Self {
        Self { config }
    }

    /// Configured precedence.
    pub fn precedence(&self) -> &[FailureKind] {
        &self.config.precedence
    }

    /// Classifies a failed attempt.
    ///
    /// Every collected error contributes a message. When no configured kind
    /// matches, or there is no exception at all, an `UNKNOWN` message is
    /// added and the code is [`UNKNOWN`].
    pub fn handle(&self, exception: Option<&AuthenticationException>) -> ClassifiedFailure {
        let prefix = &self.config.message_bundle_prefix;
        let mut messages = Vec::new();

        if let Some(exception) = exception {
            let errors = exception.handler_errors();
            messages.extend(errors.values().map(|e| format!("{}{}", prefix, e.kind)));

            if let Some(kind) = classify(errors, &self.config.precedence) {
                debug!(code = %kind, errors = errors.len(), "Failure classified");
                return ClassifiedFailure {
                    code: kind.name().to_string(),
                    messages,
                };
            }
        }

        messages.push(format!("{}{}", prefix, UNKNOWN));
        ClassifiedFailure {
            code: UNKNOWN.to_string(),
            messages,
        }
    }
}
