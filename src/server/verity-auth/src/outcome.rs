//! Login outcome handed to the flow layer.

use serde::Serialize;

use crate::{
    AuthError, Authentication, AuthenticationException, ClassifiedFailure, FailureClassifier,
    FailureKind, HandlerError,
};

/// Result of one login attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// The attempt succeeded.
    Success {
        /// Merged authentication.
        authentication: Authentication,
        /// Days to password expiration when a warning applies, `-1` when the
        /// policy passes, absent when not computed.
        #[serde(skip_serializing_if = "Option::is_none")]
        days_until_expiration: Option<i64>,
    },
    /// The attempt failed.
    Failure {
        /// Outcome code driving the next step.
        code: String,
        /// Message keys for display.
        messages: Vec<String>,
    },
}

impl LoginOutcome {
    /// Successful outcome.
    pub fn success(authentication: Authentication, days_until_expiration: Option<i64>) -> Self {
        Self::Success {
            authentication,
            days_until_expiration,
        }
    }

    /// Failed outcome from a classification.
    pub fn failure(classified: ClassifiedFailure) -> Self {
        Self::Failure {
            code: classified.code,
            messages: classified.messages,
        }
    }

    /// Classifies an authentication error.
    ///
    /// Errors other than [`AuthError::Failed`] carry no handler errors and
    /// classify as unknown.
    pub fn from_error(classifier: &FailureClassifier, error: &AuthError) -> Self {
        match error {
            AuthError::Failed(exception) => Self::failure(classifier.handle(Some(exception))),
            _ => Self::failure(classifier.handle(None)),
        }
    }

    /// Failed outcome for an expired password.
    pub fn password_expired(classifier: &FailureClassifier, source: &str, message: &str) -> Self {
        let exception = AuthenticationException::new().with(
            source,
            HandlerError::new(source, FailureKind::CredentialExpired, message),
        );
        Self::failure(classifier.handle(Some(&exception)))
    }

    /// Returns `true` for a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Outcome code: `SUCCESS` or the failure code.
    pub fn code(&self) -> &str {
        match self {
            Self::Success { .. } => "SUCCESS",
            Self::Failure { code, .. } => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HandlerResult;
    use verity_identity::{Credential, Principal};

    fn authentication() -> Authentication {
        let credential = Credential::username_password("casuser", "Mellon").unwrap();
        Authentication::from_result(HandlerResult::new(
            "accept-users",
            &credential,
            Principal::new("casuser").unwrap(),
        ))
    }

    #[test]
    fn test_success_json() {
        let outcome = LoginOutcome::success(authentication(), Some(5));
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["outcome"], "success");
        assert_eq!(json["days_until_expiration"], 5);
        assert_eq!(json["authentication"]["principal"]["id"], "casuser");
        assert_eq!(
            json["authentication"]["attributes"]["authenticationMethod"],
            "accept-users"
        );
        assert!(outcome.is_success());
        assert_eq!(outcome.code(), "SUCCESS");
    }

    #[test]
    fn test_failure_from_error() {
        let exception = AuthenticationException::new().with(
            "accept-users",
            HandlerError::new("accept-users", FailureKind::AccountLocked, "locked"),
        );
        let outcome = LoginOutcome::from_error(&FailureClassifier::default(), &AuthError::Failed(exception));

        assert!(!outcome.is_success());
        assert_eq!(outcome.code(), "AccountLocked");

        let outcome = LoginOutcome::from_error(&FailureClassifier::default(), &AuthError::Cancelled);
        assert_eq!(outcome.code(), "UNKNOWN");
    }

    #[test]
    fn test_password_expired() {
        let outcome = LoginOutcome::password_expired(&FailureClassifier::default(), "password-policy", "expired");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["code"], "CredentialExpired");
        assert_eq!(json["messages"][0], "authenticationFailure.CredentialExpired");
    }
}
