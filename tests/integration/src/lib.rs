//! Integration tests for Verity.
//!
//! These tests run complete login transactions across the auth, resolver,
//! password policy and directory crates, backed by the memory directory.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use verity_auth::{
    AcceptUsersConfig, AcceptUsersHandler, AuthenticationManager, ManagerConfig, RegisteredHandler,
};
use verity_directory::{DirectoryAttribute, DirectoryEntry, SearchFilter};
use verity_directory_memory::MemoryDirectory;
use verity_password_policy::{PasswordPolicyConfig, PasswordPolicyEngine};
use verity_resolver::{DirectoryPrincipalResolver, DirectoryResolverConfig, UsernamePrincipalResolver};

// ============================================================================
// Fixtures
// ============================================================================

/// Directory entry for a person under `ou=people,dc=example,dc=org`.
pub fn person(uid: &str, extra: &[(&str, &str)]) -> DirectoryEntry {
    person_in("people", uid, extra)
}

/// Directory entry for a person under the given organizational unit.
pub fn person_in(ou: &str, uid: &str, extra: &[(&str, &str)]) -> DirectoryEntry {
    let mut attributes = vec![DirectoryAttribute::text("uid", [uid])];
    attributes.extend(
        extra
            .iter()
            .map(|(name, value)| DirectoryAttribute::text(*name, [*value])),
    );
    DirectoryEntry::new(format!("uid={},ou={},dc=example,dc=org", uid, ou), attributes)
}

/// Resolver configuration searching by `uid` and mapping `mail` to `email`.
pub fn resolver_config(allow_multiple_results: bool) -> DirectoryResolverConfig {
    DirectoryResolverConfig {
        base_dn: "dc=example,dc=org".into(),
        filter: SearchFilter::new("(&(uid=%s))").ok(),
        username_attribute: "uid".into(),
        attribute_mapping: HashMap::from([("mail".to_string(), "email".to_string())]),
        allow_multiple_results,
        ..Default::default()
    }
}

/// Password policy on a generalized-time `pwdChangedTime` attribute.
pub fn policy_config(valid_days: i64, warning_days: i64) -> PasswordPolicyConfig {
    PasswordPolicyConfig {
        base_dn: "dc=example,dc=org".into(),
        filter: SearchFilter::new("(uid=%u)").ok(),
        date_attribute: "pwdChangedTime".into(),
        date_format: "%Y%m%d%H%M%SZ".into(),
        no_warn_attribute: Some("pwdNeverExpires".into()),
        no_warn_values: vec!["TRUE".into()],
        valid_days,
        warning_days,
        ..Default::default()
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Memory directory plus component constructors.
pub struct Harness {
    /// Directory every component searches.
    pub directory: Arc<MemoryDirectory>,
}

impl Harness {
    /// Creates a harness over the given entries.
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            directory: Arc::new(MemoryDirectory::new(entries)),
        }
    }

    /// Directory resolver seeded by the username resolver.
    pub fn resolver(&self, config: DirectoryResolverConfig) -> Result<Arc<DirectoryPrincipalResolver>> {
        let resolver = DirectoryPrincipalResolver::new(
            Arc::new(UsernamePrincipalResolver),
            self.directory.clone(),
            config,
        )?;
        Ok(Arc::new(resolver))
    }

    /// Password policy engine.
    pub fn policy(&self, config: PasswordPolicyConfig) -> Result<PasswordPolicyEngine> {
        Ok(PasswordPolicyEngine::new(self.directory.clone(), config)?)
    }

    /// Manager over one accept-users handler, optionally paired with a resolver.
    pub fn manager(
        &self,
        users: &[(&str, &str)],
        resolver: Option<Arc<DirectoryPrincipalResolver>>,
        config: &ManagerConfig,
    ) -> Result<AuthenticationManager> {
        let mut handler_config = AcceptUsersConfig::default();
        for (username, password) in users {
            handler_config
                .users
                .insert(username.to_string(), password.to_string());
        }
        let mut handler = RegisteredHandler::new(Arc::new(AcceptUsersHandler::new(handler_config)?));
        if let Some(resolver) = resolver {
            handler = handler.with_resolver(resolver);
        }
        Ok(AuthenticationManager::new(vec![handler], config)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use verity_auth::{
        AuthError, AuthenticationContextBuilder, AuthenticationException, DispatchMode,
        FailureClassifier, FailureKind, HandlerError, LoginOutcome, PolicyConfig,
        AUTHENTICATION_METHOD_ATTRIBUTE,
    };
    use verity_identity::{AttributeValue, Attributes, Credential, Principal};
    use verity_password_policy::decode::{decode_vendor_epoch, encode_vendor_epoch};
    use verity_password_policy::{PasswordStatus, PolicyError};
    use verity_resolver::ResolverError;

    use super::*;

    fn login(username: &str, password: &str) -> Credential {
        Credential::username_password(username, password).unwrap()
    }

    fn try_all() -> ManagerConfig {
        ManagerConfig {
            policy: PolicyConfig::Any { try_all: true },
            ..Default::default()
        }
    }

    fn changed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_same_credential_twice_collects_once() {
        let harness = Harness::new(vec![]);
        let manager = harness
            .manager(&[("casuser", "Mellon")], None, &try_all())
            .unwrap();

        let auth = manager
            .authenticate(&[login("casuser", "Mellon"), login("casuser", "Mellon")])
            .await
            .unwrap();

        assert_eq!(auth.successes.len(), 1);
        let methods: Vec<_> = auth
            .attributes
            .keys()
            .filter(|k| k.as_str() == AUTHENTICATION_METHOD_ATTRIBUTE)
            .collect();
        assert_eq!(methods.len(), 1);
        assert_eq!(auth.authentication_methods(), vec!["accept-users"]);
    }

    #[tokio::test]
    async fn test_builder_size_matches_successes() {
        let harness = Harness::new(vec![]);
        let manager = harness
            .manager(&[("casuser", "Mellon"), ("test", "test")], None, &try_all())
            .unwrap();
        let builder = AuthenticationContextBuilder::new();

        for credential in [login("casuser", "Mellon"), login("test", "test"), login("casuser", "Mellon")] {
            let auth = manager.authenticate(&[credential]).await.unwrap();
            builder.collect(auth).await;
        }

        let size = builder.size().await;
        let merged = builder.build().await.into_authentication().unwrap();
        assert_eq!(size, 2);
        assert_eq!(merged.successes.len(), size);
        assert_eq!(merged.principal.id(), "casuser");
    }

    #[tokio::test]
    async fn test_directory_resolution_maps_attributes() {
        let harness = Harness::new(vec![person("jdoe", &[("mail", "j@x.com")])]);
        let resolver = harness.resolver(resolver_config(false)).unwrap();

        let resolved = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await
            .unwrap()
            .unwrap();

        let mut expected = Attributes::new();
        expected.insert("email".into(), AttributeValue::from("j@x.com"));
        assert_eq!(resolved, Principal::with_attributes("jdoe", expected).unwrap());
    }

    #[tokio::test]
    async fn test_ambiguous_directory_match() {
        let entries = vec![
            person_in("staff", "jdoe", &[("mail", "staff@x.com")]),
            person_in("contractors", "jdoe", &[("mail", "contractor@x.com")]),
        ];
        let harness = Harness::new(entries);
        let initial = Principal::new("jdoe").unwrap();

        let strict = harness.resolver(resolver_config(false)).unwrap();
        let result = strict.resolve_principal(&initial).await;
        assert!(matches!(result, Err(ResolverError::TooManyResults { count: 2, .. })));

        let lenient = harness.resolver(resolver_config(true)).unwrap();
        let resolved = lenient.resolve_principal(&initial).await.unwrap().unwrap();
        assert_eq!(
            resolved.attribute("email").and_then(|v| v.as_str()),
            Some("staff@x.com")
        );
    }

    #[tokio::test]
    async fn test_login_enriched_by_directory() {
        let harness = Harness::new(vec![person("jdoe", &[("mail", "j@x.com"), ("cn", "John")])]);
        let resolver = harness.resolver(resolver_config(false)).unwrap();
        let manager = harness
            .manager(&[("jdoe", "pw")], Some(resolver), &ManagerConfig::default())
            .unwrap();

        let auth = manager.authenticate(&[login("jdoe", "pw")]).await.unwrap();

        assert_eq!(auth.principal.id(), "jdoe");
        assert_eq!(auth.principal.attribute("email").and_then(|v| v.as_str()), Some("j@x.com"));
        // Unmapped attributes are not requested
        assert!(auth.principal.attribute("cn").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_directory_degrades_softly() {
        let harness = Harness::new(vec![person(
            "jdoe",
            &[("mail", "j@x.com"), ("pwdChangedTime", "20000101000000Z")],
        )]);
        harness.directory.set_unavailable(true);

        let resolver = harness.resolver(resolver_config(false)).unwrap();
        let manager = harness
            .manager(&[("jdoe", "pw")], Some(resolver), &ManagerConfig::default())
            .unwrap();
        let auth = manager.authenticate(&[login("jdoe", "pw")]).await.unwrap();
        assert!(auth.principal.attributes().is_empty());

        let engine = harness.policy(policy_config(90, 30)).unwrap();
        let status = engine.days_until_expiration("jdoe").await.unwrap();
        assert_eq!(status, PasswordStatus::Pass);
    }

    #[tokio::test]
    async fn test_failures_classified_by_precedence() {
        let mut config = AcceptUsersConfig::default();
        config.users.insert("casuser".into(), "Mellon".into());
        config.users.insert("mallory".into(), "x".into());
        config.locked.insert("mallory".into());
        let locked = AcceptUsersHandler::new(config).unwrap();
        let manager = AuthenticationManager::new(
            vec![RegisteredHandler::new(Arc::new(locked))],
            &try_all(),
        )
        .unwrap();

        let result = manager.authenticate(&[login("mallory", "x")]).await;
        let Err(error) = result else {
            panic!("expected failure");
        };
        let outcome = LoginOutcome::from_error(&FailureClassifier::default(), &error);
        assert_eq!(outcome.code(), "AccountLocked");
    }

    #[test]
    fn test_precedence_is_list_order() {
        let exception = AuthenticationException::new()
            .with("x", HandlerError::new("x", FailureKind::FailedLogin, "mismatch"))
            .with("y", HandlerError::new("y", FailureKind::AccountLocked, "locked"))
            .with("z", HandlerError::new("z", FailureKind::AccountNotFound, "missing"));

        let default = FailureClassifier::default().handle(Some(&exception));
        assert_eq!(default.code, "AccountLocked");
        assert_eq!(default.messages.len(), 3);

        let reversed = verity_auth::classify(
            exception.handler_errors(),
            &[FailureKind::FailedLogin, FailureKind::AccountLocked],
        );
        assert_eq!(reversed, Some(FailureKind::FailedLogin));
    }

    #[test]
    fn test_vendor_epoch_round_trip() {
        for seconds in [0_i64, 1_000_000_000, 1_704_067_200, 4_102_444_800] {
            let instant = DateTime::from_timestamp(seconds, 0).unwrap();
            let decoded = decode_vendor_epoch(&encode_vendor_epoch(instant).to_string()).unwrap();
            assert_eq!(decoded.timestamp(), seconds);
        }
    }

    #[tokio::test]
    async fn test_password_warning_boundary() {
        let harness = Harness::new(vec![person("jdoe", &[("pwdChangedTime", "20240101000000Z")])]);
        let engine = harness.policy(policy_config(90, 30)).unwrap();
        let expiration = changed_at() + TimeDelta::days(90);

        let at_boundary = expiration - TimeDelta::days(30);
        let status = engine.days_until_expiration_at("jdoe", at_boundary).await.unwrap();
        assert_eq!(status, PasswordStatus::Expiring { days: 30 });

        let before = at_boundary - TimeDelta::seconds(1);
        let status = engine.days_until_expiration_at("jdoe", before).await.unwrap();
        assert_eq!(status.as_days(), -1);

        let result = engine.days_until_expiration_at("jdoe", expiration).await;
        assert!(matches!(result, Err(PolicyError::Enforcement(_))));
    }

    #[tokio::test]
    async fn test_never_expire_overrides_expired_date() {
        let harness = Harness::new(vec![
            person("svc", &[("pwdChangedTime", "20000101000000Z"), ("pwdNeverExpires", "TRUE")]),
            person(
                "legacy",
                &[("pwdChangedTime", "20000101000000Z"), ("pwdNeverExpires", "9223372036854775807")],
            ),
        ]);
        let engine = harness.policy(policy_config(90, 30)).unwrap();

        for user in ["svc", "legacy"] {
            let status = engine.days_until_expiration_at(user, changed_at()).await.unwrap();
            assert_eq!(status, PasswordStatus::Pass, "user {}", user);
        }
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_matches_sequential() {
        let harness = Harness::new(vec![]);
        let users = [("casuser", "Mellon"), ("test", "test")];
        let credentials = [login("casuser", "Mellon"), login("nobody", "x"), login("test", "test")];

        let sequential = harness.manager(&users, None, &try_all()).unwrap();
        let concurrent = harness
            .manager(
                &users,
                None,
                &ManagerConfig {
                    dispatch: DispatchMode::Concurrent,
                    ..try_all()
                },
            )
            .unwrap();

        let a = sequential.authenticate(&credentials).await.unwrap();
        let b = concurrent.authenticate(&credentials).await.unwrap();

        assert_eq!(a.principal, b.principal);
        assert_eq!(a.successes.len(), b.successes.len());
        assert_eq!(a.failures, b.failures);
    }

    #[tokio::test]
    async fn test_login_outcome_json() {
        let harness = Harness::new(vec![]);
        let manager = harness
            .manager(&[("casuser", "Mellon")], None, &ManagerConfig::default())
            .unwrap();
        let classifier = FailureClassifier::default();

        let auth = manager.authenticate(&[login("casuser", "Mellon")]).await.unwrap();
        let json = serde_json::to_value(LoginOutcome::success(auth, Some(-1))).unwrap();
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["authentication"]["principal"]["id"], "casuser");

        let error = manager
            .authenticate(&[login("casuser", "wrong")])
            .await
            .unwrap_err();
        assert!(matches!(error, AuthError::Failed(_)));
        let json = serde_json::to_value(LoginOutcome::from_error(&classifier, &error)).unwrap();
        assert_eq!(json["code"], "FailedLogin");
        assert_eq!(json["messages"][0], "authenticationFailure.FailedLogin");
    }
}
