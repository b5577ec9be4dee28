//! Directory-backed principal re-resolution.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use verity_directory::{
    search_entries, DirectoryEntry, DirectorySearchPort, SearchFilter, SearchOutcome,
    SearchRequest, SearchScope,
};
use verity_identity::{AttributeMapper, Attributes, Credential, Principal};

use crate::{PrincipalResolver, ResolverError};

/// Configuration for [`DirectoryPrincipalResolver`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryResolverConfig {
    /// Base DN searches start from.
    pub base_dn: String,
    /// Filter template; the principal id is substituted into it.
    pub filter: Option<SearchFilter>,
    /// Search scope.
    pub scope: SearchScope,
    /// Attribute that supplies the resolved principal id.
    pub username_attribute: String,
    /// Directory attribute name to local attribute name.
    pub attribute_mapping: HashMap<String, String>,
    /// Use the first entry when several match instead of failing.
    ///
    /// Enabling this may resolve an ambiguous identity silently.
    pub allow_multiple_results: bool,
    /// Maximum number of entries requested.
    pub max_results: usize,
    /// Search time limit in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DirectoryResolverConfig {
    fn default() -> Self {
        Self {
            base_dn: String::new(),
            filter: None,
            scope: SearchScope::Subtree,
            username_attribute: "user".to_string(),
            attribute_mapping: HashMap::new(),
            allow_multiple_results: false,
            max_results: 10,
            timeout_ms: 1000,
        }
    }
}

impl DirectoryResolverConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ResolverError> {
        if self.filter.is_none() {
            return Err(ResolverError::Configuration(
                "search filter cannot be empty".into(),
            ));
        }
        if self.username_attribute.trim().is_empty() {
            return Err(ResolverError::Configuration(
                "username attribute cannot be empty".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(ResolverError::Configuration(
                "max results must be > 0".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ResolverError::Configuration("timeout must be > 0".into()));
        }
        Ok(())
    }
}

/// Re-resolves an already-resolved principal against a directory.
///
/// Stage one is delegated to an initial resolver, which also decides
/// whether a credential is supported. Stage two searches the directory for
/// the stage-one principal id and builds a new principal from the entry.
pub struct DirectoryPrincipalResolver {
    initial: Arc<dyn PrincipalResolver>,
    port: Arc<dyn DirectorySearchPort>,
    config: DirectoryResolverConfig,
    filter: SearchFilter,
    mapper: AttributeMapper,
}

impl DirectoryPrincipalResolver {
    /// Creates a new directory resolver.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Configuration`] if the configuration is invalid.
    pub fn new(
        initial: Arc<dyn PrincipalResolver>,
        port: Arc<dyn DirectorySearchPort>,
        config: DirectoryResolverConfig,
    ) -> Result<Self, ResolverError> {
        config.validate()?;
        let filter = config
            .filter
            .clone()
            .ok_or_else(|| ResolverError::Configuration("search filter cannot be empty".into()))?;
        let mapper = AttributeMapper::new(config.attribute_mapping.clone());

        info!(
            filter = %filter,
            username_attribute = %config.username_attribute,
            initial = initial.name(),
            port = port.name(),
            "Directory principal resolver configured"
        );

        Ok(Self {
            initial,
            port,
            config,
            filter,
            mapper,
        })
    }

    /// Directory attributes requested: mapped names plus the username attribute.
    pub fn requested_attributes(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self
            .mapper
            .directory_names()
            .map(str::to_string)
            .collect();
        names.insert(self.config.username_attribute.clone());
        names.into_iter().collect()
    }

    fn search_request(&self, principal: &Principal) -> SearchRequest {
        // Ask for one extra entry so ambiguity is detectable.
        let max_results = if self.config.allow_multiple_results {
            self.config.max_results
        } else {
            self.config.max_results.max(2)
        };

        SearchRequest {
            base_dn: self.config.base_dn.clone(),
            filter: self.filter.clone(),
            parameter: principal.id().to_string(),
            scope: self.config.scope,
            attributes: self.requested_attributes(),
            max_results,
            timeout: Duration::from_millis(self.config.timeout_ms),
        }
    }

    /// Re-resolves a principal against the directory.
    ///
    /// Returns `Ok(None)` when no entry matches, when the entry lacks the
    /// username attribute, or when the directory cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::TooManyResults`] if several entries match and
    /// multiple results are not allowed.
    pub async fn resolve_principal(
        &self,
        principal: &Principal,
    ) -> Result<Option<Principal>, ResolverError> {
        debug!(principal = %principal, "Attempting to resolve directory principal");

        let request = self.search_request(principal);
        let entries = match search_entries(self.port.as_ref(), &request).await {
            SearchOutcome::Found(entries) => entries,
            SearchOutcome::NotFound => {
                debug!(principal = %principal, "No directory results found");
                return Ok(None);
            },
            SearchOutcome::TransportError(e) => {
                error!(principal = %principal, error = %e, "Directory error resolving principal");
                return Ok(None);
            },
        };

        if entries.len() > 1 && !self.config.allow_multiple_results {
            return Err(ResolverError::TooManyResults {
                filter: request.filter_string(),
                count: entries.len(),
            });
        }

        let resolved = entries
            .into_iter()
            .next()
            .and_then(|entry| self.principal_from_entry(&entry));
        debug!(principal = %principal, resolved = ?resolved.as_ref().map(Principal::id), "Directory resolution complete");
        Ok(resolved)
    }

    fn principal_from_entry(&self, entry: &DirectoryEntry) -> Option<Principal> {
        let username_attribute = &self.config.username_attribute;
        let Some(id) = entry.first_string(username_attribute) else {
            warn!(
                attribute = %username_attribute,
                dn = %entry.dn,
                "Username attribute not found on entry, returning no principal"
            );
            return None;
        };

        let mut attributes = Attributes::new();
        for attribute in &entry.attributes {
            if attribute.name.eq_ignore_ascii_case(username_attribute) {
                continue;
            }
            let name = self.mapper.map_name(&attribute.name);
            debug!(attribute = %attribute.name, mapped = %name, binary = attribute.is_binary(), "Resolved directory attribute");
            attributes.insert(name.to_string(), attribute.to_attribute_value());
        }

        match Principal::with_attributes(id, attributes) {
            Ok(principal) => Some(principal),
            Err(e) => {
                warn!(dn = %entry.dn, error = %e, "Directory entry has an unusable principal id");
                None
            },
        }
    }
}

#[async_trait]
impl PrincipalResolver for DirectoryPrincipalResolver {
    fn supports(&self, credential: &Credential) -> bool {
        self.initial.supports(credential)
    }

    async fn resolve(&self, credential: &Credential) -> Result<Option<Principal>, ResolverError> {
        let Some(principal) = self.initial.resolve(credential).await? else {
            warn!(
                initial = self.initial.name(),
                "Initial principal could not be resolved from credential"
            );
            return Ok(None);
        };

        debug!(principal = %principal, "Resolved initial principal, trying directory now");
        let resolved = self.resolve_principal(&principal).await?;
        if resolved.is_none() {
            info!(principal = %principal, "Initial principal was not found in the directory");
        }
        Ok(resolved)
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UsernamePrincipalResolver;
    use verity_directory::DirectoryAttribute;
    use verity_directory_memory::MemoryDirectory;
    use verity_identity::AttributeValue;

    fn jdoe() -> DirectoryEntry {
        DirectoryEntry::new(
            "uid=jdoe,ou=people,dc=example,dc=org",
            vec![
                DirectoryAttribute::text("uid", ["jdoe"]),
                DirectoryAttribute::text("mail", ["j@x.com"]),
            ],
        )
    }

    fn test_config() -> DirectoryResolverConfig {
        DirectoryResolverConfig {
            filter: Some(SearchFilter::new("(&(uid=%s))").unwrap()),
            username_attribute: "uid".into(),
            attribute_mapping: HashMap::from([("mail".to_string(), "email".to_string())]),
            ..Default::default()
        }
    }

    fn resolver(
        entries: Vec<DirectoryEntry>,
        config: DirectoryResolverConfig,
    ) -> (Arc<MemoryDirectory>, DirectoryPrincipalResolver) {
        let directory = Arc::new(MemoryDirectory::new(entries));
        let resolver = DirectoryPrincipalResolver::new(
            Arc::new(UsernamePrincipalResolver),
            directory.clone(),
            config,
        )
        .unwrap();
        (directory, resolver)
    }

    #[tokio::test]
    async fn test_resolves_and_remaps() {
        let (_dir, resolver) = resolver(vec![jdoe()], test_config());

        let principal = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(principal.id(), "jdoe");
        assert_eq!(principal.attributes().len(), 1);
        assert_eq!(
            principal.attribute("email"),
            Some(&AttributeValue::Text("j@x.com".into()))
        );
    }

    #[tokio::test]
    async fn test_requested_attributes() {
        let (_dir, resolver) = resolver(vec![], test_config());
        assert_eq!(resolver.requested_attributes(), vec!["mail", "uid"]);
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let (_dir, resolver) = resolver(vec![jdoe()], test_config());

        let result = resolver
            .resolve_principal(&Principal::new("nobody").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_directory_unavailable_is_none() {
        let (dir, resolver) = resolver(vec![jdoe()], test_config());
        dir.set_unavailable(true);

        let result = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_username_attribute_is_none() {
        let entry = DirectoryEntry::new(
            "cn=jdoe",
            vec![
                DirectoryAttribute::text("cn", ["jdoe"]),
                DirectoryAttribute::text("mail", ["j@x.com"]),
            ],
        );
        let mut config = test_config();
        config.filter = Some(SearchFilter::new("(cn=%s)").unwrap());
        let (_dir, resolver) = resolver(vec![entry], config);

        let result = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    fn twins() -> Vec<DirectoryEntry> {
        vec![
            DirectoryEntry::new(
                "uid=jdoe,ou=a,dc=example,dc=org",
                vec![
                    DirectoryAttribute::text("uid", ["jdoe"]),
                    DirectoryAttribute::text("mail", ["first@x.com"]),
                ],
            ),
            DirectoryEntry::new(
                "uid=jdoe,ou=b,dc=example,dc=org",
                vec![
                    DirectoryAttribute::text("uid", ["jdoe"]),
                    DirectoryAttribute::text("mail", ["second@x.com"]),
                ],
            ),
        ]
    }

    #[tokio::test]
    async fn test_multiple_results_rejected() {
        let (_dir, resolver) = resolver(twins(), test_config());

        let result = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await;
        assert!(matches!(
            result,
            Err(ResolverError::TooManyResults { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_multiple_results_rejected_with_max_results_one() {
        let mut config = test_config();
        config.max_results = 1;
        let (_dir, resolver) = resolver(twins(), config);

        let result = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await;
        assert!(matches!(result, Err(ResolverError::TooManyResults { .. })));
    }

    #[tokio::test]
    async fn test_multiple_results_allowed_uses_first() {
        let mut config = test_config();
        config.allow_multiple_results = true;
        let (_dir, resolver) = resolver(twins(), config);

        let principal = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            principal.attribute("email").and_then(AttributeValue::as_str),
            Some("first@x.com")
        );
    }

    #[tokio::test]
    async fn test_binary_and_multi_valued_attributes() {
        let entry = DirectoryEntry::new(
            "uid=jdoe",
            vec![
                DirectoryAttribute::text("uid", ["jdoe"]),
                DirectoryAttribute::text("memberOf", ["cn=staff", "cn=admins"]),
                DirectoryAttribute::binary("jpegPhoto", vec![vec![0xff, 0xd8]]),
            ],
        );
        let mut config = test_config();
        config.attribute_mapping = HashMap::from([
            ("memberOf".to_string(), "groups".to_string()),
            ("jpegPhoto".to_string(), "photo".to_string()),
        ]);
        let (_dir, resolver) = resolver(vec![entry], config);

        let principal = resolver
            .resolve_principal(&Principal::new("jdoe").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            principal.attribute("groups"),
            Some(&AttributeValue::TextList(vec![
                "cn=staff".into(),
                "cn=admins".into()
            ]))
        );
        assert_eq!(
            principal.attribute("photo"),
            Some(&AttributeValue::Binary(vec![0xff, 0xd8]))
        );
    }

    #[tokio::test]
    async fn test_resolve_from_credential() {
        let (_dir, resolver) = resolver(vec![jdoe()], test_config());
        let credential = Credential::username_password("jdoe", "secret").unwrap();

        assert!(resolver.supports(&credential));
        let principal = resolver.resolve(&credential).await.unwrap().unwrap();
        assert_eq!(principal.id(), "jdoe");
        assert!(principal.attribute("email").is_some());
    }

    #[test]
    fn test_missing_filter_rejected() {
        let config = DirectoryResolverConfig {
            filter: None,
            ..test_config()
        };
        let result = DirectoryPrincipalResolver::new(
            Arc::new(UsernamePrincipalResolver),
            Arc::new(MemoryDirectory::default()),
            config,
        );
        assert!(matches!(result, Err(ResolverError::Configuration(_))));
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config: DirectoryResolverConfig =
            serde_json::from_str(r#"{"filter": "(uid=%s)"}"#).unwrap();

        assert_eq!(config.username_attribute, "user");
        assert!(!config.allow_multiple_results);
        assert!(config.validate().is_ok());
    }
}
