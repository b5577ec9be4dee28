//! TOML configuration.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use verity_auth::{AcceptUsersConfig, FailureClassifierConfig, ManagerConfig};
use verity_password_policy::PasswordPolicyConfig;
use verity_resolver::DirectoryResolverConfig;

/// Complete configuration of one Verity instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerityConfig {
    /// Authentication manager settings.
    pub manager: ManagerConfig,
    /// Static username/password handler.
    pub accept_users: Option<AcceptUsersConfig>,
    /// Token id to Argon2id hash.
    pub tokens: HashMap<String, String>,
    /// Directory principal resolver.
    pub resolver: Option<DirectoryResolverConfig>,
    /// Password policy engine.
    pub password_policy: Option<PasswordPolicyConfig>,
    /// Failure classification.
    pub failures: FailureClassifierConfig,
}

impl VerityConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML")
    }
}
