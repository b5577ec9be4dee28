//! Password policy configuration.

use serde::Deserialize;

use verity_directory::{SearchFilter, SearchScope};

use crate::PolicyError;

/// How the raw date attribute value is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFormat {
    /// 100-nanosecond ticks since 1601-01-01 (Active Directory).
    ActiveDirectory,
    /// `chrono` format string, e.g. `%Y%m%d%H%M%SZ`.
    Pattern(String),
}

impl DateFormat {
    /// Interprets a configured format. `ActiveDirectory` and `AD` (any case)
    /// select tick decoding; anything else is a pattern.
    pub fn parse(format: &str) -> Self {
        if format.eq_ignore_ascii_case("ActiveDirectory") || format.eq_ignore_ascii_case("AD") {
            Self::ActiveDirectory
        } else {
            Self::Pattern(format.to_string())
        }
    }
}

/// Configuration for [`PasswordPolicyEngine`](crate::PasswordPolicyEngine).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordPolicyConfig {
    /// Base DN searches start from.
    pub base_dn: String,
    /// Filter template; the user id is substituted into it.
    pub filter: Option<SearchFilter>,
    /// Search scope.
    pub scope: SearchScope,
    /// Attribute holding the expiration or last password change date.
    pub date_attribute: String,
    /// Date format discriminator (see [`DateFormat::parse`]).
    pub date_format: String,
    /// Attribute holding the user's warning days.
    pub warning_days_attribute: Option<String>,
    /// Attribute holding the number of days a password is valid.
    pub valid_days_attribute: Option<String>,
    /// Attribute whose value can flag a password as never expiring.
    pub no_warn_attribute: Option<String>,
    /// Values of `no_warn_attribute` that mean "never expires".
    pub no_warn_values: Vec<String>,
    /// Days a password is valid when the directory does not say.
    pub valid_days: i64,
    /// Days before expiration warnings start when the directory does not say.
    pub warning_days: i64,
    /// Warn on every login regardless of the warning period.
    pub warn_all: bool,
    /// Maximum number of entries requested.
    pub max_results: usize,
    /// Search time limit in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            base_dn: String::new(),
            filter: None,
            scope: SearchScope::Subtree,
            date_attribute: String::new(),
            date_format: String::new(),
            warning_days_attribute: None,
            valid_days_attribute: None,
            no_warn_attribute: None,
            no_warn_values: Vec::new(),
            valid_days: 180,
            warning_days: 30,
            warn_all: false,
            max_results: 10,
            timeout_ms: 1000,
        }
    }
}

impl PasswordPolicyConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.filter.is_none() {
            return Err(PolicyError::Configuration("filter cannot be empty".into()));
        }
        if self.date_attribute.trim().is_empty() {
            return Err(PolicyError::Configuration(
                "date attribute cannot be empty".into(),
            ));
        }
        if self.date_format.trim().is_empty() {
            return Err(PolicyError::Configuration(
                "date format cannot be empty".into(),
            ));
        }
        if self.valid_days < 0 || self.warning_days < 0 {
            return Err(PolicyError::Configuration(
                "valid days and warning days must be >= 0".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(PolicyError::Configuration(
                "max results must be > 0".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(PolicyError::Configuration("timeout must be > 0".into()));
        }
        Ok(())
    }

    /// Attributes requested from the directory, date attribute first.
    pub fn requested_attributes(&self) -> Vec<String> {
        let mut attributes = vec![self.date_attribute.clone()];
        attributes.extend(
            [
                &self.warning_days_attribute,
                &self.valid_days_attribute,
                &self.no_warn_attribute,
            ]
            .into_iter()
            .flatten()
            .cloned(),
        );
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PasswordPolicyConfig {
        PasswordPolicyConfig {
            filter: Some(SearchFilter::new("(uid=%u)").unwrap()),
            date_attribute: "pwdLastSet".into(),
            date_format: "AD".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_date_format_discriminator() {
        assert_eq!(DateFormat::parse("ad"), DateFormat::ActiveDirectory);
        assert_eq!(DateFormat::parse("ActiveDirectory"), DateFormat::ActiveDirectory);
        assert_eq!(DateFormat::parse("ACTIVEDIRECTORY"), DateFormat::ActiveDirectory);
        assert_eq!(
            DateFormat::parse("%Y%m%d%H%M%SZ"),
            DateFormat::Pattern("%Y%m%d%H%M%SZ".into())
        );
    }

    #[test]
    fn test_defaults() {
        let config = PasswordPolicyConfig::default();
        assert_eq!(config.valid_days, 180);
        assert_eq!(config.warning_days, 30);
        assert_eq!(config.max_results, 10);
        assert!(!config.warn_all);
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.date_attribute.clear();
        assert!(matches!(config.validate(), Err(PolicyError::Configuration(_))));

        let mut config = valid_config();
        config.filter = None;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.warning_days = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_requested_attributes() {
        let mut config = valid_config();
        config.warning_days_attribute = Some("pwdWarnDays".into());
        config.no_warn_attribute = Some("accountExpires".into());

        assert_eq!(
            config.requested_attributes(),
            vec!["pwdLastSet", "pwdWarnDays", "accountExpires"]
        );
    }

    #[test]
    fn test_deserialize() {
        let config: PasswordPolicyConfig = serde_json::from_str(
            r#"{"filter": "(sAMAccountName=%u)", "date_attribute": "pwdLastSet", "date_format": "AD", "warn_all": true}"#,
        )
        .unwrap();

        assert!(config.warn_all);
        assert_eq!(config.valid_days, 180);
        assert!(config.validate().is_ok());
    }
}
