//! Password expiration computation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use verity_directory::{
    search_entries, DirectoryEntry, DirectorySearchPort, SearchFilter, SearchOutcome,
    SearchRequest,
};

use crate::decode::{decode_pattern, decode_vendor_epoch};
use crate::{DateFormat, PasswordPolicyConfig, PolicyError};

/// Day count reported for [`PasswordStatus::Pass`].
pub const PASSWORD_STATUS_PASS: i64 = -1;

/// Value Active Directory uses for a password that never expires.
const PASSWORD_STATUS_NEVER_EXPIRE: u128 = i64::MAX as u128;

/// Outcome of a password policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PasswordStatus {
    /// No applicable policy, never expires, or too early to warn.
    Pass,
    /// Password expires in `days` whole days and the user should be warned.
    Expiring {
        /// Whole days until expiration (may be 0).
        days: i64,
    },
}

impl PasswordStatus {
    /// Day count, with [`PASSWORD_STATUS_PASS`] for `Pass`.
    pub fn as_days(&self) -> i64 {
        match self {
            Self::Pass => PASSWORD_STATUS_PASS,
            Self::Expiring { days } => *days,
        }
    }
}

/// Raw policy values read from the directory for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordPolicyResult {
    /// User the values belong to.
    pub user_id: String,
    /// Expiration or last-change date.
    pub date_value: Option<String>,
    /// Warning days.
    pub warn_days_value: Option<String>,
    /// Valid days.
    pub valid_days_value: Option<String>,
    /// Never-expire flag.
    pub no_warn_value: Option<String>,
}

/// Computes days to password expiration from directory policy attributes.
pub struct PasswordPolicyEngine {
    port: Arc<dyn DirectorySearchPort>,
    config: PasswordPolicyConfig,
    filter: SearchFilter,
    date_format: DateFormat,
}

impl PasswordPolicyEngine {
    /// Creates a new engine.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Configuration`] if the configuration is invalid.
    pub fn new(
        port: Arc<dyn DirectorySearchPort>,
        config: PasswordPolicyConfig,
    ) -> Result<Self, PolicyError> {
        config.validate()?;
        let filter = config
            .filter
            .clone()
            .ok_or_else(|| PolicyError::Configuration("filter cannot be empty".into()))?;
        let date_format = DateFormat::parse(&config.date_format);

        info!(
            filter = %filter,
            date_attribute = %config.date_attribute,
            date_format = ?date_format,
            warn_all = config.warn_all,
            "Password policy engine configured"
        );

        Ok(Self {
            port,
            config,
            filter,
            date_format,
        })
    }

    /// Computes the password status for a user as of now.
    pub async fn days_until_expiration(&self, user_id: &str) -> Result<PasswordStatus, PolicyError> {
        self.days_until_expiration_at(user_id, Utc::now()).await
    }

    /// Computes the password status for a user as of `now`.
    ///
    /// Unreachable directories and missing policy data yield
    /// [`PasswordStatus::Pass`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Enforcement`] if the password has expired or its
    /// expiration date cannot be computed from the returned data.
    pub async fn days_until_expiration_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordStatus, PolicyError> {
        let Some(result) = self.fetch_policy(user_id).await else {
            debug!(user_id = %user_id, "Password policy cannot be established, skipping all checks");
            return Ok(PasswordStatus::Pass);
        };

        let Some(date_value) = result.date_value.as_deref().filter(|v| !v.trim().is_empty()) else {
            debug!(
                user_id = %user_id,
                attribute = %self.config.date_attribute,
                "Password policy could not determine the date value, skipping all checks"
            );
            return Ok(PasswordStatus::Pass);
        };

        if self.is_never_expire(result.no_warn_value.as_deref()) {
            debug!(user_id = %user_id, "Account password will never expire, skipping warning check");
            return Ok(PasswordStatus::Pass);
        }

        let warning_days = effective_days(
            result.warn_days_value.as_deref(),
            self.config.warning_days,
            "warning days",
        );
        let valid_days = effective_days(
            result.valid_days_value.as_deref(),
            self.config.valid_days,
            "valid days",
        );

        let expires_at = self.expiration_date(date_value, valid_days)?;
        self.evaluate(user_id, expires_at, warning_days, now)
    }

    /// Reads the policy attributes for a user. Directory failures yield `None`.
    pub async fn fetch_policy(&self, user_id: &str) -> Option<PasswordPolicyResult> {
        let request = SearchRequest {
            base_dn: self.config.base_dn.clone(),
            filter: self.filter.clone(),
            parameter: user_id.to_string(),
            scope: self.config.scope,
            attributes: self.config.requested_attributes(),
            max_results: self.config.max_results,
            timeout: Duration::from_millis(self.config.timeout_ms),
        };

        let entry = match search_entries(self.port.as_ref(), &request).await {
            SearchOutcome::Found(entries) => entries.into_iter().next()?,
            SearchOutcome::NotFound => {
                warn!(user_id = %user_id, "Password policy could not be established for user");
                return None;
            },
            SearchOutcome::TransportError(e) => {
                error!(user_id = %user_id, error = %e, "Directory error reading password policy");
                return None;
            },
        };

        Some(self.result_from_entry(user_id, &entry))
    }

    fn result_from_entry(&self, user_id: &str, entry: &DirectoryEntry) -> PasswordPolicyResult {
        let read = |attribute: &Option<String>| {
            attribute
                .as_deref()
                .and_then(|name| entry.first_string(name))
        };

        PasswordPolicyResult {
            user_id: user_id.to_string(),
            date_value: entry.first_string(&self.config.date_attribute),
            warn_days_value: read(&self.config.warning_days_attribute),
            valid_days_value: read(&self.config.valid_days_attribute),
            no_warn_value: read(&self.config.no_warn_attribute),
        }
    }

    /// Checks the never-expire flag against the configured values and the
    /// Active Directory sentinel `2^63 - 1`.
    fn is_never_expire(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        if self.config.no_warn_values.iter().any(|v| v == value) {
            return true;
        }
        !value.is_empty()
            && value.bytes().all(|b| b.is_ascii_digit())
            && value.parse::<u128>().ok() == Some(PASSWORD_STATUS_NEVER_EXPIRE)
    }

    fn expiration_date(&self, raw: &str, valid_days: i64) -> Result<DateTime<Utc>, PolicyError> {
        let date = match &self.date_format {
            DateFormat::ActiveDirectory => decode_vendor_epoch(raw),
            DateFormat::Pattern(pattern) => decode_pattern(raw, pattern),
        };

        let expires_at = date.and_then(|d| {
            TimeDelta::try_days(valid_days).and_then(|delta| d.checked_add_signed(delta))
        });

        match expires_at {
            Some(expires_at) => {
                debug!(
                    raw = %raw,
                    attribute = %self.config.date_attribute,
                    valid_days = valid_days,
                    expires_at = %expires_at,
                    "Computed password expiration date"
                );
                Ok(expires_at)
            },
            None => {
                let msg = format!("expiration date cannot be determined for date {}", raw);
                error!("{}", msg);
                Err(PolicyError::Enforcement(msg))
            },
        }
    }

    fn evaluate(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
        warning_days: i64,
        now: DateTime<Utc>,
    ) -> Result<PasswordStatus, PolicyError> {
        info!(now = %now, expires_at = %expires_at, "Calculating days to password expiration");

        let days = (expires_at - now).num_days();

        if now >= expires_at {
            let msg = format!(
                "account password has expired with {} days to expiration date; verify the value of the {} attribute and ensure it's not before the current date, which is {}",
                days, self.config.date_attribute, now
            );
            error!(user_id = %user_id, "{}", msg);
            return Err(PolicyError::Enforcement(msg));
        }

        let warn_from = TimeDelta::try_days(warning_days)
            .and_then(|delta| expires_at.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        info!(warn_from = %warn_from, "Warning period begins");

        if self.config.warn_all {
            info!(user_id = %user_id, days = days, "Warning all, password will expire");
            Ok(PasswordStatus::Expiring { days })
        } else if now >= warn_from {
            info!(user_id = %user_id, days = days, "Password will expire");
            Ok(PasswordStatus::Expiring { days })
        } else {
            info!(user_id = %user_id, days = days, "Password is not expiring yet, no warning");
            Ok(PasswordStatus::Pass)
        }
    }
}

/// Uses a directory-supplied day count when it parses, the default otherwise.
fn effective_days(value: Option<&str>, default: i64, label: &str) -> i64 {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => {
            debug!(default = default, "No {} value found, using default", label);
            default
        },
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!(value = %v, default = default, "Unparseable {} value, using default", label);
            default
        }),
    }
}
