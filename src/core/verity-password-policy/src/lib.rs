//! # Verity Password Policy
//!
//! Computes password expiration and warning status from directory data.
//!
//! ## Features
//!
//! - Expiration from a last-change or expiration date attribute
//! - Per-user warning and validity periods with configured fallbacks
//! - "Never expire" flags, including the Active Directory sentinel
//! - Active Directory tick timestamps and pattern-formatted dates

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;

pub use config::{DateFormat, PasswordPolicyConfig};
pub use engine::{PasswordPolicyEngine, PasswordPolicyResult, PasswordStatus, PASSWORD_STATUS_PASS};
pub use error::PolicyError;
