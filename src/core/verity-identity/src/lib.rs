//! # Verity Identity
//!
//! Value types shared by every Verity engine.
//!
//! - [`Principal`]: an immutable resolved identity with attributes
//! - [`AttributeValue`]: scalar, binary or multi-valued attribute data
//! - [`AttributeMapper`]: directory attribute name to local name remapping
//! - [`Credential`]: caller-submitted evidence of identity

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attribute;
pub mod credential;
pub mod error;
pub mod principal;

pub use attribute::{AttributeMapper, AttributeValue, Attributes};
pub use credential::{Credential, CredentialKey};
pub use error::IdentityError;
pub use principal::Principal;
