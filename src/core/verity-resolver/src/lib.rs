//! # Verity Resolver
//!
//! Turns credentials into principals.
//!
//! Resolution runs in two stages: an initial resolver derives a principal
//! from the credential, then [`DirectoryPrincipalResolver`] re-resolves it
//! against a directory and enriches it with remapped attributes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod directory;
pub mod error;
pub mod resolver;

pub use directory::{DirectoryPrincipalResolver, DirectoryResolverConfig};
pub use error::ResolverError;
pub use resolver::{PrincipalResolver, UsernamePrincipalResolver};
