//! # Verity Auth
//!
//! Credential validation for Verity.
//!
//! ## Components
//!
//! - [`AuthenticationManager`]: runs credentials through an ordered handler
//!   chain under a success policy
//! - [`AuthenticationContextBuilder`]: deduplicates and merges successes of
//!   one login transaction
//! - [`FailureClassifier`]: reduces handler errors to one outcome code
//!
//! ## Handlers
//!
//! - [`AcceptUsersHandler`]: static username/password table
//! - [`HashedTokenHandler`]: Argon2id-hashed tokens

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod accept_users;
pub mod classifier;
pub mod context;
pub mod error;
pub mod handler;
pub mod hashed_token;
pub mod manager;
pub mod outcome;
pub mod policy;

pub use accept_users::{AcceptUsersConfig, AcceptUsersHandler};
pub use classifier::{
    classify, ClassifiedFailure, FailureClassifier, FailureClassifierConfig,
    DEFAULT_MESSAGE_BUNDLE_PREFIX, UNKNOWN,
};
pub use context::{
    Authentication, AuthenticationContext, AuthenticationContextBuilder, HandlerResult,
    AUTHENTICATION_METHOD_ATTRIBUTE,
};
pub use error::{AuthError, AuthenticationException, FailureKind, HandlerError};
pub use handler::{AuthenticationHandler, RegisteredHandler};
pub use hashed_token::{HashedTokenHandler, TokenHashFn};
pub use manager::{AuthenticationManager, DispatchMode, ManagerConfig};
pub use outcome::LoginOutcome;
pub use policy::{
    AllAuthenticationPolicy, AnyAuthenticationPolicy, AuthenticationPolicy, PolicyConfig,
    RequiredHandlerAuthenticationPolicy,
};
