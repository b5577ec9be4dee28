//! # Verity Directory
//!
//! Directory search abstraction for Verity.
//!
//! The core never talks to a directory server directly. It issues logical
//! [`SearchRequest`]s through a [`DirectorySearchPort`]; connection pooling,
//! TLS and bind credentials belong to the port implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod filter;
pub mod port;
pub mod request;

pub use entry::{DirectoryAttribute, DirectoryEntry, DirectoryValues};
pub use error::DirectoryError;
pub use filter::SearchFilter;
pub use port::{search_entries, DirectorySearchPort, SearchOutcome};
pub use request::{SearchRequest, SearchScope};
