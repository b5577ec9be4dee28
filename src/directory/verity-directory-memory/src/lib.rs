//! # Verity Directory - Memory Backend
//!
//! In-memory implementation of the directory search port. Entries are held
//! in a vector and matched with an RFC 4515 filter evaluator. Used for
//! development, the CLI and tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod filter;
pub mod fixture;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use verity_directory::{
    DirectoryAttribute, DirectoryEntry, DirectoryError, DirectorySearchPort, SearchRequest,
    SearchScope,
};

pub use filter::Filter;

/// In-memory directory.
pub struct MemoryDirectory {
    entries: RwLock<Vec<DirectoryEntry>>,
    unavailable: AtomicBool,
}

impl MemoryDirectory {
    /// Creates a directory holding the given entries.
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Loads entries from a JSON fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid fixture.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            DirectoryError::Connection(format!("failed to read {}: {}", path.display(), e))
        })?;
        let entries = fixture::parse(&contents)?;

        info!(path = %path.display(), entries = entries.len(), "Memory directory loaded");
        Ok(Self::new(entries))
    }

    /// Adds an entry.
    pub async fn insert(&self, entry: DirectoryEntry) {
        self.entries.write().await.push(entry);
    }

    /// Number of entries held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the directory holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Simulates an unreachable directory server.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl DirectorySearchPort for MemoryDirectory {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Connection("directory unavailable".into()));
        }

        let filter = Filter::parse(&request.filter_string())?;
        let entries = self.entries.read().await;

        let results: Vec<DirectoryEntry> = entries
            .iter()
            .filter(|e| in_scope(&e.dn, &request.base_dn, request.scope))
            .filter(|e| filter.matches(e))
            .take(request.max_results)
            .map(|e| project(e, &request.attributes))
            .collect();

        debug!(results = results.len(), "Memory directory search complete");
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Splits a DN into normalized RDNs.
fn rdns(dn: &str) -> Vec<String> {
    dn.split(',')
        .map(|rdn| rdn.trim().to_lowercase())
        .filter(|rdn| !rdn.is_empty())
        .collect()
}

fn in_scope(dn: &str, base_dn: &str, scope: SearchScope) -> bool {
    let entry = rdns(dn);
    let base = rdns(base_dn);
    if entry.len() < base.len() || !entry.ends_with(&base) {
        return false;
    }
    match scope {
        SearchScope::Object => entry.len() == base.len(),
        SearchScope::OneLevel => entry.len() == base.len() + 1,
        SearchScope::Subtree => true,
    }
}

/// Keeps only the requested attributes; an empty request returns everything.
fn project(entry: &DirectoryEntry, requested: &[String]) -> DirectoryEntry {
    if requested.is_empty() {
        return entry.clone();
    }
    let attributes: Vec<DirectoryAttribute> = entry
        .attributes
        .iter()
        .filter(|a| requested.iter().any(|r| r.eq_ignore_ascii_case(&a.name)))
        .cloned()
        .collect();
    DirectoryEntry::new(entry.dn.clone(), attributes)
}
