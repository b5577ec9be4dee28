//! Directory search port definition.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{DirectoryEntry, DirectoryError, SearchRequest};

/// Port for issuing searches against a directory.
///
/// Implementations own the connection lifecycle; callers only hold the port
/// for the duration of one request.
#[async_trait]
pub trait DirectorySearchPort: Send + Sync {
    /// Executes a search and returns the matching entries in directory order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Returns the name of this port for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Result of a bounded directory search.
#[derive(Debug)]
pub enum SearchOutcome {
    /// At least one entry matched.
    Found(Vec<DirectoryEntry>),
    /// The search completed without matches.
    NotFound,
    /// The directory could not answer (unreachable, timed out, protocol error).
    TransportError(DirectoryError),
}

impl SearchOutcome {
    /// Collapses a transport error to "not found".
    ///
    /// Resolution and policy lookups degrade this way instead of failing the
    /// login attempt.
    pub fn into_entries_or_empty(self) -> Vec<DirectoryEntry> {
        match self {
            Self::Found(entries) => entries,
            Self::NotFound | Self::TransportError(_) => Vec::new(),
        }
    }
}

/// Runs a search bounded by the request timeout.
pub async fn search_entries(port: &dyn DirectorySearchPort, request: &SearchRequest) -> SearchOutcome {
    let filter = request.filter_string();
    debug!(
        port = port.name(),
        base_dn = %request.base_dn,
        filter = %filter,
        attributes = ?request.attributes,
        "Starting directory search"
    );

    match tokio::time::timeout(request.timeout, port.search(request)).await {
        Ok(Ok(entries)) if entries.is_empty() => {
            debug!(filter = %filter, "No directory entries found");
            SearchOutcome::NotFound
        },
        Ok(Ok(entries)) => {
            debug!(filter = %filter, count = entries.len(), "Directory entries found");
            SearchOutcome::Found(entries)
        },
        Ok(Err(e)) => {
            warn!(port = port.name(), filter = %filter, error = %e, "Directory search failed");
            SearchOutcome::TransportError(e)
        },
        Err(_) => {
            warn!(port = port.name(), filter = %filter, timeout = ?request.timeout, "Directory search timed out");
            SearchOutcome::TransportError(DirectoryError::Timeout(request.timeout))
        },
    }
}
