//! Logical search requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SearchFilter;

/// Portion of the directory tree a search covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry.
    Object,
    /// Direct children of the base entry.
    OneLevel,
    /// The base entry and everything below it.
    #[default]
    Subtree,
}

/// A search issued through a [`DirectorySearchPort`](crate::DirectorySearchPort).
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Base DN the search starts from (empty for the root).
    pub base_dn: String,
    /// Filter template.
    pub filter: SearchFilter,
    /// Value substituted into the template.
    pub parameter: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Attributes to return.
    pub attributes: Vec<String>,
    /// Maximum number of entries to return.
    pub max_results: usize,
    /// Time limit for the search.
    pub timeout: Duration,
}

impl SearchRequest {
    /// Filter string with the parameter substituted and escaped.
    pub fn filter_string(&self) -> String {
        self.filter.format(&self.parameter)
    }
}
