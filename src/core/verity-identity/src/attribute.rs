//! Principal attribute values and attribute-name remapping.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Attribute table of a principal or an authentication, ordered by name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A single attribute value.
///
/// Single-valued attributes are stored as scalars, multi-valued attributes
/// as ordered sequences. Binary data keeps its binary form in both cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Single text value.
    Text(String),
    /// Ordered text values.
    TextList(Vec<String>),
    /// Single binary value.
    Binary(Vec<u8>),
    /// Ordered binary values.
    BinaryList(Vec<Vec<u8>>),
}

impl AttributeValue {
    /// Builds a text value, collapsing a single element to a scalar.
    pub fn from_strings(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Text(values.remove(0))
        } else {
            Self::TextList(values)
        }
    }

    /// Builds a binary value, collapsing a single element to a scalar.
    pub fn from_binaries(mut values: Vec<Vec<u8>>) -> Self {
        if values.len() == 1 {
            Self::Binary(values.remove(0))
        } else {
            Self::BinaryList(values)
        }
    }

    /// Returns the value as text when it is a single text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if the value holds binary data.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_) | Self::BinaryList(_))
    }

    /// Number of individual values held.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(_) | Self::Binary(_) => 1,
            Self::TextList(v) => v.len(),
            Self::BinaryList(v) => v.len(),
        }
    }

    /// Returns `true` if a multi-valued attribute holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a text value, promoting a scalar to a list.
    ///
    /// Values already present are not added twice. Binary values are left
    /// untouched.
    pub fn push_text(&mut self, value: &str) {
        match self {
            Self::Text(existing) => {
                if existing != value {
                    *self = Self::TextList(vec![existing.clone(), value.to_string()]);
                }
            },
            Self::TextList(list) => {
                if !list.iter().any(|v| v == value) {
                    list.push(value.to_string());
                }
            },
            Self::Binary(_) | Self::BinaryList(_) => {},
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Maps directory attribute names onto local attribute names.
///
/// Names without a configured mapping are returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct AttributeMapper {
    mapping: HashMap<String, String>,
}

impl AttributeMapper {
    /// Creates a mapper from a directory-name to local-name table.
    pub fn new(mapping: HashMap<String, String>) -> Self {
        Self { mapping }
    }

    /// Returns the local name for a directory attribute name.
    pub fn map_name<'a>(&'a self, directory_name: &'a str) -> &'a str {
        self.mapping
            .get(directory_name)
            .map(String::as_str)
            .unwrap_or(directory_name)
    }

    /// Directory attribute names that have a mapping.
    pub fn directory_names(&self) -> impl Iterator<Item = &str> {
        self.mapping.keys().map(String::as_str)
    }

    /// Returns `true` if no mappings are configured.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
