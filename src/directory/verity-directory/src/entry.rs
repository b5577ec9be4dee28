//! Directory search result entries.

use verity_identity::AttributeValue;

/// Values of one directory attribute, in directory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryValues {
    /// String-valued attribute.
    Text(Vec<String>),
    /// Binary attribute (e.g. `jpegPhoto`, `objectGUID`).
    Binary(Vec<Vec<u8>>),
}

impl DirectoryValues {
    /// Returns `true` for binary attributes.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(v) => v.len(),
            Self::Binary(v) => v.len(),
        }
    }

    /// Returns `true` if the attribute carries no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One attribute of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAttribute {
    /// Attribute name as returned by the directory.
    pub name: String,
    /// Attribute values.
    pub values: DirectoryValues,
}

impl DirectoryAttribute {
    /// Creates a string-valued attribute.
    pub fn text<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: DirectoryValues::Text(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Creates a binary attribute.
    pub fn binary(name: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            values: DirectoryValues::Binary(values),
        }
    }

    /// Returns `true` for binary attributes.
    pub fn is_binary(&self) -> bool {
        self.values.is_binary()
    }

    /// First value as a string. Binary values are decoded lossily.
    pub fn first_string(&self) -> Option<String> {
        match &self.values {
            DirectoryValues::Text(v) => v.first().cloned(),
            DirectoryValues::Binary(v) => v
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Converts the values into a principal attribute value.
    ///
    /// A single value becomes a scalar, several values an ordered sequence.
    pub fn to_attribute_value(&self) -> AttributeValue {
        match &self.values {
            DirectoryValues::Text(v) => AttributeValue::from_strings(v.clone()),
            DirectoryValues::Binary(v) => AttributeValue::from_binaries(v.clone()),
        }
    }
}

/// An entry returned by a directory search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name.
    pub dn: String,
    /// Attributes in the order the directory returned them.
    pub attributes: Vec<DirectoryAttribute>,
}

impl DirectoryEntry {
    /// Creates an entry.
    pub fn new(dn: impl Into<String>, attributes: Vec<DirectoryAttribute>) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Looks up an attribute by name, ignoring ASCII case as directories do.
    pub fn attribute(&self, name: &str) -> Option<&DirectoryAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// First value of the named attribute as a string.
    pub fn first_string(&self, name: &str) -> Option<String> {
        self.attribute(name).and_then(DirectoryAttribute::first_string)
    }
}
