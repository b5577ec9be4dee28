//! JSON fixture format for the memory directory.
//!
//! ```json
//! [
//!   {
//!     "dn": "uid=jdoe,ou=people,dc=example,dc=org",
//!     "attributes": {
//!       "uid": "jdoe",
//!       "memberOf": ["cn=staff", "cn=admins"],
//!       "jpegPhoto": { "binary": ["/9j/4AAQ"] }
//!     }
//!   }
//! ]
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use indexmap::IndexMap;
use serde::Deserialize;

use verity_directory::{DirectoryAttribute, DirectoryEntry, DirectoryError};

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    dn: String,
    #[serde(default)]
    attributes: IndexMap<String, FixtureValues>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureValues {
    Single(String),
    Many(Vec<String>),
    Binary { binary: Vec<String> },
}

/// Parses fixture JSON into directory entries.
pub fn parse(json: &str) -> Result<Vec<DirectoryEntry>, DirectoryError> {
    let fixture: Vec<FixtureEntry> = serde_json::from_str(json)
        .map_err(|e| DirectoryError::Protocol(format!("invalid fixture: {}", e)))?;

    fixture.into_iter().map(into_entry).collect()
}

fn into_entry(entry: FixtureEntry) -> Result<DirectoryEntry, DirectoryError> {
    let mut attributes = Vec::with_capacity(entry.attributes.len());
    for (name, values) in entry.attributes {
        let attribute = match values {
            FixtureValues::Single(value) => DirectoryAttribute::text(name, [value]),
            FixtureValues::Many(values) => DirectoryAttribute::text(name, values),
            FixtureValues::Binary { binary } => {
                let decoded = binary
                    .iter()
                    .map(|v| BASE64.decode(v))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        DirectoryError::Protocol(format!(
                            "invalid base64 in {} of {}: {}",
                            name, entry.dn, e
                        ))
                    })?;
                DirectoryAttribute::binary(name, decoded)
            },
        };
        attributes.push(attribute);
    }
    Ok(DirectoryEntry::new(entry.dn, attributes))
}
