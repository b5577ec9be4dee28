//! RFC 4515 string filter parsing and evaluation.
//!
//! Supports `&`, `|`, `!`, equality, presence and substring assertions.
//! Approximate and ordering matches are rejected.

use verity_directory::{DirectoryEntry, DirectoryError, DirectoryValues};

/// Parsed search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters match.
    And(Vec<Filter>),
    /// Any sub-filter matches.
    Or(Vec<Filter>),
    /// Sub-filter does not match.
    Not(Box<Filter>),
    /// `(attr=value)`
    Equal {
        /// Attribute name.
        attr: String,
        /// Asserted value.
        value: String,
    },
    /// `(attr=*)`
    Present {
        /// Attribute name.
        attr: String,
    },
    /// `(attr=ab*cd*ef)`
    Substring {
        /// Attribute name.
        attr: String,
        /// Pieces between wildcards; the first and last may be empty.
        parts: Vec<String>,
    },
}

impl Filter {
    /// Parses a filter string.
    pub fn parse(input: &str) -> Result<Self, DirectoryError> {
        let mut parser = Parser {
            input: input.trim(),
            pos: 0,
        };
        let filter = parser.filter()?;
        if parser.pos != parser.input.len() {
            return Err(invalid(input, "trailing characters"));
        }
        Ok(filter)
    }

    /// Evaluates the filter against an entry.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Self::Not(filter) => !filter.matches(entry),
            Self::Present { attr } => {
                attr.eq_ignore_ascii_case("objectClass")
                    || entry.attribute(attr).is_some_and(|a| !a.values.is_empty())
            },
            Self::Equal { attr, value } => {
                let value = value.to_lowercase();
                text_values(entry, attr).any(|v| v.to_lowercase() == value)
            },
            Self::Substring { attr, parts } => {
                text_values(entry, attr).any(|v| substring_match(&v.to_lowercase(), parts))
            },
        }
    }
}

fn text_values<'a>(entry: &'a DirectoryEntry, attr: &str) -> impl Iterator<Item = &'a String> {
    entry
        .attribute(attr)
        .and_then(|a| match &a.values {
            DirectoryValues::Text(values) => Some(values.iter()),
            DirectoryValues::Binary(_) => None,
        })
        .into_iter()
        .flatten()
}

fn substring_match(value: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return true;
    };
    let Some((last, middle)) = rest.split_last() else {
        return value == first.to_lowercase();
    };

    let first = first.to_lowercase();
    let last = last.to_lowercase();
    if !value.starts_with(&first) {
        return false;
    }
    let mut remaining = &value[first.len()..];
    for part in middle {
        let part = part.to_lowercase();
        match remaining.find(&part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(&last)
}

fn invalid(input: &str, reason: &str) -> DirectoryError {
    DirectoryError::InvalidFilter(format!("{}: {:?}", reason, input))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), DirectoryError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(invalid(
                self.input,
                &format!("expected '{}' at offset {}", byte as char, self.pos),
            ))
        }
    }

    fn filter(&mut self) -> Result<Filter, DirectoryError> {
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            },
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            },
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            },
            Some(_) => self.item()?,
            None => return Err(invalid(self.input, "unexpected end of filter")),
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, DirectoryError> {
        let mut filters = Vec::new();
        while self.peek() == Some(b'(') {
            filters.push(self.filter()?);
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter, DirectoryError> {
        let rest = &self.input[self.pos..];
        let eq = rest
            .find('=')
            .ok_or_else(|| invalid(self.input, "missing '=' in assertion"))?;
        let attr = &rest[..eq];
        if attr.is_empty() {
            return Err(invalid(self.input, "empty attribute name"));
        }
        if attr.ends_with(&['~', '>', '<', ':'][..]) {
            return Err(invalid(self.input, "unsupported match type"));
        }

        let after = &rest[eq + 1..];
        let end = after
            .find(')')
            .ok_or_else(|| invalid(self.input, "unterminated assertion"))?;
        let raw = &after[..end];
        if raw.contains('(') {
            return Err(invalid(self.input, "unescaped '(' in value"));
        }
        self.pos += eq + 1 + end;

        let attr = attr.trim().to_string();
        if raw == "*" {
            return Ok(Filter::Present { attr });
        }
        if raw.contains('*') {
            let parts = raw
                .split('*')
                .map(|p| unescape(self.input, p))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Filter::Substring { attr, parts });
        }
        Ok(Filter::Equal {
            attr,
            value: unescape(self.input, raw)?,
        })
    }
}

fn unescape(input: &str, raw: &str) -> Result<String, DirectoryError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = raw
                .get(i + 1..i + 3)
                .ok_or_else(|| invalid(input, "truncated escape sequence"))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| invalid(input, "invalid escape sequence"))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| invalid(input, "escaped value is not UTF-8"))
}
