//! `Key: Value` header parsing and display ordering.

use crate::error::HeaderError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Hop-by-hop headers, RFC 2616 section 13.5.1.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "Connection",
    "Keep-Alive",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "TE",
    "Trailers",
    "Transfer-Encoding",
    "Upgrade",
];

/// Always listed first.
pub const SERVER_HEADER: &str = "Server";

/// Splits `header` at its first `:`.
///
/// Trailing spaces are trimmed from the key; leading spaces and colons from
/// the value.
pub fn header_key_value(header: &str) -> Result<(&str, &str), HeaderError> {
    let i = header.find(':').ok_or_else(|| HeaderError::MissingColon {
        header: header.to_string(),
    })?;
    let key = header[..i].trim_end_matches(' ');
    let value = header[i..].trim_start_matches([' ', ':']);
    Ok((key, value))
}

/// Whether `name` travels end to end, i.e. is not hop-by-hop. Names are
/// compared as spelled; canonicalize wire names first.
pub fn is_end_to_end(name: &str) -> bool {
    !HOP_BY_HOP_HEADERS.contains(&name)
}

/// Canonical `Content-Type` style spelling of a header name.
pub fn canonical_header_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// One raw `Key: Value` line plus its parsed parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    raw: String,
    key_end: usize,
    value_start: usize,
}

impl HeaderLine {
    pub fn parse(raw: impl Into<String>) -> Result<Self, HeaderError> {
        let raw = raw.into();
        let (key, value) = header_key_value(&raw)?;
        let key_end = key.len();
        let value_start = raw.len() - value.len();
        Ok(Self {
            raw,
            key_end,
            value_start,
        })
    }

    /// Builds `name: value` from already separated parts.
    pub fn from_parts(name: &str, value: &str) -> Self {
        Self {
            raw: format!("{}: {}", name, value),
            key_end: name.len(),
            value_start: name.len() + 2,
        }
    }

    pub fn key(&self) -> &str {
        &self.raw[..self.key_end]
    }

    pub fn value(&self) -> &str {
        &self.raw[self.value_start..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn display_rank(&self) -> u8 {
        if self.key() == SERVER_HEADER {
            0
        } else if is_end_to_end(self.key()) {
            1
        } else {
            2
        }
    }
}

impl FromStr for HeaderLine {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HeaderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Display order: `Server`, then end-to-end, then hop-by-hop; ties broken
/// by the raw line.
impl Ord for HeaderLine {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display_rank()
            .cmp(&other.display_rank())
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for HeaderLine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Repeatable `-H` values, kept in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<HeaderLine>);

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: HeaderLine) {
        self.0.push(line);
    }

    /// Parses and appends a raw `Key: Value` string.
    pub fn set(&mut self, raw: &str) -> Result<(), HeaderError> {
        self.0.push(HeaderLine::parse(raw)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderLine> {
        self.0.iter()
    }

    /// Whether a header named `name` was given, ignoring case.
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.iter().any(|h| h.key().eq_ignore_ascii_case(name))
    }

    pub fn sort_for_display(&mut self) {
        self.0.sort();
    }
}

impl fmt::Display for HeaderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "-H {}", line)?;
        }
        Ok(())
    }
}

impl FromIterator<HeaderLine> for HeaderList {
    fn from_iter<I: IntoIterator<Item = HeaderLine>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for HeaderList {
    type Item = HeaderLine;
    type IntoIter = std::vec::IntoIter<HeaderLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a HeaderLine;
    type IntoIter = std::slice::Iter<'a, HeaderLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
