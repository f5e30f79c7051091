//! DID and DID-URL parsing and serialization.
//!
//! This module implements the DID-URL grammar
//!
//! ```text
//! did-url   = "did:" method ":" method-id *(";" param) [path] ["?" query] ["#" fragment]
//! method    = 1*LOWER-ALNUM
//! method-id = segment *(":" segment)
//! segment   = 1*( ID-CHAR | pct-encoded )
//! param     = key "=" value
//! ```
//!
//! as a single left-to-right pass without backtracking. Path, query and
//! fragment are taken verbatim up to the next delimiter.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

const DID_PREFIX: &str = "did:";

fn is_lower_alphanumeric(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn is_id_character(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'.' | b'_')
}

fn is_parameter_character(c: u8) -> bool {
    is_id_character(c) || c == b':' || c == b'%'
}

/// Returns the index of the first byte at or after `from` that `accept` rejects.
fn scan(bytes: &[u8], from: usize, accept: impl Fn(u8) -> bool) -> usize {
    bytes[from..]
        .iter()
        .position(|&c| !accept(c))
        .map_or(bytes.len(), |n| from + n)
}

/// A `key=value` pair following a `;` in a DID-URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub key: String,
    /// May be empty
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A parsed DID or DID-URL
///
/// `Display` renders the full DID-URL form, [`Did::did`] the bare DID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    /// The DID method, e.g. `web` in `did:web:example.com`
    pub method: String,
    /// The `:`-separated segments of the method-specific identifier, never empty
    pub method_ids: Vec<String>,
    /// DID parameters in their original order
    pub parameters: Vec<Parameter>,
    /// The path, including its leading `/`
    pub path: Option<String>,
    /// The query, without its leading `?`
    pub query: Option<String>,
    /// The fragment, without its leading `#`
    pub fragment: Option<String>,
}

impl Did {
    /// Creates a bare DID from a method and its method-specific-id segments
    ///
    /// Fails unless the result satisfies the same grammar [`Did::parse`] enforces.
    pub fn new(method: impl Into<String>, method_ids: Vec<String>) -> Result<Self, Error> {
        let did = Self {
            method: method.into(),
            method_ids,
            parameters: Vec::new(),
            path: None,
            query: None,
            fragment: None,
        };
        let text = did.did();
        if Self::parse(&text)? != did {
            return Err(Error::InvalidDid(text));
        }
        Ok(did)
    }

    /// Parses and validates a DID or DID-URL string
    pub fn parse(input: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidDid(input.to_string());
        let bytes = input.as_bytes();

        if !input.starts_with(DID_PREFIX) {
            return Err(invalid());
        }

        // method
        let start = DID_PREFIX.len();
        let mut i = scan(bytes, start, is_lower_alphanumeric);
        if i == start || bytes.get(i) != Some(&b':') {
            return Err(invalid());
        }
        let method = input[start..i].to_string();
        i += 1;

        // method-specific-id segments
        let mut method_ids = Vec::new();
        let mut start = i;
        loop {
            match bytes.get(i) {
                Some(b':') => {
                    if i == start {
                        return Err(invalid());
                    }
                    method_ids.push(input[start..i].to_string());
                    i += 1;
                    start = i;
                }
                Some(b'%') => match (bytes.get(i + 1), bytes.get(i + 2)) {
                    (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                        i += 3;
                    }
                    _ => return Err(invalid()),
                },
                Some(&c) if is_id_character(c) => i += 1,
                _ => break,
            }
        }
        if i == start {
            return Err(invalid());
        }
        method_ids.push(input[start..i].to_string());

        // parameters
        let mut parameters = Vec::new();
        while bytes.get(i) == Some(&b';') {
            let key_start = i + 1;
            i = scan(bytes, key_start, is_parameter_character);
            if i == key_start || bytes.get(i) != Some(&b'=') {
                return Err(invalid());
            }
            let key = &input[key_start..i];
            let value_start = i + 1;
            i = scan(bytes, value_start, is_parameter_character);
            parameters.push(Parameter::new(key, &input[value_start..i]));
        }

        let path = if bytes.get(i) == Some(&b'/') {
            let start = i;
            i = scan(bytes, start, |c| c != b'?' && c != b'#');
            Some(input[start..i].to_string())
        } else {
            None
        };

        let query = if bytes.get(i) == Some(&b'?') {
            let start = i + 1;
            i = scan(bytes, start, |c| c != b'#');
            Some(input[start..i].to_string())
        } else {
            None
        };

        let fragment = if bytes.get(i) == Some(&b'#') {
            let fragment = input[i + 1..].to_string();
            i = bytes.len();
            Some(fragment)
        } else {
            None
        };

        if i != bytes.len() {
            return Err(invalid());
        }

        Ok(Self {
            method,
            method_ids,
            parameters,
            path,
            query,
            fragment,
        })
    }

    /// The method-specific identifier, segments joined by `:`
    pub fn method_specific_id(&self) -> String {
        self.method_ids.join(":")
    }

    /// Renders the bare DID: `did:<method>:<seg0>:<seg1>...`
    pub fn did(&self) -> String {
        format!("{}{}:{}", DID_PREFIX, self.method, self.method_specific_id())
    }

    /// Returns true if this value carries nothing beyond method and identifier
    pub fn is_bare(&self) -> bool {
        self.parameters.is_empty()
            && self.path.is_none()
            && self.query.is_none()
            && self.fragment.is_none()
    }

    /// Looks up the first parameter with the given key
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.did())?;
        for parameter in &self.parameters {
            write!(f, ";{}={}", parameter.key, parameter.value)?;
        }
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

impl FromStr for Did {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}
