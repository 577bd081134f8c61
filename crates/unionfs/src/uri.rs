//! `union://` URIs identifying a path inside a live filesystem.
//!
//! Format: `union://<filesystem key>/<percent-encoded absolute path>`.

use std::fmt;
use std::str::FromStr;

use crate::error::{UnionError, UnionResult};

/// Scheme name registered by the union provider.
pub const SCHEME: &str = "union";

/// A parsed union URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionUri {
    key: String,
    path: String,
}

impl UnionUri {
    /// Build a URI from a filesystem key and an absolute path string.
    pub fn new(key: impl Into<String>, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            key: key.into(),
            path,
        }
    }

    /// Identity key of the filesystem.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Absolute path within the filesystem, decoded.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for UnionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", SCHEME, self.key, encode(&self.path))
    }
}

impl FromStr for UnionUri {
    type Err = UnionError;

    fn from_str(s: &str) -> UnionResult<Self> {
        let rest = s
            .strip_prefix(SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| UnionError::invalid_uri(format!("expected {}:// prefix: {}", SCHEME, s)))?;
        let (key, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, "/"),
        };
        if key.is_empty() {
            return Err(UnionError::invalid_uri(format!("missing filesystem key: {}", s)));
        }
        Ok(Self {
            key: key.to_string(),
            path: decode(path).ok_or_else(|| UnionError::invalid_uri(s.to_string()))?,
        })
    }
}

/// Scheme of a URI string, if it has one.
pub fn scheme_of(uri: &str) -> Option<&str> {
    uri.split_once("://").map(|(scheme, _)| scheme)
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'/')
}

fn encode(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
