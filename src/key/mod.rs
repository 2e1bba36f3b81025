//! Object key normalization.
//!
//! Callers often hand over paths such as `/2024-05-20/img/demo.png`; the store
//! expects the same key without the leading slash. Normalization strips the
//! leading `/` of keys longer than one character and leaves everything else
//! untouched (no percent-encoding, no case folding). A key made of repeated
//! slashes (`//a`) is stripped until the invariant holds, which keeps the
//! function idempotent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized object key.
///
/// Never begins with `/` unless its length is at most one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Normalize a raw key.
    pub fn new(raw: impl AsRef<str>) -> Self {
        ObjectKey(normalize(raw.as_ref()).to_string())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the key and return the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectKey {
    fn from(raw: &str) -> Self {
        ObjectKey::new(raw)
    }
}

impl From<String> for ObjectKey {
    fn from(raw: String) -> Self {
        if normalize(&raw).len() == raw.len() {
            ObjectKey(raw)
        } else {
            ObjectKey::new(raw)
        }
    }
}

impl From<&String> for ObjectKey {
    fn from(raw: &String) -> Self {
        ObjectKey::new(raw)
    }
}

impl From<&ObjectKey> for ObjectKey {
    fn from(key: &ObjectKey) -> Self {
        key.clone()
    }
}

/// Strip the leading `/` from keys longer than one character.
///
/// Loops rather than stripping once: `//a` would otherwise become `/a`, and
/// normalizing that again would change it.
pub fn normalize(raw: &str) -> &str {
    let mut key = raw;
    while key.len() > 1 {
        match key.strip_prefix('/') {
            Some(rest) => key = rest,
            None => break,
        }
    }
    key
}
