use std::{cmp::Ordering, fmt};

use bytes::Bytes;
use serde::{Deserialize, Deserializer};

/// Owned, cheaply clonable byte string used for keys, values and range
/// boundaries.
///
/// Cloning a `Slice` bumps a reference count instead of copying, so entries
/// can move between the store, the cursor and the caller without
/// reallocating.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Slice {
    data: Bytes,
}

impl Slice {
    pub fn new(data: Vec<u8>) -> Self {
        Slice {
            data: Bytes::from(data),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Slice {
            data: Bytes::copy_from_slice(data),
        }
    }

    pub fn empty() -> Self {
        Slice { data: Bytes::new() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn compare(&self, other: &Slice) -> Ordering {
        self.data.cmp(&other.data)
    }

    pub fn starts_with(&self, prefix: &Slice) -> bool {
        self.data.starts_with(&prefix.data)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Lossy UTF-8 view, used when a caller asks for text instead of bytes.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl From<Vec<u8>> for Slice {
    fn from(data: Vec<u8>) -> Self {
        Slice::new(data)
    }
}

impl From<&[u8]> for Slice {
    fn from(data: &[u8]) -> Self {
        Slice::from_bytes(data)
    }
}

impl From<Bytes> for Slice {
    fn from(data: Bytes) -> Self {
        Slice { data }
    }
}

impl From<String> for Slice {
    fn from(s: String) -> Self {
        Slice::new(s.into_bytes())
    }
}

impl From<&str> for Slice {
    fn from(s: &str) -> Self {
        Slice {
            data: Bytes::copy_from_slice(s.as_bytes()),
        }
    }
}

impl AsRef<[u8]> for Slice {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialOrd for Slice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slice {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// Boundary values arrive either as text or as raw byte arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrBytes {
    Text(String),
    Bytes(Vec<u8>),
}

impl<'de> Deserialize<'de> for Slice {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match StringOrBytes::deserialize(deserializer)? {
            StringOrBytes::Text(s) => Slice::from(s),
            StringOrBytes::Bytes(b) => Slice::from(b),
        })
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.data) {
            Ok(s) => write!(f, "Slice(\"{s}\")"),
            Err(_) => write!(f, "Slice({:?})", self.data.as_ref()),
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.data) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{:?}", self.data.as_ref()),
        }
    }
}
