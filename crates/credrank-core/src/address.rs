//! # Addresses
//!
//! Opaque hierarchical keys for nodes and edges.
//!
//! An address is an ordered sequence of string components tagged with a kind.
//! Node and edge addresses are distinct types, so handing an edge address to
//! a node operation is a compile error. The canonical encoding is a string:
//! a one-character kind nonce, then every component terminated by NUL.
//!
//! ```text
//! NodeAddress["github", "issue", "42"]  ->  "N\0github\0issue\0" "42\0"
//! ```
//!
//! Because NUL is the smallest byte and never appears inside a component:
//! - byte order of the encoding equals component-wise lexicographic order
//! - `A` is a prefix of `B` iff `B`'s encoding starts with `A`'s

use crate::CredError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;

const SEPARATOR: char = '\0';

// =============================================================================
// ADDRESS KINDS
// =============================================================================

/// Marker trait for the two address kinds.
pub trait AddressKind {
    /// One-character nonce leading the canonical encoding.
    const NONCE: char;
    /// Human-readable kind name used in diagnostics.
    const NAME: &'static str;
}

/// Kind marker for node addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeKind;

/// Kind marker for edge addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EdgeKind;

impl AddressKind for NodeKind {
    const NONCE: char = 'N';
    const NAME: &'static str = "NodeAddress";
}

impl AddressKind for EdgeKind {
    const NONCE: char = 'E';
    const NAME: &'static str = "EdgeAddress";
}

fn kind_name_for_nonce(nonce: char) -> Option<&'static str> {
    match nonce {
        NodeKind::NONCE => Some(NodeKind::NAME),
        EdgeKind::NONCE => Some(EdgeKind::NAME),
        _ => None,
    }
}

// =============================================================================
// ADDRESS
// =============================================================================

/// A hierarchical address of kind `K`.
///
/// Ordering, equality and hashing all operate on the canonical encoding.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address<K: AddressKind> {
    raw: String,
    kind: PhantomData<K>,
}

/// Address of a graph node.
pub type NodeAddress = Address<NodeKind>;

/// Address of a graph edge.
pub type EdgeAddress = Address<EdgeKind>;

impl<K: AddressKind> Address<K> {
    fn header_len() -> usize {
        K::NONCE.len_utf8() + SEPARATOR.len_utf8()
    }

    fn from_raw_unchecked(raw: String) -> Self {
        Self {
            raw,
            kind: PhantomData,
        }
    }

    /// The address with no components. It is a prefix of every address of its kind.
    #[must_use]
    pub fn empty() -> Self {
        let mut raw = String::with_capacity(Self::header_len());
        raw.push(K::NONCE);
        raw.push(SEPARATOR);
        Self::from_raw_unchecked(raw)
    }

    /// Build an address from its components.
    ///
    /// Fails if any component contains the NUL character.
    pub fn from_parts<I, S>(parts: I) -> Result<Self, CredError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::empty().append(parts)
    }

    /// Parse a canonical encoding, checking the kind nonce and terminator.
    pub fn from_raw(raw: &str) -> Result<Self, CredError> {
        let mut chars = raw.chars();
        let nonce = chars.next();
        if nonce != Some(K::NONCE) {
            return Err(match nonce.and_then(kind_name_for_nonce) {
                Some(actual) => CredError::InvalidAddress(format!(
                    "wrong kind: expected {}, got {}",
                    K::NAME,
                    actual
                )),
                None => CredError::InvalidAddress(format!("malformed {}: {:?}", K::NAME, raw)),
            });
        }
        if chars.next() != Some(SEPARATOR) || !raw.ends_with(SEPARATOR) {
            return Err(CredError::InvalidAddress(format!(
                "malformed {}: {:?}",
                K::NAME,
                raw
            )));
        }
        Ok(Self::from_raw_unchecked(raw.to_string()))
    }

    /// The canonical encoding.
    #[must_use]
    pub fn as_raw(&self) -> &str {
        &self.raw
    }

    /// Components of this address, in order.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.raw[Self::header_len()..].split_terminator(SEPARATOR)
    }

    /// Owned copy of the components.
    #[must_use]
    pub fn to_parts(&self) -> Vec<String> {
        self.parts().map(str::to_string).collect()
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.matches(SEPARATOR).count().saturating_sub(1)
    }

    /// Whether this is the empty address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.len() == Self::header_len()
    }

    /// Return a new address with `parts` appended.
    pub fn append<I, S>(&self, parts: I) -> Result<Self, CredError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = self.raw.clone();
        for part in parts {
            let part = part.as_ref();
            if part.contains(SEPARATOR) {
                return Err(CredError::InvalidAddress(format!(
                    "{} part contains NUL character: {:?}",
                    K::NAME,
                    part
                )));
            }
            raw.push_str(part);
            raw.push(SEPARATOR);
        }
        Ok(Self::from_raw_unchecked(raw))
    }

    /// Return a new address with every component of `other` appended.
    ///
    /// `other` may be of either kind; its components are already NUL-free.
    #[must_use]
    pub fn append_address<O: AddressKind>(&self, other: &Address<O>) -> Self {
        let mut raw = self.raw.clone();
        raw.push_str(&other.raw[Address::<O>::header_len()..]);
        Self::from_raw_unchecked(raw)
    }

    /// Whether `prefix` is a component-wise prefix of this address.
    #[must_use]
    pub fn has_prefix(&self, prefix: &Self) -> bool {
        self.raw.starts_with(&prefix.raw)
    }

    /// Canonical encodings of every prefix of this address, shortest first.
    ///
    /// The sequence starts with the empty address and ends with `self`.
    pub(crate) fn raw_prefixes(&self) -> impl Iterator<Item = &str> {
        let raw = self.raw.as_str();
        raw.char_indices()
            .filter(|&(_, c)| c == SEPARATOR)
            .map(move |(i, _)| &raw[..=i])
    }
}

impl<K: AddressKind> Borrow<str> for Address<K> {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl<K: AddressKind> Default for Address<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: AddressKind> fmt::Debug for Address<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", K::NAME, self.parts().collect::<Vec<_>>())
    }
}

impl<K: AddressKind> fmt::Display for Address<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// SERIALIZATION (component arrays)
// =============================================================================

impl<K: AddressKind> Serialize for Address<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.parts())
    }
}

impl<'de, K: AddressKind> Deserialize<'de> for Address<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<String>::deserialize(deserializer)?;
        Self::from_parts(parts).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================
