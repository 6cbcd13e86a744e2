//! # Persistence Format
//!
//! Binary snapshot of a weighted graph.
//!
//! Format: Header (5 bytes) + postcard-serialized [`WeightedGraphJson`].
//! - 4 bytes: Magic ("CRED")
//! - 1 byte: Version
//!
//! File I/O lives in the driver; this module only maps values to bytes.
//!
//! ## Validation
//!
//! Size limits and the header are checked before the payload is decoded,
//! and the decoded graph is rebuilt through [`WeightedGraph::from_json`] so
//! every graph invariant is re-checked.

use crate::primitives;
use crate::weighted_graph::{WeightedGraph, WeightedGraphJson};
use crate::CredError;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted snapshot size (500 MB), checked before decoding.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 500 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), CredError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(CredError::Serialization("Invalid magic bytes".to_string()));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(CredError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [a, b, c, d] = self.magic;
        [a, b, c, d, self.version]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredError> {
        match bytes {
            [a, b, c, d, version, ..] => Ok(Self {
                magic: [*a, *b, *c, *d],
                version: *version,
            }),
            _ => Err(CredError::Serialization("Header too short".to_string())),
        }
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Header followed by the postcard payload.
pub fn weighted_graph_to_bytes(weighted: &WeightedGraph) -> Result<Vec<u8>, CredError> {
    let payload = postcard::to_stdvec(&weighted.to_json())
        .map_err(|e| CredError::Serialization(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a snapshot written by [`weighted_graph_to_bytes`].
pub fn weighted_graph_from_bytes(bytes: &[u8]) -> Result<WeightedGraph, CredError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CredError::Serialization(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(CredError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    PersistenceHeader::from_bytes(bytes)?.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    let json: WeightedGraphJson = postcard::from_bytes(payload).map_err(|e| {
        CredError::Serialization(format!("Failed to decode weighted graph: {}", e))
    })?;
    WeightedGraph::from_json(&json)
}

/// BLAKE3 hex digest of the canonical JSON of `weighted`.
///
/// Equal graphs hash equally regardless of insertion order.
#[cfg(feature = "crypto-hash")]
pub fn content_hash(weighted: &WeightedGraph) -> Result<String, CredError> {
    let data = serde_json::to_vec(&weighted.to_json())?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
