//! # Core Type Definitions
//!
//! This module contains the entity types shared across the engine:
//! - Graph entities (`Node`, `Edge`)
//! - Timestamps (`TimestampMs`)
//! - Error types (`CredError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All entity types are plain values with derived equality. Ordering of
//! collections of entities is always by address, never by insertion.

use crate::address::{EdgeAddress, NodeAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

// =============================================================================
// NODE
// =============================================================================

/// A node in a contribution graph.
///
/// A node without a timestamp is *timeless*; identities usually are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub address: NodeAddress,
    /// Short human-readable description, markdown permitted.
    pub description: String,
    pub timestamp_ms: Option<TimestampMs>,
}

impl Node {
    /// Create a timeful node.
    #[must_use]
    pub fn new(address: NodeAddress, description: impl Into<String>, timestamp_ms: TimestampMs) -> Self {
        Self {
            address,
            description: description.into(),
            timestamp_ms: Some(timestamp_ms),
        }
    }

    /// Create a timeless node.
    #[must_use]
    pub fn timeless(address: NodeAddress, description: impl Into<String>) -> Self {
        Self {
            address,
            description: description.into(),
            timestamp_ms: None,
        }
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed edge in a contribution graph.
///
/// Endpoints are addresses, not node references: an edge may dangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub address: EdgeAddress,
    pub src: NodeAddress,
    pub dst: NodeAddress,
    pub timestamp_ms: TimestampMs,
}

impl Edge {
    /// Create a new edge.
    #[must_use]
    pub fn new(
        address: EdgeAddress,
        src: NodeAddress,
        dst: NodeAddress,
        timestamp_ms: TimestampMs,
    ) -> Self {
        Self {
            address,
            src,
            dst,
            timestamp_ms,
        }
    }

    /// Whether this edge starts and ends at the same node.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.src == self.dst
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Stable tag for each error family, used by drivers to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    InvalidAddress,
    Conflict,
    Invariant,
    ConcurrentModification,
    WeightConfig,
    Parameter,
    MissingReference,
    Serialization,
    Io,
}

/// Errors that can occur in the credrank engine.
///
/// - No silent failures
/// - Use `Result<T, CredError>` for fallible operations
/// - Non-convergence is reported, not raised
#[derive(Debug, Error)]
pub enum CredError {
    /// Invalid address parts, wrong address kind, or NUL in a component.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A conflicting entity already exists at this address.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal consistency violation. Always a programming fault.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// The graph was modified while a cursor was iterating over it.
    #[error("Concurrent modification detected")]
    ConcurrentModification,

    /// Negative weight or overlapping budget prefixes.
    #[error("Invalid weight configuration: {0}")]
    WeightConfig(String),

    /// Invalid transition probability, budget period, or interval setting.
    #[error("Invalid parameter: {0}")]
    Parameter(String),

    /// A referenced entity is absent from the graph.
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl CredError {
    /// The stable family tag of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Invariant(_) => ErrorKind::Invariant,
            Self::ConcurrentModification => ErrorKind::ConcurrentModification,
            Self::WeightConfig(_) => ErrorKind::WeightConfig,
            Self::Parameter(_) => ErrorKind::Parameter,
            Self::MissingReference(_) => ErrorKind::MissingReference,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_json::Error> for CredError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeless_node_has_no_timestamp() {
        let address = NodeAddress::from_parts(["user", "alice"]).expect("address");
        let node = Node::timeless(address, "alice");
        assert_eq!(node.timestamp_ms, None);
    }

    #[test]
    fn node_serializes_camel_case() {
        let address = NodeAddress::from_parts(["a"]).expect("address");
        let json = serde_json::to_string(&Node::new(address, "a", 5)).expect("serialize");
        assert!(json.contains("\"timestampMs\":5"));
    }

    #[test]
    fn loop_edge_detected() {
        let n = NodeAddress::from_parts(["n"]).expect("node");
        let e = EdgeAddress::from_parts(["e"]).expect("edge");
        assert!(Edge::new(e, n.clone(), n, 0).is_loop());
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(CredError::ConcurrentModification.kind(), ErrorKind::ConcurrentModification);
        assert_eq!(
            CredError::Parameter("x".to_string()).kind(),
            ErrorKind::Parameter
        );
        assert_eq!(
            CredError::ConcurrentModification.to_string(),
            "Concurrent modification detected"
        );
    }
}
