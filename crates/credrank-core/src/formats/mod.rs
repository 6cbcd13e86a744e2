//! # Formats
//!
//! - `compat`: versioned JSON envelopes for every persisted entity
//! - `persistence`: binary snapshots of weighted graphs

pub mod compat;
pub mod persistence;

pub use compat::{CompatInfo, CompatPayload, from_compat_json, to_compat_json};
#[cfg(feature = "crypto-hash")]
pub use persistence::content_hash;
pub use persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, weighted_graph_from_bytes,
    weighted_graph_to_bytes,
};
