//! # Compat Envelope
//!
//! Every persisted JSON document is wrapped as
//! `{"compat": {"type": ..., "version": ...}, "payload": ...}`. Loading checks
//! the type and version before the payload is decoded.

use crate::cred_graph::CredGraphJson;
use crate::cred_result::CredResult;
use crate::graph::GraphJson;
use crate::markov::process_graph::MarkovProcessGraphJson;
use crate::weighted_graph::WeightedGraphJson;
use crate::weights::WeightsJson;
use crate::CredError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatInfo {
    #[serde(rename = "type")]
    pub type_name: String,
    pub version: String,
}

/// A payload with a registered compat type and version.
pub trait CompatPayload: Serialize + DeserializeOwned {
    const COMPAT_TYPE: &'static str;
    const COMPAT_VERSION: &'static str;
}

impl CompatPayload for GraphJson {
    const COMPAT_TYPE: &'static str = "credrank/graph";
    const COMPAT_VERSION: &'static str = "1.0.0";
}

impl CompatPayload for WeightsJson {
    const COMPAT_TYPE: &'static str = "credrank/weights";
    const COMPAT_VERSION: &'static str = "1.0.0";
}

impl CompatPayload for WeightedGraphJson {
    const COMPAT_TYPE: &'static str = "credrank/weightedGraph";
    const COMPAT_VERSION: &'static str = "1.0.0";
}

impl CompatPayload for MarkovProcessGraphJson {
    const COMPAT_TYPE: &'static str = "credrank/markovProcessGraph";
    const COMPAT_VERSION: &'static str = "1.0.0";
}

impl CompatPayload for CredGraphJson {
    const COMPAT_TYPE: &'static str = "credrank/credGraph";
    const COMPAT_VERSION: &'static str = "1.0.0";
}

impl CompatPayload for CredResult {
    const COMPAT_TYPE: &'static str = "credrank/credResult";
    const COMPAT_VERSION: &'static str = "1.0.0";
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    compat: CompatInfo,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    compat: CompatInfo,
    payload: serde_json::Value,
}

/// Wrap `payload` in its compat envelope.
pub fn to_compat_json<T: CompatPayload>(payload: &T) -> Result<serde_json::Value, CredError> {
    Ok(serde_json::to_value(EnvelopeRef {
        compat: CompatInfo {
            type_name: T::COMPAT_TYPE.to_string(),
            version: T::COMPAT_VERSION.to_string(),
        },
        payload,
    })?)
}

/// Unwrap an envelope, rejecting any other type or version.
pub fn from_compat_json<T: CompatPayload>(value: serde_json::Value) -> Result<T, CredError> {
    let envelope: Envelope = serde_json::from_value(value)?;
    if envelope.compat.type_name != T::COMPAT_TYPE {
        return Err(CredError::Serialization(format!(
            "expected compat type {}, found {}",
            T::COMPAT_TYPE,
            envelope.compat.type_name
        )));
    }
    if envelope.compat.version != T::COMPAT_VERSION {
        return Err(CredError::Serialization(format!(
            "unsupported {} version {} (expected {})",
            T::COMPAT_TYPE,
            envelope.compat.version,
            T::COMPAT_VERSION
        )));
    }
    Ok(serde_json::from_value(envelope.payload)?)
}
