//! # Weights
//!
//! Prefix-keyed weight overrides for nodes and edges.
//!
//! A node weight is a scalar `>= 0`; an edge weight is a `(forwards, backwards)`
//! pair of scalars `>= 0`. Keys are address *prefixes*: an entry applies to
//! every address that starts with it. How matching entries combine is the
//! job of [`crate::weight_evaluator`].

use crate::address::{EdgeAddress, NodeAddress};
use crate::CredError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Directional weight of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    /// Weight of flow from `src` to `dst`.
    pub forwards: f64,
    /// Weight of flow from `dst` back to `src`.
    pub backwards: f64,
}

impl EdgeWeight {
    #[must_use]
    pub fn new(forwards: f64, backwards: f64) -> Self {
        Self {
            forwards,
            backwards,
        }
    }

    /// Whether both directions are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.forwards == 0.0 && self.backwards == 0.0
    }
}

impl Default for EdgeWeight {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

fn check_scalar(value: f64, what: &dyn std::fmt::Display) -> Result<(), CredError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CredError::WeightConfig(format!(
            "weight for {} must be finite and non-negative, got {}",
            what, value
        )));
    }
    Ok(())
}

// =============================================================================
// WEIGHTS
// =============================================================================

/// Node and edge weight overrides keyed by address prefix.
///
/// An empty `Weights` is the default: every evaluated weight is 1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Weights {
    node_weights: BTreeMap<NodeAddress, f64>,
    edge_weights: BTreeMap<EdgeAddress, EdgeWeight>,
}

impl Weights {
    /// Empty mappings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight for a node prefix, replacing any previous entry.
    pub fn set_node_weight(&mut self, prefix: NodeAddress, weight: f64) -> Result<(), CredError> {
        check_scalar(weight, &prefix)?;
        self.node_weights.insert(prefix, weight);
        Ok(())
    }

    /// Set the weight for an edge prefix, replacing any previous entry.
    pub fn set_edge_weight(
        &mut self,
        prefix: EdgeAddress,
        weight: EdgeWeight,
    ) -> Result<(), CredError> {
        check_scalar(weight.forwards, &prefix)?;
        check_scalar(weight.backwards, &prefix)?;
        self.edge_weights.insert(prefix, weight);
        Ok(())
    }

    /// Exact entry for a node prefix.
    #[must_use]
    pub fn node_weight(&self, prefix: &NodeAddress) -> Option<f64> {
        self.node_weights.get(prefix).copied()
    }

    /// Exact entry for an edge prefix.
    #[must_use]
    pub fn edge_weight(&self, prefix: &EdgeAddress) -> Option<EdgeWeight> {
        self.edge_weights.get(prefix).copied()
    }

    /// Node entries in prefix order.
    pub fn node_weights(&self) -> impl Iterator<Item = (&NodeAddress, f64)> {
        self.node_weights.iter().map(|(a, &w)| (a, w))
    }

    /// Edge entries in prefix order.
    pub fn edge_weights(&self) -> impl Iterator<Item = (&EdgeAddress, EdgeWeight)> {
        self.edge_weights.iter().map(|(a, &w)| (a, w))
    }

    pub(crate) fn node_map(&self) -> &BTreeMap<NodeAddress, f64> {
        &self.node_weights
    }

    pub(crate) fn edge_map(&self) -> &BTreeMap<EdgeAddress, EdgeWeight> {
        &self.edge_weights
    }

    /// Copy of `self` in which every entry of `overrides` replaces ours.
    #[must_use]
    pub fn with_overrides(&self, overrides: &Weights) -> Weights {
        let mut result = self.clone();
        result
            .node_weights
            .extend(overrides.node_weights.iter().map(|(a, &w)| (a.clone(), w)));
        result
            .edge_weights
            .extend(overrides.edge_weights.iter().map(|(a, &w)| (a.clone(), w)));
        result
    }

    /// Merge several weight sets. Overlapping entries must be equal.
    pub fn merge<'w>(all: impl IntoIterator<Item = &'w Weights>) -> Result<Weights, CredError> {
        Self::merge_with(
            all,
            |address, a, b| {
                Err(CredError::WeightConfig(format!(
                    "node weight conflict for {}: {} vs {}",
                    address, a, b
                )))
            },
            |address, a, b| {
                Err(CredError::WeightConfig(format!(
                    "edge weight conflict for {}: {:?} vs {:?}",
                    address, a, b
                )))
            },
        )
    }

    /// Merge several weight sets, combining unequal overlapping entries with
    /// the given resolvers. Equal entries never reach a resolver.
    pub fn merge_with<'w, N, E>(
        all: impl IntoIterator<Item = &'w Weights>,
        node_resolver: N,
        edge_resolver: E,
    ) -> Result<Weights, CredError>
    where
        N: Fn(&NodeAddress, f64, f64) -> Result<f64, CredError>,
        E: Fn(&EdgeAddress, EdgeWeight, EdgeWeight) -> Result<EdgeWeight, CredError>,
    {
        let mut result = Weights::new();
        for weights in all {
            for (address, &weight) in &weights.node_weights {
                let merged = match result.node_weights.get(address) {
                    Some(&existing) if existing != weight => {
                        node_resolver(address, existing, weight)?
                    }
                    _ => weight,
                };
                result.set_node_weight(address.clone(), merged)?;
            }
            for (address, &weight) in &weights.edge_weights {
                let merged = match result.edge_weights.get(address) {
                    Some(&existing) if existing != weight => {
                        edge_resolver(address, existing, weight)?
                    }
                    _ => weight,
                };
                result.set_edge_weight(address.clone(), merged)?;
            }
        }
        Ok(result)
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn to_json(&self) -> WeightsJson {
        WeightsJson {
            node_weights: self
                .node_weights
                .iter()
                .map(|(a, &w)| (a.as_raw().to_string(), w))
                .collect(),
            edge_weights: self
                .edge_weights
                .iter()
                .map(|(a, &w)| (a.as_raw().to_string(), w))
                .collect(),
        }
    }

    pub fn from_json(json: &WeightsJson) -> Result<Weights, CredError> {
        let mut weights = Weights::new();
        for (raw, &weight) in &json.node_weights {
            weights.set_node_weight(NodeAddress::from_raw(raw)?, weight)?;
        }
        for (raw, &weight) in &json.edge_weights {
            weights.set_edge_weight(EdgeAddress::from_raw(raw)?, weight)?;
        }
        Ok(weights)
    }
}

/// JSON form: two maps keyed by the canonical address encoding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightsJson {
    pub node_weights: BTreeMap<String, f64>,
    pub edge_weights: BTreeMap<String, EdgeWeight>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn na(parts: &[&str]) -> NodeAddress {
        NodeAddress::from_parts(parts).expect("node address")
    }

    fn ea(parts: &[&str]) -> EdgeAddress {
        EdgeAddress::from_parts(parts).expect("edge address")
    }

    #[test]
    fn default_is_empty() {
        let weights = Weights::new();
        assert_eq!(weights.node_weights().count(), 0);
        assert_eq!(weights.edge_weights().count(), 0);
        assert_eq!(EdgeWeight::default(), EdgeWeight::new(1.0, 1.0));
    }

    #[test]
    fn negative_weight_rejected() {
        let mut weights = Weights::new();
        assert!(matches!(
            weights.set_node_weight(na(&["a"]), -1.0),
            Err(CredError::WeightConfig(_))
        ));
        assert!(matches!(
            weights.set_edge_weight(ea(&["e"]), EdgeWeight::new(1.0, f64::NAN)),
            Err(CredError::WeightConfig(_))
        ));
    }

    #[test]
    fn merge_equal_entries() {
        let mut a = Weights::new();
        a.set_node_weight(na(&["x"]), 2.0).expect("set");
        let mut b = Weights::new();
        b.set_node_weight(na(&["x"]), 2.0).expect("set");
        b.set_edge_weight(ea(&["e"]), EdgeWeight::new(1.0, 0.0)).expect("set");

        let merged = Weights::merge([&a, &b]).expect("merge");
        assert_eq!(merged.node_weight(&na(&["x"])), Some(2.0));
        assert_eq!(merged.edge_weight(&ea(&["e"])), Some(EdgeWeight::new(1.0, 0.0)));
    }

    #[test]
    fn merge_conflict_fails_by_default() {
        let mut a = Weights::new();
        a.set_node_weight(na(&["x"]), 2.0).expect("set");
        let mut b = Weights::new();
        b.set_node_weight(na(&["x"]), 3.0).expect("set");
        assert!(matches!(
            Weights::merge([&a, &b]),
            Err(CredError::WeightConfig(_))
        ));
    }

    #[test]
    fn merge_with_resolver() {
        let mut a = Weights::new();
        a.set_node_weight(na(&["x"]), 2.0).expect("set");
        let mut b = Weights::new();
        b.set_node_weight(na(&["x"]), 3.0).expect("set");
        let merged = Weights::merge_with(
            [&a, &b],
            |_, x, y| Ok(x * y),
            |_, x, _| Ok(x),
        )
        .expect("merge");
        assert_eq!(merged.node_weight(&na(&["x"])), Some(6.0));
    }

    #[test]
    fn overrides_replace_entries() {
        let mut base = Weights::new();
        base.set_node_weight(na(&["x"]), 2.0).expect("set");
        base.set_node_weight(na(&["y"]), 5.0).expect("set");
        let mut overrides = Weights::new();
        overrides.set_node_weight(na(&["x"]), 0.5).expect("set");

        let combined = base.with_overrides(&overrides);
        assert_eq!(combined.node_weight(&na(&["x"])), Some(0.5));
        assert_eq!(combined.node_weight(&na(&["y"])), Some(5.0));
        assert_eq!(base.node_weight(&na(&["x"])), Some(2.0));
    }

    #[test]
    fn json_roundtrip() {
        let mut weights = Weights::new();
        weights.set_node_weight(na(&["a", "b"]), 0.25).expect("set");
        weights
            .set_edge_weight(ea(&["e"]), EdgeWeight::new(2.0, 0.5))
            .expect("set");

        let text = serde_json::to_string(&weights.to_json()).expect("serialize");
        let json: WeightsJson = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(Weights::from_json(&json).expect("from json"), weights);
    }

    #[test]
    fn from_json_rejects_wrong_kind_key() {
        let mut json = WeightsJson::default();
        json.node_weights.insert(ea(&["e"]).as_raw().to_string(), 1.0);
        assert!(matches!(
            Weights::from_json(&json),
            Err(CredError::InvalidAddress(_))
        ));
    }
}
