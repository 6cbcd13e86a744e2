//! # Weight Evaluation
//!
//! Turns prefix-keyed weights into a per-address weight.
//!
//! Every prefix of an address (including the empty prefix and the address
//! itself) that carries a weight contributes one factor; the evaluated weight
//! is the product of all factors, or 1 when nothing matches. A type default
//! and an explicit entry at the same prefix never stack: the explicit entry
//! replaces the default for that prefix only.

use crate::address::{EdgeAddress, NodeAddress};
use crate::plugin::{EdgeType, NodeType};
use crate::weights::{EdgeWeight, Weights};
use std::collections::BTreeMap;

/// Evaluates node weights.
#[derive(Debug, Clone, Default)]
pub struct NodeWeightEvaluator {
    weights: BTreeMap<NodeAddress, f64>,
}

impl NodeWeightEvaluator {
    /// Evaluator over type defaults overridden by explicit weights.
    #[must_use]
    pub fn new<'t>(node_types: impl IntoIterator<Item = &'t NodeType>, weights: &Weights) -> Self {
        let mut map: BTreeMap<NodeAddress, f64> = node_types
            .into_iter()
            .map(|t| (t.prefix.clone(), t.default_weight))
            .collect();
        map.extend(weights.node_weights().map(|(a, w)| (a.clone(), w)));
        Self { weights: map }
    }

    /// Evaluator over explicit weights only.
    #[must_use]
    pub fn from_weights(weights: &Weights) -> Self {
        Self {
            weights: weights.node_map().clone(),
        }
    }

    /// Product of the weights of every matching prefix.
    #[must_use]
    pub fn evaluate(&self, address: &NodeAddress) -> f64 {
        address
            .raw_prefixes()
            .filter_map(|prefix| self.weights.get(prefix))
            .product()
    }
}

/// Evaluates edge weights; each direction multiplies independently.
#[derive(Debug, Clone, Default)]
pub struct EdgeWeightEvaluator {
    weights: BTreeMap<EdgeAddress, EdgeWeight>,
}

impl EdgeWeightEvaluator {
    /// Evaluator over type defaults overridden by explicit weights.
    #[must_use]
    pub fn new<'t>(edge_types: impl IntoIterator<Item = &'t EdgeType>, weights: &Weights) -> Self {
        let mut map: BTreeMap<EdgeAddress, EdgeWeight> = edge_types
            .into_iter()
            .map(|t| (t.prefix.clone(), t.default_weight))
            .collect();
        map.extend(weights.edge_weights().map(|(a, w)| (a.clone(), w)));
        Self { weights: map }
    }

    /// Evaluator over explicit weights only.
    #[must_use]
    pub fn from_weights(weights: &Weights) -> Self {
        Self {
            weights: weights.edge_map().clone(),
        }
    }

    #[must_use]
    pub fn evaluate(&self, address: &EdgeAddress) -> EdgeWeight {
        address
            .raw_prefixes()
            .filter_map(|prefix| self.weights.get(prefix))
            .fold(EdgeWeight::new(1.0, 1.0), |acc, w| {
                EdgeWeight::new(acc.forwards * w.forwards, acc.backwards * w.backwards)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn na(parts: &[&str]) -> NodeAddress {
        NodeAddress::from_parts(parts).expect("node address")
    }

    fn ea(parts: &[&str]) -> EdgeAddress {
        EdgeAddress::from_parts(parts).expect("edge address")
    }

    fn node_type(prefix: &[&str], weight: f64) -> NodeType {
        NodeType {
            name: prefix.join("/"),
            plural_name: format!("{}s", prefix.join("/")),
            prefix: na(prefix),
            default_weight: weight,
            description: String::new(),
        }
    }

    #[test]
    fn unmatched_address_weighs_one() {
        let evaluator = NodeWeightEvaluator::from_weights(&Weights::new());
        assert_eq!(evaluator.evaluate(&na(&["anything"])), 1.0);
        let evaluator = EdgeWeightEvaluator::from_weights(&Weights::new());
        assert_eq!(evaluator.evaluate(&ea(&["e"])), EdgeWeight::new(1.0, 1.0));
    }

    #[test]
    fn matching_type_defaults_multiply() {
        let types = [node_type(&["foo"], 2.0), node_type(&["foo", "bar"], 3.0)];
        let evaluator = NodeWeightEvaluator::new(&types, &Weights::new());
        assert_eq!(evaluator.evaluate(&na(&["foo", "bar", "baz"])), 6.0);
        assert_eq!(evaluator.evaluate(&na(&["foo", "qux"])), 2.0);
        assert_eq!(evaluator.evaluate(&na(&["foobar"])), 1.0);
    }

    #[test]
    fn override_replaces_type_default_for_its_prefix() {
        let types = [node_type(&["foo"], 2.0), node_type(&["foo", "bar"], 3.0)];
        let mut weights = Weights::new();
        weights.set_node_weight(na(&["foo"]), 3.0).expect("set");
        let evaluator = NodeWeightEvaluator::new(&types, &weights);
        assert_eq!(evaluator.evaluate(&na(&["foo", "bar", "baz"])), 9.0);
    }

    #[test]
    fn exact_address_override_applies() {
        let mut weights = Weights::new();
        weights.set_node_weight(na(&["foo"]), 2.0).expect("set");
        weights.set_node_weight(na(&["foo", "1"]), 0.5).expect("set");
        let evaluator = NodeWeightEvaluator::from_weights(&weights);
        assert_eq!(evaluator.evaluate(&na(&["foo", "1"])), 1.0);
        assert_eq!(evaluator.evaluate(&na(&["foo", "2"])), 2.0);
    }

    #[test]
    fn edge_directions_multiply_independently() {
        let types = [EdgeType {
            forward_name: "references".to_string(),
            backward_name: "is referenced by".to_string(),
            prefix: ea(&["ref"]),
            default_weight: EdgeWeight::new(2.0, 0.5),
            description: String::new(),
        }];
        let mut weights = Weights::new();
        weights
            .set_edge_weight(ea(&["ref", "strong"]), EdgeWeight::new(3.0, 0.0))
            .expect("set");
        let evaluator = EdgeWeightEvaluator::new(&types, &weights);
        assert_eq!(
            evaluator.evaluate(&ea(&["ref", "strong", "1"])),
            EdgeWeight::new(6.0, 0.0)
        );
        assert_eq!(
            evaluator.evaluate(&ea(&["ref", "weak"])),
            EdgeWeight::new(2.0, 0.5)
        );
    }
}
