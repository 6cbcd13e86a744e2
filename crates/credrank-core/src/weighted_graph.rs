//! # Weighted Graph
//!
//! A contribution graph paired with its weights. This is the unit the
//! scoring pipeline consumes and the unit the binary snapshot persists.

use crate::graph::{Graph, GraphJson};
use crate::weights::{Weights, WeightsJson};
use crate::CredError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightedGraph {
    pub graph: Graph,
    pub weights: Weights,
}

impl WeightedGraph {
    #[must_use]
    pub fn new(graph: Graph, weights: Weights) -> Self {
        Self { graph, weights }
    }

    /// Merge graphs and weights. Overlapping weight entries must be equal.
    pub fn merge<'w>(all: impl IntoIterator<Item = &'w WeightedGraph>) -> Result<Self, CredError> {
        let all: Vec<&WeightedGraph> = all.into_iter().collect();
        Ok(Self {
            graph: Graph::merge(all.iter().map(|w| &w.graph))?,
            weights: Weights::merge(all.iter().map(|w| &w.weights))?,
        })
    }

    #[must_use]
    pub fn to_json(&self) -> WeightedGraphJson {
        WeightedGraphJson {
            graph: self.graph.to_json(),
            weights: self.weights.to_json(),
        }
    }

    pub fn from_json(json: &WeightedGraphJson) -> Result<Self, CredError> {
        Ok(Self {
            graph: Graph::from_json(&json.graph)?,
            weights: Weights::from_json(&json.weights)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedGraphJson {
    pub graph: GraphJson,
    pub weights: WeightsJson,
}
