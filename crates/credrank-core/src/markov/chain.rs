//! # Sparse Markov Chain
//!
//! Column-stochastic sparse transition matrix.
//!
//! Column `j` lists, in ascending order, every node `neighbors[k]` that can
//! step into `j`, with `weights[k]` the probability of that step. A
//! matrix-vector product therefore visits each column's entries in a fixed
//! order, which fixes the floating-point summation order.

use super::process_graph::MarkovProcessGraph;
use crate::address::NodeAddress;
use crate::primitives::ROW_SUM_TOLERANCE;
use crate::CredError;
use std::collections::BTreeMap;

/// Incoming transitions of one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseColumn {
    pub neighbors: Vec<u32>,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseMarkovChain {
    pub columns: Vec<SparseColumn>,
}

impl SparseMarkovChain {
    /// Number of states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn from_incoming(incoming: Vec<BTreeMap<u32, f64>>) -> Self {
        Self {
            columns: incoming
                .into_iter()
                .map(|column| {
                    let (neighbors, weights) = column.into_iter().unzip();
                    SparseColumn { neighbors, weights }
                })
                .collect(),
        }
    }
}

fn state_index(i: usize) -> Result<u32, CredError> {
    u32::try_from(i).map_err(|_| CredError::Parameter(format!("too many states: {}", i)))
}

/// Build a chain from a dense row-stochastic matrix (row = from, column = to).
pub fn sparse_markov_chain_from_transition_matrix(
    matrix: &[Vec<f64>],
) -> Result<SparseMarkovChain, CredError> {
    let n = matrix.len();
    let mut incoming: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); n];
    for (i, row) in matrix.iter().enumerate() {
        if row.len() != n {
            return Err(CredError::Parameter(format!(
                "transition matrix row {} has {} entries, expected {}",
                i,
                row.len(),
                n
            )));
        }
        let mut sum = 0.0;
        for (j, &p) in row.iter().enumerate() {
            if !p.is_finite() || p < 0.0 {
                return Err(CredError::Parameter(format!(
                    "invalid transition probability {} at ({}, {})",
                    p, i, j
                )));
            }
            sum += p;
            if p != 0.0
                && let Some(column) = incoming.get_mut(j)
            {
                column.insert(state_index(i)?, p);
            }
        }
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(CredError::Parameter(format!(
                "transition matrix row {} sums to {}",
                i, sum
            )));
        }
    }
    Ok(SparseMarkovChain::from_incoming(incoming))
}

/// A chain together with the node address of each state.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedSparseMarkovChain {
    pub node_order: Vec<NodeAddress>,
    pub chain: SparseMarkovChain,
}

impl OrderedSparseMarkovChain {
    /// Convert an MPG in canonical node order.
    ///
    /// Each node's row is renormalized after adding `synthetic_loop_weight`
    /// to its self-transition. Parallel transitions between the same pair of
    /// nodes are summed.
    pub fn from_process_graph(
        mpg: &MarkovProcessGraph,
        synthetic_loop_weight: f64,
    ) -> Result<Self, CredError> {
        if !synthetic_loop_weight.is_finite() || synthetic_loop_weight < 0.0 {
            return Err(CredError::Parameter(format!(
                "synthetic loop weight must be finite and non-negative, got {}",
                synthetic_loop_weight
            )));
        }
        let node_order = mpg.node_order();
        let index: BTreeMap<&NodeAddress, u32> = node_order
            .iter()
            .enumerate()
            .map(|(i, a)| state_index(i).map(|i| (a, i)))
            .collect::<Result<_, _>>()?;
        let lookup = |address: &NodeAddress| {
            index.get(address).copied().ok_or_else(|| {
                CredError::Invariant(format!("markov edge references unknown node {}", address))
            })
        };

        let mut out_weight = vec![synthetic_loop_weight; node_order.len()];
        for edge in mpg.edges() {
            if let Some(total) = out_weight.get_mut(lookup(&edge.src)? as usize) {
                *total += edge.transition_probability;
            }
        }
        let out_weight_of = |i: u32| out_weight.get(i as usize).copied().unwrap_or_default();

        let mut incoming: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); node_order.len()];
        for (i, column) in incoming.iter_mut().enumerate() {
            let i = state_index(i)?;
            let total = out_weight_of(i);
            if total <= 0.0 {
                return Err(CredError::Invariant(format!(
                    "node {} has no outgoing weight",
                    i
                )));
            }
            if synthetic_loop_weight > 0.0 {
                column.insert(i, synthetic_loop_weight / total);
            }
        }
        for edge in mpg.edges() {
            let src = lookup(&edge.src)?;
            let dst = lookup(&edge.dst)?;
            let p = edge.transition_probability / out_weight_of(src);
            if let Some(column) = incoming.get_mut(dst as usize) {
                *column.entry(src).or_default() += p;
            }
        }

        Ok(Self {
            node_order,
            chain: SparseMarkovChain::from_incoming(incoming),
        })
    }
}
