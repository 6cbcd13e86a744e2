//! # Cred Graph
//!
//! A Markov process graph bound to its stationary distribution.
//!
//! A node's cred is its stationary score. An edge's cred flow is the score
//! of its source times its transition probability. A participant's cred is
//! the flow over the payout edges of its epochs.

use crate::address::{EdgeAddress, NodeAddress};
use crate::interval::TimeBoundary;
use crate::markov::process_graph::{
    MarkovEdge, MarkovNode, MarkovProcessGraph, MarkovProcessGraphJson, markov_edge_address,
    payout_address,
};
use crate::plugin::Participant;
use crate::CredError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// An MPG node with its cred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredNode<'a> {
    pub node: &'a MarkovNode,
    pub cred: f64,
}

/// An MPG edge with the cred flowing over it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEdge<'a> {
    pub edge: &'a MarkovEdge,
    pub cred_flow: f64,
}

/// Cred of one participant, per epoch in boundary order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantCred {
    pub address: NodeAddress,
    pub description: String,
    pub id: Uuid,
    pub cred: f64,
    pub cred_per_epoch: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CredGraph {
    mpg: MarkovProcessGraph,
    scores: BTreeMap<NodeAddress, f64>,
}

impl CredGraph {
    /// Bind `scores`, given in `node_order`, to `mpg`.
    ///
    /// `node_order` must be the MPG's canonical order.
    pub fn new(
        mpg: MarkovProcessGraph,
        node_order: &[NodeAddress],
        scores: Vec<f64>,
    ) -> Result<Self, CredError> {
        let expected = mpg.node_order();
        if expected.as_slice() != node_order {
            return Err(CredError::Invariant(
                "score order does not match markov process graph node order".to_string(),
            ));
        }
        if scores.len() != expected.len() {
            return Err(CredError::Invariant(format!(
                "{} scores for {} nodes",
                scores.len(),
                expected.len()
            )));
        }
        Ok(Self {
            scores: expected.into_iter().zip(scores).collect(),
            mpg,
        })
    }

    #[must_use]
    pub fn mpg(&self) -> &MarkovProcessGraph {
        &self.mpg
    }

    fn score(&self, address: &NodeAddress) -> f64 {
        self.scores.get(address).copied().unwrap_or_default()
    }

    fn scored_edge<'a>(&self, edge: &'a MarkovEdge) -> ScoredEdge<'a> {
        ScoredEdge {
            edge,
            cred_flow: self.score(&edge.src) * edge.transition_probability,
        }
    }

    #[must_use]
    pub fn node(&self, address: &NodeAddress) -> Option<ScoredNode<'_>> {
        self.mpg.node(address).map(|node| ScoredNode {
            node,
            cred: self.score(address),
        })
    }

    /// Nodes in canonical order.
    pub fn nodes(&self) -> impl Iterator<Item = ScoredNode<'_>> {
        self.mpg.nodes().map(|node| ScoredNode {
            node,
            cred: self.score(&node.address),
        })
    }

    /// Lookup by markov address.
    #[must_use]
    pub fn edge(&self, markov_address: &EdgeAddress) -> Option<ScoredEdge<'_>> {
        self.mpg.edge(markov_address).map(|edge| self.scored_edge(edge))
    }

    pub fn edges(&self) -> impl Iterator<Item = ScoredEdge<'_>> {
        self.mpg.edges().map(|edge| self.scored_edge(edge))
    }

    /// Scored transitions into `address`.
    pub fn in_neighbors<'a>(
        &'a self,
        address: &'a NodeAddress,
    ) -> Result<impl Iterator<Item = ScoredEdge<'a>>, CredError> {
        if self.mpg.node(address).is_none() {
            return Err(CredError::MissingReference(format!(
                "node not in cred graph: {}",
                address
            )));
        }
        Ok(self
            .mpg
            .in_edges(address)
            .map(move |edge| self.scored_edge(edge)))
    }

    /// Every participant with per-epoch payout flow, in participant order.
    pub fn participants<'a>(
        &'a self,
    ) -> impl Iterator<Item = Result<ParticipantCred, CredError>> + use<'a> {
        let boundaries = self.mpg.epoch_boundaries();
        self.mpg
            .participants()
            .iter()
            .map(move |participant| self.participant_cred(participant, &boundaries))
    }

    fn participant_cred(
        &self,
        participant: &Participant,
        boundaries: &[TimeBoundary],
    ) -> Result<ParticipantCred, CredError> {
        let mut cred_per_epoch = Vec::with_capacity(boundaries.len());
        for &boundary in boundaries {
            let payout = markov_edge_address(&payout_address(participant.id, boundary)?, false)?;
            let flow = self
                .edge(&payout)
                .map(|e| e.cred_flow)
                .ok_or_else(|| CredError::Invariant(format!("missing payout edge {}", payout)))?;
            cred_per_epoch.push(flow);
        }
        Ok(ParticipantCred {
            address: participant.address.clone(),
            description: participant.description.clone(),
            id: participant.id,
            cred: cred_per_epoch.iter().sum(),
            cred_per_epoch,
        })
    }

    #[must_use]
    pub fn to_json(&self) -> CredGraphJson {
        CredGraphJson {
            mpg: self.mpg.to_json(),
            scores: self.scores.values().copied().collect(),
        }
    }

    pub fn from_json(json: &CredGraphJson) -> Result<Self, CredError> {
        let mpg = MarkovProcessGraph::from_json(&json.mpg)?;
        let order = mpg.node_order();
        Self::new(mpg, &order, json.scores.clone())
    }
}

/// JSON form: the MPG and its scores in canonical node order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredGraphJson {
    pub mpg: MarkovProcessGraphJson,
    pub scores: Vec<f64>,
}
