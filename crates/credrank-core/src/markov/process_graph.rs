//! # Markov Process Graph
//!
//! The time-expanded transition system the random walk runs on.
//!
//! ## Node kinds
//!
//! - **Contributions**: timeful source nodes that are not participants. Each
//!   carries `mint`, its evaluated node weight.
//! - **Seed**: mints into contributions proportionally to `mint`; all
//!   radiation returns to it.
//! - **Epochs**: one per participant per boundary of
//!   `[-inf, start_0, ..., start_{n-1}, +inf]`. Participants themselves are
//!   never MPG nodes.
//! - **Accumulators**: one per boundary, absorbing epoch payouts.
//!
//! ## Transition budget
//!
//! | from         | edge                      | probability                    |
//! |--------------|---------------------------|--------------------------------|
//! | seed         | mint                      | `mint_i / sum(mint)`           |
//! | contribution | radiation                 | `alpha`                        |
//! | contribution | organic                   | `(1 - alpha) * w / out`        |
//! | epoch        | payout                    | `beta`                         |
//! | epoch        | webbing (next / previous) | `gamma_f` / `gamma_b`          |
//! | epoch        | organic                   | `available * w / out`          |
//! | epoch        | radiation                 | whatever closes the row        |
//! | accumulator  | radiation                 | `1`                            |
//!
//! where `available = 1 - alpha - beta - gamma_f[has next] - gamma_b[has prev]`.
//! A contribution with no organic out-flow keeps its `1 - alpha` on a
//! synthetic self-loop. With zero total mint the seed loops onto itself.

use crate::address::{EdgeAddress, NodeAddress};
use crate::graph::EdgesOptions;
use crate::interval::{Interval, TimeBoundary, validate_intervals};
use crate::plugin::Participant;
use crate::primitives::{CORE_MODULE, CORE_NAMESPACE, ROW_SUM_TOLERANCE};
use crate::weight_evaluator::{EdgeWeightEvaluator, NodeWeightEvaluator};
use crate::weighted_graph::WeightedGraph;
use crate::CredError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// =============================================================================
// RESERVED ADDRESSES
// =============================================================================

const SEED: &str = "SEED";
const ACCUMULATOR: &str = "ACCUMULATOR";
const PARTICIPANT_EPOCH: &str = "PARTICIPANT_EPOCH";
const SEED_MINT: &str = "SEED_MINT";
const SEED_LOOP: &str = "SEED_LOOP";
const CONTRIBUTION_RADIATION: &str = "CONTRIBUTION_RADIATION";
const CONTRIBUTION_SYNTHETIC_LOOP: &str = "CONTRIBUTION_SYNTHETIC_LOOP";
const EPOCH_RADIATION: &str = "EPOCH_RADIATION";
const EPOCH_PAYOUT: &str = "EPOCH_PAYOUT";
const EPOCH_WEBBING: &str = "EPOCH_WEBBING";
const ACCUMULATOR_RADIATION: &str = "ACCUMULATOR_RADIATION";

const FORWARD: &str = "F";
const BACKWARD: &str = "B";

fn core_node<S: AsRef<str>>(parts: impl IntoIterator<Item = S>) -> Result<NodeAddress, CredError> {
    NodeAddress::from_parts([CORE_NAMESPACE, CORE_MODULE])?.append(parts)
}

fn core_edge<S: AsRef<str>>(parts: impl IntoIterator<Item = S>) -> Result<EdgeAddress, CredError> {
    EdgeAddress::from_parts([CORE_NAMESPACE, CORE_MODULE])?.append(parts)
}

/// The unique seed node.
pub fn seed_address() -> Result<NodeAddress, CredError> {
    core_node([SEED])
}

/// The accumulator of the epoch starting at `boundary`.
pub fn accumulator_address(boundary: TimeBoundary) -> Result<NodeAddress, CredError> {
    core_node([ACCUMULATOR.to_string(), boundary.to_string()])
}

/// The epoch of participant `id` starting at `boundary`.
pub fn epoch_address(id: Uuid, boundary: TimeBoundary) -> Result<NodeAddress, CredError> {
    core_node([PARTICIPANT_EPOCH.to_string(), id.to_string(), boundary.to_string()])
}

/// The payout edge of the epoch of `id` starting at `boundary`.
pub fn payout_address(id: Uuid, boundary: TimeBoundary) -> Result<EdgeAddress, CredError> {
    core_edge([EPOCH_PAYOUT.to_string(), id.to_string(), boundary.to_string()])
}

/// Markov address of the transition over `address`, against it if `reversed`.
pub fn markov_edge_address(address: &EdgeAddress, reversed: bool) -> Result<EdgeAddress, CredError> {
    let direction = if reversed { BACKWARD } else { FORWARD };
    Ok(EdgeAddress::from_parts([direction])?.append_address(address))
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Fixed transition probabilities of the MPG machinery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionProbabilities {
    pub alpha: f64,
    pub beta: f64,
    pub gamma_forward: f64,
    pub gamma_backward: f64,
}

impl TransitionProbabilities {
    /// Each value in `[0, 1]` and their sum at most 1.
    pub fn validate(&self) -> Result<(), CredError> {
        let named = [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gammaForward", self.gamma_forward),
            ("gammaBackward", self.gamma_backward),
        ];
        for (name, value) in named {
            if value.is_nan() || value < 0.0 {
                return Err(CredError::Parameter(format!(
                    "Invalid transition probability: {} = {}",
                    name, value
                )));
            }
            if value > 1.0 {
                return Err(CredError::Parameter(format!(
                    "Overlarge transition probability: {} = {}",
                    name, value
                )));
            }
        }
        let sum = self.alpha + self.beta + self.gamma_forward + self.gamma_backward;
        if sum > 1.0 + ROW_SUM_TOLERANCE {
            return Err(CredError::Parameter(format!(
                "Overlarge transition probability: alpha + beta + gammaForward + gammaBackward = {}",
                sum
            )));
        }
        Ok(())
    }

    /// Organic budget of an epoch given which webbing neighbors it has.
    fn epoch_available(&self, has_prev: bool, has_next: bool) -> f64 {
        let mut available = 1.0 - self.alpha - self.beta;
        if has_next {
            available -= self.gamma_forward;
        }
        if has_prev {
            available -= self.gamma_backward;
        }
        available.max(0.0)
    }
}

// =============================================================================
// NODES AND EDGES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkovNode {
    pub address: NodeAddress,
    pub description: String,
    /// Mass the seed mints into this node. Zero for machinery nodes.
    pub mint: f64,
}

/// A transition of the MPG.
///
/// `address` is the underlying edge; `reversed` marks a transition that runs
/// against it (`src`/`dst` here are already the transition's endpoints).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkovEdge {
    pub address: EdgeAddress,
    pub reversed: bool,
    pub src: NodeAddress,
    pub dst: NodeAddress,
    pub transition_probability: f64,
}

impl MarkovEdge {
    /// Unique key: `F` or `B` followed by the underlying address parts.
    pub fn markov_address(&self) -> Result<EdgeAddress, CredError> {
        markov_edge_address(&self.address, self.reversed)
    }
}

// =============================================================================
// MARKOV PROCESS GRAPH
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MarkovProcessGraph {
    nodes: BTreeMap<NodeAddress, MarkovNode>,
    /// Keyed by markov address.
    edges: BTreeMap<EdgeAddress, MarkovEdge>,
    participants: Vec<Participant>,
    intervals: Vec<Interval>,
    parameters: TransitionProbabilities,
}

struct OrganicEdge<'a> {
    address: &'a EdgeAddress,
    src: NodeAddress,
    dst: NodeAddress,
    forwards: f64,
    backwards: f64,
}

impl MarkovProcessGraph {
    /// Build the MPG of `weighted`, expanding `participants` over `intervals`.
    pub fn new(
        weighted: &WeightedGraph,
        participants: &[Participant],
        intervals: &[Interval],
        parameters: &TransitionProbabilities,
    ) -> Result<Self, CredError> {
        parameters.validate()?;
        validate_intervals(intervals)?;

        let mut by_address: BTreeMap<&NodeAddress, &Participant> = BTreeMap::new();
        for participant in participants {
            if by_address.insert(&participant.address, participant).is_some() {
                return Err(CredError::Parameter(format!(
                    "participant listed twice: {}",
                    participant.address
                )));
            }
        }

        let mut mpg = Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            participants: participants.to_vec(),
            intervals: intervals.to_vec(),
            parameters: *parameters,
        };
        let alpha = parameters.alpha;
        let boundaries = TimeBoundary::epoch_boundaries(intervals);
        let node_evaluator = NodeWeightEvaluator::from_weights(&weighted.weights);
        let edge_evaluator = EdgeWeightEvaluator::from_weights(&weighted.weights);

        // Contributions
        let mut contributions: Vec<NodeAddress> = Vec::new();
        for node in weighted.graph.nodes() {
            if node.timestamp_ms.is_none() || by_address.contains_key(&node.address) {
                continue;
            }
            mpg.add_node(MarkovNode {
                address: node.address.clone(),
                description: node.description.clone(),
                mint: node_evaluator.evaluate(&node.address),
            })?;
            contributions.push(node.address.clone());
        }

        // Seed
        let seed = seed_address()?;
        mpg.add_node(MarkovNode {
            address: seed.clone(),
            description: "Seed".to_string(),
            mint: 0.0,
        })?;

        // Accumulators
        for &boundary in &boundaries {
            let accumulator = accumulator_address(boundary)?;
            mpg.add_node(MarkovNode {
                address: accumulator.clone(),
                description: format!("Epoch accumulator starting {}", boundary),
                mint: 0.0,
            })?;
            mpg.add_edge(MarkovEdge {
                address: core_edge([ACCUMULATOR_RADIATION.to_string(), boundary.to_string()])?,
                reversed: false,
                src: accumulator,
                dst: seed.clone(),
                transition_probability: 1.0,
            })?;
        }

        // Epochs
        for participant in participants {
            for &boundary in &boundaries {
                mpg.add_node(MarkovNode {
                    address: epoch_address(participant.id, boundary)?,
                    description: format!(
                        "Participant epoch for {} starting {}",
                        participant.description, boundary
                    ),
                    mint: 0.0,
                })?;
            }
        }

        // Organic edges, with endpoints rewritten onto epochs
        let resolve = |address: &NodeAddress, timestamp_ms| -> Result<Option<NodeAddress>, CredError> {
            if let Some(participant) = by_address.get(address) {
                let index = TimeBoundary::epoch_index(intervals, timestamp_ms);
                let boundary = boundaries
                    .get(index)
                    .copied()
                    .unwrap_or(TimeBoundary::PosInfinity);
                return epoch_address(participant.id, boundary).map(Some);
            }
            Ok(Some(address.clone()).filter(|a| mpg.nodes.contains_key(a)))
        };
        let mut organic: Vec<OrganicEdge<'_>> = Vec::new();
        let mut elided = 0usize;
        for edge in weighted.graph.edges(&EdgesOptions::all()) {
            let weight = edge_evaluator.evaluate(&edge.address);
            if weight.is_zero() {
                elided += 1;
                continue;
            }
            let (Some(src), Some(dst)) = (
                resolve(&edge.src, edge.timestamp_ms)?,
                resolve(&edge.dst, edge.timestamp_ms)?,
            ) else {
                continue;
            };
            organic.push(OrganicEdge {
                address: &edge.address,
                src,
                dst,
                forwards: weight.forwards,
                backwards: weight.backwards,
            });
        }

        let mut out_weight: BTreeMap<&NodeAddress, f64> = BTreeMap::new();
        for edge in &organic {
            *out_weight.entry(&edge.src).or_default() += edge.forwards;
            *out_weight.entry(&edge.dst).or_default() += edge.backwards;
        }

        let mut available: BTreeMap<NodeAddress, f64> = contributions
            .iter()
            .map(|c| (c.clone(), 1.0 - alpha))
            .collect();
        let last = boundaries.len().saturating_sub(1);
        for participant in participants {
            for (i, &boundary) in boundaries.iter().enumerate() {
                available.insert(
                    epoch_address(participant.id, boundary)?,
                    parameters.epoch_available(i > 0, i < last),
                );
            }
        }

        let probability = |node: &NodeAddress, weight: f64| -> f64 {
            let total = out_weight.get(node).copied().unwrap_or_default();
            let budget = available.get(node).copied().unwrap_or_default();
            if total > 0.0 { budget * weight / total } else { 0.0 }
        };
        let mut organic_edges = Vec::new();
        for edge in &organic {
            if edge.forwards > 0.0 {
                organic_edges.push(MarkovEdge {
                    address: edge.address.clone(),
                    reversed: false,
                    src: edge.src.clone(),
                    dst: edge.dst.clone(),
                    transition_probability: probability(&edge.src, edge.forwards),
                });
            }
            if edge.backwards > 0.0 {
                organic_edges.push(MarkovEdge {
                    address: edge.address.clone(),
                    reversed: true,
                    src: edge.dst.clone(),
                    dst: edge.src.clone(),
                    transition_probability: probability(&edge.dst, edge.backwards),
                });
            }
        }
        let flowing: BTreeSet<NodeAddress> = organic_edges
            .iter()
            .filter(|e| e.transition_probability > 0.0)
            .map(|e| e.src.clone())
            .collect();
        let organic_count = organic_edges.len();
        for edge in organic_edges {
            mpg.add_edge(edge)?;
        }

        // Seed mint or seed loop
        let total_mint: f64 = contributions
            .iter()
            .filter_map(|c| mpg.nodes.get(c))
            .map(|n| n.mint)
            .sum();
        if total_mint > 0.0 {
            let mut mint_edges = Vec::new();
            for contribution in &contributions {
                let mint = mpg.nodes.get(contribution).map_or(0.0, |n| n.mint);
                if mint > 0.0 {
                    mint_edges.push(MarkovEdge {
                        address: core_edge([SEED_MINT])?.append_address(contribution),
                        reversed: false,
                        src: seed.clone(),
                        dst: contribution.clone(),
                        transition_probability: mint / total_mint,
                    });
                }
            }
            for edge in mint_edges {
                mpg.add_edge(edge)?;
            }
        } else {
            mpg.add_edge(MarkovEdge {
                address: core_edge([SEED_LOOP])?,
                reversed: false,
                src: seed.clone(),
                dst: seed.clone(),
                transition_probability: 1.0,
            })?;
        }

        // Contribution radiation and synthetic loops
        for contribution in &contributions {
            mpg.add_edge(MarkovEdge {
                address: core_edge([CONTRIBUTION_RADIATION])?.append_address(contribution),
                reversed: false,
                src: contribution.clone(),
                dst: seed.clone(),
                transition_probability: alpha,
            })?;
            if !flowing.contains(contribution) {
                mpg.add_edge(MarkovEdge {
                    address: core_edge([CONTRIBUTION_SYNTHETIC_LOOP])?.append_address(contribution),
                    reversed: false,
                    src: contribution.clone(),
                    dst: contribution.clone(),
                    transition_probability: 1.0 - alpha,
                })?;
            }
        }

        // Epoch payout and webbing
        for participant in participants {
            let id = participant.id.to_string();
            for (i, &boundary) in boundaries.iter().enumerate() {
                let epoch = epoch_address(participant.id, boundary)?;
                mpg.add_edge(MarkovEdge {
                    address: payout_address(participant.id, boundary)?,
                    reversed: false,
                    src: epoch.clone(),
                    dst: accumulator_address(boundary)?,
                    transition_probability: parameters.beta,
                })?;
                if let Some(&previous) = i.checked_sub(1).and_then(|p| boundaries.get(p)) {
                    let previous_epoch = epoch_address(participant.id, previous)?;
                    let webbing = core_edge([
                        EPOCH_WEBBING.to_string(),
                        id.clone(),
                        previous.to_string(),
                        boundary.to_string(),
                    ])?;
                    mpg.add_edge(MarkovEdge {
                        address: webbing.clone(),
                        reversed: false,
                        src: previous_epoch.clone(),
                        dst: epoch.clone(),
                        transition_probability: parameters.gamma_forward,
                    })?;
                    mpg.add_edge(MarkovEdge {
                        address: webbing,
                        reversed: true,
                        src: epoch.clone(),
                        dst: previous_epoch,
                        transition_probability: parameters.gamma_backward,
                    })?;
                }
            }
        }

        // Radiation closes each epoch row once every other edge is in place.
        let mut used: BTreeMap<NodeAddress, f64> = BTreeMap::new();
        for edge in mpg.edges.values() {
            *used.entry(edge.src.clone()).or_default() += edge.transition_probability;
        }
        for participant in participants {
            let id = participant.id.to_string();
            for &boundary in &boundaries {
                let epoch = epoch_address(participant.id, boundary)?;
                let spent = used.get(&epoch).copied().unwrap_or_default();
                mpg.add_edge(MarkovEdge {
                    address: core_edge([EPOCH_RADIATION.to_string(), id.clone(), boundary.to_string()])?,
                    reversed: false,
                    src: epoch,
                    dst: seed.clone(),
                    transition_probability: (1.0 - spent).max(0.0),
                })?;
            }
        }

        mpg.check_transition_probabilities()?;
        tracing::info!(
            "markov process graph: {} nodes, {} edges ({} organic, {} zero-weight elided), {} participants, {} intervals",
            mpg.nodes.len(),
            mpg.edges.len(),
            organic_count,
            elided,
            participants.len(),
            intervals.len()
        );
        Ok(mpg)
    }

    fn add_node(&mut self, node: MarkovNode) -> Result<(), CredError> {
        if self.nodes.contains_key(&node.address) {
            return Err(CredError::Conflict(format!(
                "duplicate markov node {}",
                node.address
            )));
        }
        self.nodes.insert(node.address.clone(), node);
        Ok(())
    }

    fn add_edge(&mut self, edge: MarkovEdge) -> Result<(), CredError> {
        let key = edge.markov_address()?;
        if self.edges.contains_key(&key) {
            return Err(CredError::Conflict(format!("duplicate markov edge {}", key)));
        }
        self.edges.insert(key, edge);
        Ok(())
    }

    /// Every row sums to 1 and every probability lies in `[0, 1]`.
    pub fn check_transition_probabilities(&self) -> Result<(), CredError> {
        let mut row_sums: BTreeMap<&NodeAddress, f64> =
            self.nodes.keys().map(|a| (a, 0.0)).collect();
        for (key, edge) in &self.edges {
            let p = edge.transition_probability;
            if !(0.0..=1.0).contains(&p) {
                return Err(CredError::Invariant(format!(
                    "transition probability {} out of range on {}",
                    p, key
                )));
            }
            if !self.nodes.contains_key(&edge.dst) {
                return Err(CredError::Invariant(format!(
                    "markov edge {} ends at unknown node {}",
                    key, edge.dst
                )));
            }
            match row_sums.get_mut(&edge.src) {
                Some(sum) => *sum += p,
                None => {
                    return Err(CredError::Invariant(format!(
                        "markov edge {} starts at unknown node {}",
                        key, edge.src
                    )));
                }
            }
        }
        if let Some((node, sum)) = row_sums
            .iter()
            .find(|(_, sum)| (**sum - 1.0).abs() > ROW_SUM_TOLERANCE)
        {
            return Err(CredError::Invariant(format!(
                "outgoing transition probabilities of {} sum to {}",
                node, sum
            )));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Nodes in canonical (address) order.
    pub fn nodes(&self) -> impl Iterator<Item = &MarkovNode> {
        self.nodes.values()
    }

    #[must_use]
    pub fn node(&self, address: &NodeAddress) -> Option<&MarkovNode> {
        self.nodes.get(address)
    }

    /// Canonical node order.
    #[must_use]
    pub fn node_order(&self) -> Vec<NodeAddress> {
        self.nodes.keys().cloned().collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Edges in markov-address order.
    pub fn edges(&self) -> impl Iterator<Item = &MarkovEdge> {
        self.edges.values()
    }

    /// Lookup by markov address.
    #[must_use]
    pub fn edge(&self, markov_address: &EdgeAddress) -> Option<&MarkovEdge> {
        self.edges.get(markov_address)
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Transitions ending at `address`, in markov-address order.
    pub fn in_edges<'a>(&'a self, address: &'a NodeAddress) -> impl Iterator<Item = &'a MarkovEdge> {
        self.edges.values().filter(move |e| &e.dst == address)
    }

    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    #[must_use]
    pub fn epoch_boundaries(&self) -> Vec<TimeBoundary> {
        TimeBoundary::epoch_boundaries(&self.intervals)
    }

    #[must_use]
    pub fn parameters(&self) -> &TransitionProbabilities {
        &self.parameters
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn to_json(&self) -> MarkovProcessGraphJson {
        MarkovProcessGraphJson {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
            participants: self.participants.clone(),
            intervals: self.intervals.clone(),
            parameters: self.parameters,
        }
    }

    /// Rebuild and re-check an MPG.
    pub fn from_json(json: &MarkovProcessGraphJson) -> Result<Self, CredError> {
        json.parameters.validate()?;
        validate_intervals(&json.intervals)?;
        let mut mpg = Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            participants: json.participants.clone(),
            intervals: json.intervals.clone(),
            parameters: json.parameters,
        };
        for node in &json.nodes {
            mpg.add_node(node.clone())?;
        }
        for edge in &json.edges {
            mpg.add_edge(edge.clone())?;
        }
        mpg.check_transition_probabilities()?;
        Ok(mpg)
    }
}

/// JSON form. Canonical node order is the order of `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkovProcessGraphJson {
    pub nodes: Vec<MarkovNode>,
    pub edges: Vec<MarkovEdge>,
    pub participants: Vec<Participant>,
    pub intervals: Vec<Interval>,
    pub parameters: TransitionProbabilities,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::interval::fixed_intervals;
    use crate::weights::{EdgeWeight, Weights};
    use crate::{Edge, Node};

    fn na(parts: &[&str]) -> NodeAddress {
        NodeAddress::from_parts(parts).expect("address")
    }

    fn ea(parts: &[&str]) -> EdgeAddress {
        EdgeAddress::from_parts(parts).expect("edge")
    }

    fn params(alpha: f64, beta: f64, gamma_forward: f64, gamma_backward: f64) -> TransitionProbabilities {
        TransitionProbabilities {
            alpha,
            beta,
            gamma_forward,
            gamma_backward,
        }
    }

    fn two_contribution_graph() -> (WeightedGraph, Vec<Participant>) {
        let mut graph = Graph::new();
        graph.add_node(Node::new(na(&["c0"]), "c0", 0)).expect("add");
        graph.add_node(Node::new(na(&["c1"]), "c1", 2)).expect("add");
        graph.add_node(Node::timeless(na(&["p"]), "p")).expect("add");
        let mut weights = Weights::new();
        weights.set_node_weight(na(&["c0"]), 1.0).expect("weight");
        weights.set_node_weight(na(&["c1"]), 2.0).expect("weight");
        for (name, src, dst, t, f, b) in [
            ("e0", "c0", "p", 0, 1.0, 0.0),
            ("e1", "c1", "p", 2, 2.0, 1.0),
            ("e2", "c0", "c1", 0, 1.0, 1.0),
            ("e3", "c0", "c1", 0, 0.0, 0.0),
        ] {
            graph
                .add_edge(Edge::new(ea(&[name]), na(&[src]), na(&[dst]), t))
                .expect("add");
            weights
                .set_edge_weight(ea(&[name]), EdgeWeight::new(f, b))
                .expect("weight");
        }
        let participants = vec![Participant::from_address(na(&["p"]), "p")];
        (WeightedGraph::new(graph, weights), participants)
    }

    fn build() -> MarkovProcessGraph {
        let (weighted, participants) = two_contribution_graph();
        let intervals = fixed_intervals(0, 2, 2, 0).expect("intervals");
        MarkovProcessGraph::new(&weighted, &participants, &intervals, &params(0.2, 0.2, 0.15, 0.1))
            .expect("mpg")
    }

    fn probability(mpg: &MarkovProcessGraph, reversed: bool, address: EdgeAddress) -> f64 {
        let direction = if reversed { BACKWARD } else { FORWARD };
        let key = EdgeAddress::from_parts([direction])
            .expect("direction")
            .append_address(&address);
        mpg.edge(&key).expect("edge present").transition_probability
    }

    #[test]
    fn parameter_validation_messages() {
        let err = params(-0.1, 0.0, 0.0, 0.0).validate().expect_err("negative");
        assert!(err.to_string().contains("Invalid transition probability"));
        let err = params(0.5, 0.5, 0.5, 0.0).validate().expect_err("overlarge");
        assert!(err.to_string().contains("Overlarge transition probability"));
        params(0.2, 0.4, 0.1, 0.1).validate().expect("valid");
    }

    #[test]
    fn seed_mint_and_radiation() {
        let mpg = build();
        let c0 = na(&["c0"]);
        let c1 = na(&["c1"]);
        let seed_to = |c: &NodeAddress| {
            probability(&mpg, false, core_edge([SEED_MINT]).expect("edge").append_address(c))
        };
        assert!((seed_to(&c0) - 1.0 / 3.0).abs() < 1e-12);
        assert!((seed_to(&c1) - 2.0 / 3.0).abs() < 1e-12);
        let radiation = probability(
            &mpg,
            false,
            core_edge([CONTRIBUTION_RADIATION]).expect("edge").append_address(&c0),
        );
        assert!((radiation - 0.2).abs() < 1e-12);
    }

    #[test]
    fn organic_probabilities_use_out_weight() {
        let mpg = build();
        assert!((probability(&mpg, false, ea(&["e2"])) - 0.4).abs() < 1e-12);
        assert!((probability(&mpg, true, ea(&["e2"])) - 0.8 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_edges_elided() {
        let mpg = build();
        assert!(mpg.edges().all(|e| e.address != ea(&["e3"])));
        let e0_count = mpg.edges().filter(|e| e.address == ea(&["e0"])).count();
        assert_eq!(e0_count, 1);
    }

    #[test]
    fn participant_endpoints_become_epochs() {
        let mpg = build();
        let id = mpg.participants()[0].id;
        assert!(mpg.node(&na(&["p"])).is_none());
        let e0 = mpg
            .edges()
            .find(|e| e.address == ea(&["e0"]))
            .expect("e0");
        assert_eq!(e0.dst, epoch_address(id, TimeBoundary::Finite(0)).expect("epoch"));
        let e1_back = mpg
            .edges()
            .find(|e| e.address == ea(&["e1"]) && e.reversed)
            .expect("e1 backward");
        assert_eq!(e1_back.src, epoch_address(id, TimeBoundary::Finite(2)).expect("epoch"));
    }

    #[test]
    fn boundaries_and_accumulators() {
        let mpg = build();
        assert_eq!(
            mpg.epoch_boundaries(),
            vec![
                TimeBoundary::NegInfinity,
                TimeBoundary::Finite(0),
                TimeBoundary::Finite(2),
                TimeBoundary::PosInfinity
            ]
        );
        for boundary in mpg.epoch_boundaries() {
            let radiation = core_edge([ACCUMULATOR_RADIATION.to_string(), boundary.to_string()])
                .expect("edge");
            assert_eq!(probability(&mpg, false, radiation), 1.0);
        }
    }

    #[test]
    fn epoch_radiation_closes_rows() {
        let mpg = build();
        let id = mpg.participants()[0].id;
        let radiation = |boundary: TimeBoundary| {
            probability(
                &mpg,
                false,
                core_edge([EPOCH_RADIATION.to_string(), id.to_string(), boundary.to_string()])
                    .expect("edge"),
            )
        };
        // No organic activity: everything but payout and webbing radiates.
        assert!((radiation(TimeBoundary::NegInfinity) - (1.0 - 0.2 - 0.15)).abs() < 1e-12);
        assert!((radiation(TimeBoundary::Finite(0)) - (1.0 - 0.2 - 0.15 - 0.1)).abs() < 1e-12);
        assert!((radiation(TimeBoundary::PosInfinity) - (1.0 - 0.2 - 0.1)).abs() < 1e-12);
        // Organic out-flow through e1 backwards: radiation is alpha.
        assert!((radiation(TimeBoundary::Finite(2)) - 0.2).abs() < 1e-12);
        mpg.check_transition_probabilities().expect("stochastic");
    }

    #[test]
    fn contribution_without_flow_gets_synthetic_loop() {
        let mut graph = Graph::new();
        graph.add_node(Node::new(na(&["lonely"]), "lonely", 0)).expect("add");
        let weighted = WeightedGraph::new(graph, Weights::new());
        let mpg = MarkovProcessGraph::new(&weighted, &[], &[], &params(0.3, 0.4, 0.1, 0.1))
            .expect("mpg");
        let lonely = na(&["lonely"]);
        let looped = probability(
            &mpg,
            false,
            core_edge([CONTRIBUTION_SYNTHETIC_LOOP]).expect("edge").append_address(&lonely),
        );
        assert!((looped - 0.7).abs() < 1e-12);
    }

    #[test]
    fn zero_mint_seed_loops() {
        let mut graph = Graph::new();
        graph.add_node(Node::new(na(&["c"]), "c", 0)).expect("add");
        let mut weights = Weights::new();
        weights.set_node_weight(na(&["c"]), 0.0).expect("weight");
        let mpg = MarkovProcessGraph::new(
            &WeightedGraph::new(graph, weights),
            &[],
            &[],
            &params(0.2, 0.4, 0.1, 0.1),
        )
        .expect("mpg");
        assert_eq!(probability(&mpg, false, core_edge([SEED_LOOP]).expect("edge")), 1.0);
    }

    #[test]
    fn duplicate_participant_rejected() {
        let (weighted, participants) = two_contribution_graph();
        let doubled = [participants[0].clone(), participants[0].clone()];
        let result = MarkovProcessGraph::new(&weighted, &doubled, &[], &params(0.2, 0.2, 0.1, 0.1));
        assert!(matches!(result, Err(CredError::Parameter(_))));
    }

    #[test]
    fn json_roundtrip() {
        let mpg = build();
        let text = serde_json::to_string(&mpg.to_json()).expect("serialize");
        let json: MarkovProcessGraphJson = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(MarkovProcessGraph::from_json(&json).expect("from json"), mpg);
    }
}
