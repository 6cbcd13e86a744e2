//! # Dependency Mint
//!
//! Synthesizes extra mint for dependencies (projects, teams, infrastructure)
//! as a fraction of everything minted in each interval.
//!
//! For a policy with fraction `w` in force at interval `i`, and `M_i` the
//! total evaluated weight of timeful nodes in `i`, one mint node of weight
//! `w * M_i` is created at the interval start together with an edge carrying
//! its cred to the recipient. The result is a separate weighted subgraph;
//! the input is never modified.

use crate::address::{EdgeAddress, NodeAddress};
use crate::graph::Graph;
use crate::interval::{IntervalLength, bucket_index, graph_intervals};
use crate::plugin::Participant;
use crate::primitives::{CORE_NAMESPACE, DEPENDENCY_MODULE};
use crate::weight_evaluator::NodeWeightEvaluator;
use crate::weighted_graph::WeightedGraph;
use crate::weights::EdgeWeight;
use crate::{CredError, Edge, Node, TimestampMs};
use serde::{Deserialize, Serialize};

const MINT: &str = "MINT";
const MINT_EDGE: &str = "MINT_EDGE";

/// Fraction in force from `start_time_ms` until the next period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyPeriod {
    pub start_time_ms: TimestampMs,
    /// Fraction of the interval's total mint, in `[0, 1]`.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyPolicy {
    pub recipient: NodeAddress,
    pub periods: Vec<DependencyPeriod>,
}

impl DependencyPolicy {
    pub fn validate(&self) -> Result<(), CredError> {
        if let Some(period) = self
            .periods
            .iter()
            .find(|p| !(0.0..=1.0).contains(&p.weight))
        {
            return Err(CredError::Parameter(format!(
                "dependency weight for {} must be in [0, 1], got {}",
                self.recipient, period.weight
            )));
        }
        if let Some(pair) = self
            .periods
            .windows(2)
            .find(|pair| pair[0].start_time_ms >= pair[1].start_time_ms)
        {
            return Err(CredError::Parameter(format!(
                "dependency periods for {} not strictly increasing: {} then {}",
                self.recipient, pair[0].start_time_ms, pair[1].start_time_ms
            )));
        }
        Ok(())
    }

    /// Fraction of the last period starting at or before `interval_start`;
    /// zero before the first period.
    #[must_use]
    pub fn weight_at(&self, interval_start: TimestampMs) -> f64 {
        self.periods
            .iter()
            .take_while(|p| p.start_time_ms <= interval_start)
            .last()
            .map_or(0.0, |p| p.weight)
    }
}

/// Address of the mint node for `recipient` in the interval starting at `start`.
pub fn mint_node_address(recipient: &NodeAddress, start: TimestampMs) -> Result<NodeAddress, CredError> {
    Ok(NodeAddress::from_parts([CORE_NAMESPACE, DEPENDENCY_MODULE, MINT, &start.to_string()])?
        .append_address(recipient))
}

/// Address of the edge from a mint node to its recipient.
pub fn mint_edge_address(recipient: &NodeAddress, start: TimestampMs) -> Result<EdgeAddress, CredError> {
    Ok(EdgeAddress::from_parts([
        CORE_NAMESPACE,
        DEPENDENCY_MODULE,
        MINT_EDGE,
        &start.to_string(),
    ])?
    .append_address(recipient))
}

/// Check that every recipient can receive cred in a Markov process graph.
///
/// A recipient must exist in `graph` and be either one of `participants` or a
/// timeful node. Timeless non-participants have no MPG node, so mint sent to
/// them would stay on the mint node.
pub fn check_recipients(
    graph: &Graph,
    policies: &[DependencyPolicy],
    participants: &[Participant],
) -> Result<(), CredError> {
    for policy in policies {
        let node = graph.node(&policy.recipient).ok_or_else(|| {
            CredError::MissingReference(format!(
                "dependency recipient not in graph: {}",
                policy.recipient
            ))
        })?;
        let is_participant = participants.iter().any(|p| p.address == policy.recipient);
        if node.timestamp_ms.is_none() && !is_participant {
            return Err(CredError::Parameter(format!(
                "dependency recipient {} must be a participant or a timeful node",
                policy.recipient
            )));
        }
    }
    Ok(())
}

/// Build the dependency mint subgraph for `policies`.
pub fn compute_dependency_graph(
    weighted: &WeightedGraph,
    policies: &[DependencyPolicy],
    interval_length: IntervalLength,
) -> Result<WeightedGraph, CredError> {
    let mut result = WeightedGraph::default();
    if policies.is_empty() {
        return Ok(result);
    }
    for policy in policies {
        policy.validate()?;
        if !weighted.graph.has_node(&policy.recipient) {
            return Err(CredError::MissingReference(format!(
                "dependency recipient not in graph: {}",
                policy.recipient
            )));
        }
    }

    let intervals = graph_intervals(&weighted.graph, interval_length)?;
    let evaluator = NodeWeightEvaluator::from_weights(&weighted.weights);
    let mut totals = vec![0.0f64; intervals.len()];
    for node in weighted.graph.nodes() {
        let slot = node
            .timestamp_ms
            .and_then(|t| bucket_index(&intervals, t))
            .and_then(|i| totals.get_mut(i));
        if let Some(total) = slot {
            *total += evaluator.evaluate(&node.address);
        }
    }

    for policy in policies {
        let description = weighted
            .graph
            .node(&policy.recipient)
            .map(|n| n.description.as_str())
            .unwrap_or_default();
        for (interval, &total) in intervals.iter().zip(&totals) {
            let amount = policy.weight_at(interval.start_time_ms) * total;
            if amount <= 0.0 {
                continue;
            }
            let start = interval.start_time_ms;
            let node_address = mint_node_address(&policy.recipient, start)?;
            let edge_address = mint_edge_address(&policy.recipient, start)?;
            result.graph.add_node(Node::new(
                node_address.clone(),
                format!("Dependency mint for {} starting {}", description, start),
                start,
            ))?;
            result.graph.add_edge(Edge::new(
                edge_address.clone(),
                node_address.clone(),
                policy.recipient.clone(),
                start,
            ))?;
            result.weights.set_node_weight(node_address, amount)?;
            result
                .weights
                .set_edge_weight(edge_address, EdgeWeight::new(1.0, 0.0))?;
        }
    }
    tracing::debug!(
        "dependency mint: {} nodes for {} policies",
        result.graph.node_count(),
        policies.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{WEEK_MS, WEEK_ORIGIN_MS};
    use crate::weights::Weights;

    fn na(parts: &[&str]) -> NodeAddress {
        NodeAddress::from_parts(parts).expect("address")
    }

    fn input() -> WeightedGraph {
        let mut graph = Graph::new();
        graph
            .add_node(Node::timeless(na(&["project"]), "project"))
            .expect("add");
        graph
            .add_node(Node::new(na(&["post", "1"]), "p1", WEEK_ORIGIN_MS))
            .expect("add");
        graph
            .add_node(Node::new(na(&["post", "2"]), "p2", WEEK_ORIGIN_MS + WEEK_MS))
            .expect("add");
        let mut weights = Weights::new();
        weights.set_node_weight(na(&["post", "2"]), 3.0).expect("weight");
        WeightedGraph::new(graph, weights)
    }

    fn policy(periods: &[(i64, f64)]) -> DependencyPolicy {
        DependencyPolicy {
            recipient: na(&["project"]),
            periods: periods
                .iter()
                .map(|&(start_time_ms, weight)| DependencyPeriod {
                    start_time_ms,
                    weight,
                })
                .collect(),
        }
    }

    #[test]
    fn mints_fraction_of_interval_total() {
        let minted =
            compute_dependency_graph(&input(), &[policy(&[(0, 0.5)])], IntervalLength::Weekly)
                .expect("mint");
        assert_eq!(minted.graph.node_count(), 2);

        let first = mint_node_address(&na(&["project"]), WEEK_ORIGIN_MS).expect("address");
        let second = mint_node_address(&na(&["project"]), WEEK_ORIGIN_MS + WEEK_MS).expect("address");
        assert_eq!(minted.weights.node_weight(&first), Some(0.5));
        assert_eq!(minted.weights.node_weight(&second), Some(1.5));

        let edge = mint_edge_address(&na(&["project"]), WEEK_ORIGIN_MS).expect("edge");
        let stored = minted.graph.edge(&edge).expect("edge exists");
        assert_eq!(stored.dst, na(&["project"]));
        assert_eq!(minted.weights.edge_weight(&edge), Some(EdgeWeight::new(1.0, 0.0)));
        assert!(first.has_prefix(&na(&[CORE_NAMESPACE, DEPENDENCY_MODULE])));
    }

    #[test]
    fn zero_fraction_mints_nothing() {
        let later = WEEK_ORIGIN_MS + WEEK_MS;
        let minted = compute_dependency_graph(
            &input(),
            &[policy(&[(later, 0.25)])],
            IntervalLength::Weekly,
        )
        .expect("mint");
        assert_eq!(minted.graph.node_count(), 1);
    }

    #[test]
    fn missing_recipient_fails() {
        let mut p = policy(&[(0, 0.5)]);
        p.recipient = na(&["nobody"]);
        assert!(matches!(
            compute_dependency_graph(&input(), &[p], IntervalLength::Weekly),
            Err(CredError::MissingReference(_))
        ));
    }

    #[test]
    fn out_of_range_fraction_fails() {
        assert!(matches!(
            policy(&[(0, 1.5)]).validate(),
            Err(CredError::Parameter(_))
        ));
    }

    #[test]
    fn merges_cleanly_with_input() {
        let base = input();
        let minted =
            compute_dependency_graph(&base, &[policy(&[(0, 0.1)])], IntervalLength::Weekly)
                .expect("mint");
        let merged = WeightedGraph::merge([&base, &minted]).expect("merge");
        assert_eq!(merged.graph.node_count(), 5);
        assert_eq!(merged.graph.edges(&crate::graph::EdgesOptions::non_dangling()).count(), 2);
    }

    #[test]
    fn recipient_must_be_participant_or_timeful() {
        let base = input();
        let timeless = policy(&[(0, 0.5)]);
        assert!(matches!(
            check_recipients(&base.graph, std::slice::from_ref(&timeless), &[]),
            Err(CredError::Parameter(_))
        ));

        let participant = Participant::from_address(na(&["project"]), "project");
        check_recipients(&base.graph, std::slice::from_ref(&timeless), &[participant])
            .expect("participant recipient");

        let mut timeful = policy(&[(0, 0.5)]);
        timeful.recipient = na(&["post", "1"]);
        check_recipients(&base.graph, &[timeful], &[]).expect("timeful recipient");

        let mut missing = policy(&[(0, 0.5)]);
        missing.recipient = na(&["nobody"]);
        assert!(matches!(
            check_recipients(&base.graph, &[missing], &[]),
            Err(CredError::MissingReference(_))
        ));
    }
}
