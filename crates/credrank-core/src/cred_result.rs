//! # Cred Result
//!
//! The self-contained output of a cred computation, shaped for downstream
//! consumers: the weighted graph that was scored, per-node and per-edge cred
//! (in total and per interval), the parameters and the plugin declarations.
//!
//! Rows follow the canonical order of the scored graph. A contribution's cred
//! lands in the interval of its timestamp; a participant's cred is spread over
//! the intervals of its epochs, with the two unbounded epochs folded into the
//! first and last interval.

use crate::address::NodeAddress;
use crate::cred_graph::CredGraph;
use crate::interval::{Interval, TimeBoundary};
use crate::markov::process_graph::{markov_edge_address, seed_address};
use crate::params::CredParams;
use crate::plugin::PluginDeclaration;
use crate::types::TimestampMs;
use crate::weighted_graph::{WeightedGraph, WeightedGraphJson};
use crate::CredError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate cred of one graph node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub cred: f64,
    /// Cred minted into the node by the seed.
    pub seed_flow: f64,
    /// Cred the node passes to itself over its synthetic loop.
    pub synthetic_loop_flow: f64,
}

/// Aggregate cred flow over one graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSummary {
    pub forward_flow: f64,
    pub backward_flow: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredData {
    /// `node_over_time[i][k]`: cred of node `i` in interval `k`.
    pub node_over_time: Vec<Vec<f64>>,
    pub node_summaries: Vec<NodeSummary>,
    /// `edge_over_time[i][k]`: flow over edge `i` (both directions) in interval `k`.
    pub edge_over_time: Vec<Vec<f64>>,
    pub edge_summaries: Vec<EdgeSummary>,
    pub intervals: Vec<Interval>,
}

impl CredData {
    /// Summarize `cred` over the nodes and edges of `weighted`.
    pub fn compute(weighted: &WeightedGraph, cred: &CredGraph) -> Result<Self, CredError> {
        let intervals = cred.mpg().intervals().to_vec();
        let slots = intervals.len();
        let seed = seed_address()?;
        let participants: BTreeMap<NodeAddress, Vec<f64>> = cred
            .participants()
            .map(|p| p.map(|p| (p.address, p.cred_per_epoch)))
            .collect::<Result<_, _>>()?;

        let mut data = Self {
            intervals,
            ..Self::default()
        };

        for node in weighted.graph.nodes() {
            let mut over_time = vec![0.0; slots];
            let mut summary = NodeSummary::default();
            if let Some(per_epoch) = participants.get(&node.address) {
                for (epoch, flow) in per_epoch.iter().enumerate() {
                    if let Some(slot) = over_time.get_mut(epoch_slot(epoch, slots)) {
                        *slot += flow;
                    }
                }
                summary.cred = per_epoch.iter().sum();
            } else if let Some(scored) = cred.node(&node.address) {
                summary.cred = scored.cred;
                for incoming in cred.in_neighbors(&node.address)? {
                    if incoming.edge.src == seed {
                        summary.seed_flow += incoming.cred_flow;
                    } else if incoming.edge.src == node.address {
                        summary.synthetic_loop_flow += incoming.cred_flow;
                    }
                }
                if let Some(slot) = node
                    .timestamp_ms
                    .and_then(|t| over_time.get_mut(timestamp_slot(&data.intervals, t)))
                {
                    *slot += scored.cred;
                }
            }
            data.node_over_time.push(over_time);
            data.node_summaries.push(summary);
        }

        for edge in weighted.graph.edges(&crate::graph::EdgesOptions::all()) {
            let flow = |reversed| -> Result<f64, CredError> {
                let address = markov_edge_address(&edge.address, reversed)?;
                Ok(cred.edge(&address).map(|e| e.cred_flow).unwrap_or_default())
            };
            let summary = EdgeSummary {
                forward_flow: flow(false)?,
                backward_flow: flow(true)?,
            };
            let mut over_time = vec![0.0; slots];
            if let Some(slot) = over_time.get_mut(timestamp_slot(&data.intervals, edge.timestamp_ms)) {
                *slot += summary.forward_flow + summary.backward_flow;
            }
            data.edge_over_time.push(over_time);
            data.edge_summaries.push(summary);
        }

        Ok(data)
    }
}

/// Interval receiving epoch `epoch` of `[-inf, start_0, ..., start_{n-1}, +inf]`.
fn epoch_slot(epoch: usize, slots: usize) -> usize {
    epoch.saturating_sub(1).min(slots.saturating_sub(1))
}

/// Interval receiving `timestamp_ms`, clamped to the first and last interval.
fn timestamp_slot(intervals: &[Interval], timestamp_ms: TimestampMs) -> usize {
    epoch_slot(TimeBoundary::epoch_index(intervals, timestamp_ms), intervals.len())
}

/// Everything a consumer needs to display or redistribute cred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredResult {
    pub weighted_graph: WeightedGraphJson,
    pub cred_data: CredData,
    pub params: CredParams,
    pub plugins: Vec<PluginDeclaration>,
}

impl CredResult {
    pub fn new(
        weighted: &WeightedGraph,
        cred: &CredGraph,
        params: CredParams,
        plugins: Vec<PluginDeclaration>,
    ) -> Result<Self, CredError> {
        Ok(Self {
            weighted_graph: weighted.to_json(),
            cred_data: CredData::compute(weighted, cred)?,
            params,
            plugins,
        })
    }
}
