//! # credrank-core
//!
//! The deterministic contribution-credit engine.
//!
//! This crate turns a weighted contribution graph into per-node cred scores
//! and per-edge cred flows. Contributions and participants are connected by
//! plugin-supplied edges; participants are expanded into per-interval epochs,
//! and a random walk over the resulting Markov process graph assigns cred.
//!
//! ## Pipeline
//!
//! ```text
//! plugins -> Graph + Weights -> budget -> dependency mint
//!         -> MarkovProcessGraph -> sparse chain -> power iteration
//!         -> CredGraph -> CredResult
//! ```
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network dependencies
//! - Deterministic: `BTreeMap` only, fixed summation order in the matvec
//! - Cooperative: the power iteration yields to a host [`Scheduler`]

// =============================================================================
// MODULES
// =============================================================================

pub mod address;
pub mod budget;
pub mod cred_graph;
pub mod cred_result;
pub mod credrank;
pub mod dependency_mint;
pub mod formats;
pub mod graph;
pub mod interval;
pub mod markov;
pub mod params;
pub mod plugin;
pub mod primitives;
pub mod types;
pub mod weight_evaluator;
pub mod weighted_graph;
pub mod weights;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use address::{Address, AddressKind, EdgeAddress, EdgeKind, NodeAddress, NodeKind};
pub use types::{CredError, Edge, ErrorKind, Node, TimestampMs};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use budget::{Budget, BudgetEntry, BudgetPeriod, apply_budget};
pub use cred_graph::{CredGraph, CredGraphJson, ParticipantCred, ScoredEdge, ScoredNode};
pub use cred_result::{CredData, CredResult, EdgeSummary, NodeSummary};
pub use credrank::{CredrankInput, CredrankOutput, compute_cred};
pub use dependency_mint::{
    DependencyPeriod, DependencyPolicy, check_recipients, compute_dependency_graph,
};
pub use graph::{
    Direction, EdgeCursor, EdgesOptions, Graph, GraphJson, Neighbor, NeighborsOptions,
    NodeContraction, NodeCursor,
};
pub use interval::{
    GraphIntervalPartition, Interval, IntervalLength, TimeBoundary, graph_intervals,
    partition_graph, week_intervals,
};
pub use params::CredParams;
pub use plugin::{
    EdgeType, NodeType, Participant, Plugin, PluginDeclaration, combine_plugin_graphs,
    participants_from_graph, weights_for_declarations,
};
pub use weight_evaluator::{EdgeWeightEvaluator, NodeWeightEvaluator};
pub use weighted_graph::{WeightedGraph, WeightedGraphJson};
pub use weights::{EdgeWeight, Weights, WeightsJson};

// =============================================================================
// RE-EXPORTS: Markov (from markov module)
// =============================================================================

pub use markov::{
    CancellationFlag, ConvergenceReport, MarkovEdge, MarkovNode, MarkovProcessGraph,
    MarkovProcessGraphJson, NoYield, OrderedSparseMarkovChain, PagerankOptions, PagerankParams,
    PagerankResult, PowerIteration, Scheduler, SparseMarkovChain, TransitionProbabilities,
    find_stationary_distribution, sparse_markov_chain_from_transition_matrix,
};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::content_hash;
pub use formats::{
    CompatInfo, CompatPayload, PersistenceHeader, from_compat_json, to_compat_json,
    weighted_graph_from_bytes, weighted_graph_to_bytes,
};
