//! # Markov Module
//!
//! The random-walk half of the engine.
//!
//! - `process_graph`: the time-expanded Markov process graph (MPG)
//! - `chain`: sparse column-stochastic transition matrices
//! - `pagerank`: cooperative power iteration

pub mod chain;
pub mod pagerank;
pub mod process_graph;

pub use chain::{
    OrderedSparseMarkovChain, SparseColumn, SparseMarkovChain,
    sparse_markov_chain_from_transition_matrix,
};
pub use pagerank::{
    CancellationFlag, ConvergenceReport, NoYield, PagerankOptions, PagerankParams, PagerankResult,
    PowerIteration, Scheduler, find_stationary_distribution,
};
pub use process_graph::{
    MarkovEdge, MarkovNode, MarkovProcessGraph, MarkovProcessGraphJson, TransitionProbabilities,
};
