//! # Credrank Pipeline
//!
//! One call from a weighted contribution graph to cred:
//!
//! ```text
//! type defaults + overrides -> budget -> dependency mint -> participants
//!     -> intervals -> MPG -> chain -> power iteration -> CredGraph -> CredResult
//! ```

use crate::budget::{Budget, apply_budget};
use crate::cred_graph::CredGraph;
use crate::cred_result::CredResult;
use crate::dependency_mint::{DependencyPolicy, check_recipients, compute_dependency_graph};
use crate::interval::graph_intervals;
use crate::markov::chain::OrderedSparseMarkovChain;
use crate::markov::pagerank::{
    ConvergenceReport, PagerankParams, Scheduler, find_stationary_distribution,
};
use crate::markov::process_graph::MarkovProcessGraph;
use crate::params::CredParams;
use crate::plugin::{PluginDeclaration, participants_from_graph, weights_for_declarations};
use crate::weighted_graph::WeightedGraph;
use crate::CredError;

/// Everything a cred computation consumes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CredrankInput {
    /// Graph plus explicit weight overrides.
    pub weighted_graph: WeightedGraph,
    pub plugins: Vec<PluginDeclaration>,
    pub budget: Option<Budget>,
    pub dependencies: Vec<DependencyPolicy>,
    pub params: CredParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CredrankOutput {
    pub cred_graph: CredGraph,
    pub result: CredResult,
    pub report: ConvergenceReport,
}

/// Run the full pipeline. `scheduler` is consulted at every solver yield.
///
/// A run that stops before converging still returns its best distribution;
/// check `report.converged`.
pub fn compute_cred(
    input: &CredrankInput,
    scheduler: &mut impl Scheduler,
) -> Result<CredrankOutput, CredError> {
    let params = input.params;
    params.validate()?;
    for plugin in &input.plugins {
        plugin.validate()?;
    }

    let weights =
        weights_for_declarations(&input.plugins)?.with_overrides(&input.weighted_graph.weights);
    let mut weighted = WeightedGraph::new(input.weighted_graph.graph.clone(), weights);

    if !input.dependencies.is_empty() {
        let participants = participants_from_graph(&input.weighted_graph.graph, &input.plugins);
        check_recipients(&input.weighted_graph.graph, &input.dependencies, &participants)?;
    }
    if let Some(budget) = &input.budget {
        weighted = apply_budget(&weighted, budget)?;
    }
    if !input.dependencies.is_empty() {
        let minted =
            compute_dependency_graph(&weighted, &input.dependencies, params.interval_length)?;
        weighted = WeightedGraph::merge([&weighted, &minted])?;
    }

    let participants = participants_from_graph(&weighted.graph, &input.plugins);
    let intervals = graph_intervals(&weighted.graph, params.interval_length)?;
    tracing::info!(
        "scoring {} nodes, {} edges, {} participants over {} intervals",
        weighted.graph.node_count(),
        weighted.graph.edge_count(),
        participants.len(),
        intervals.len()
    );

    let mpg = MarkovProcessGraph::new(
        &weighted,
        &participants,
        &intervals,
        &params.transition_probabilities(),
    )?;
    let ordered = OrderedSparseMarkovChain::from_process_graph(&mpg, params.synthetic_loop_weight)?;
    let pagerank = find_stationary_distribution(
        &ordered.chain,
        &PagerankParams::default(),
        &params.pagerank_options(),
        scheduler,
    )?;

    let cred_graph = CredGraph::new(mpg, &ordered.node_order, pagerank.pi)?;
    let result = CredResult::new(&weighted, &cred_graph, params, input.plugins.clone())?;
    Ok(CredrankOutput {
        cred_graph,
        result,
        report: pagerank.report,
    })
}
