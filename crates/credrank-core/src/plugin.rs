//! # Plugins
//!
//! Plugins scrape external platforms into contribution graphs. The engine
//! only needs two things from a plugin: its [`PluginDeclaration`] (address
//! prefixes, node/edge types with default weights, which node types are
//! participants) and its graph.
//!
//! Every address a plugin emits must live under the prefixes it declares,
//! conventionally `[organization, pluginName, ...]`.

use crate::address::{EdgeAddress, NodeAddress};
use crate::graph::{EdgesOptions, Graph};
use crate::weights::{EdgeWeight, Weights};
use crate::CredError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// =============================================================================
// DECLARATIONS
// =============================================================================

/// A kind of node a plugin emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    pub name: String,
    pub plural_name: String,
    pub prefix: NodeAddress,
    pub default_weight: f64,
    pub description: String,
}

/// A kind of edge a plugin emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeType {
    pub forward_name: String,
    pub backward_name: String,
    pub prefix: EdgeAddress,
    pub default_weight: EdgeWeight,
    pub description: String,
}

/// Everything the engine needs to know about a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDeclaration {
    pub name: String,
    pub node_prefix: NodeAddress,
    pub edge_prefix: EdgeAddress,
    pub node_types: Vec<NodeType>,
    pub edge_types: Vec<EdgeType>,
    /// Node types whose nodes are participants. Subset of `node_types`.
    pub user_types: Vec<NodeType>,
}

impl PluginDeclaration {
    /// Check prefixes, the user-type subset relation and default weights.
    pub fn validate(&self) -> Result<(), CredError> {
        for node_type in &self.node_types {
            if !node_type.prefix.has_prefix(&self.node_prefix) {
                return Err(CredError::InvalidAddress(format!(
                    "plugin {}: node type {} prefix {} is outside {}",
                    self.name, node_type.name, node_type.prefix, self.node_prefix
                )));
            }
            if !node_type.default_weight.is_finite() || node_type.default_weight < 0.0 {
                return Err(CredError::WeightConfig(format!(
                    "plugin {}: node type {} has invalid default weight {}",
                    self.name, node_type.name, node_type.default_weight
                )));
            }
        }
        for edge_type in &self.edge_types {
            if !edge_type.prefix.has_prefix(&self.edge_prefix) {
                return Err(CredError::InvalidAddress(format!(
                    "plugin {}: edge type {} prefix {} is outside {}",
                    self.name, edge_type.forward_name, edge_type.prefix, self.edge_prefix
                )));
            }
            let EdgeWeight {
                forwards,
                backwards,
            } = edge_type.default_weight;
            if !forwards.is_finite() || !backwards.is_finite() || forwards < 0.0 || backwards < 0.0
            {
                return Err(CredError::WeightConfig(format!(
                    "plugin {}: edge type {} has invalid default weight {:?}",
                    self.name, edge_type.forward_name, edge_type.default_weight
                )));
            }
        }
        for user_type in &self.user_types {
            if !self.node_types.contains(user_type) {
                return Err(CredError::Parameter(format!(
                    "plugin {}: user type {} is not one of its node types",
                    self.name, user_type.name
                )));
            }
        }
        Ok(())
    }
}

/// A source of contribution data.
pub trait Plugin {
    fn declaration(&self) -> &PluginDeclaration;

    /// The plugin's contribution graph.
    fn graph(&self) -> Result<Graph, CredError>;
}

/// Merge the graphs of many plugins, checking that each stays under its
/// declared prefixes.
pub fn combine_plugin_graphs(plugins: &[&dyn Plugin]) -> Result<Graph, CredError> {
    let mut graphs = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        let declaration = plugin.declaration();
        declaration.validate()?;
        let graph = plugin.graph()?;
        if let Some(node) = graph
            .nodes()
            .find(|n| !n.address.has_prefix(&declaration.node_prefix))
        {
            return Err(CredError::InvalidAddress(format!(
                "plugin {} emitted node {} outside its prefix {}",
                declaration.name, node.address, declaration.node_prefix
            )));
        }
        if let Some(edge) = graph
            .edges(&EdgesOptions::all())
            .find(|e| !e.address.has_prefix(&declaration.edge_prefix))
        {
            return Err(CredError::InvalidAddress(format!(
                "plugin {} emitted edge {} outside its prefix {}",
                declaration.name, edge.address, declaration.edge_prefix
            )));
        }
        tracing::debug!(
            "plugin {}: {} nodes, {} edges",
            declaration.name,
            graph.node_count(),
            graph.edge_count()
        );
        graphs.push(graph);
    }
    Graph::merge(&graphs)
}

/// Type-default weights of every declared node and edge type.
///
/// Two declarations giving different defaults for the same prefix conflict.
pub fn weights_for_declarations(declarations: &[PluginDeclaration]) -> Result<Weights, CredError> {
    let mut per_plugin = Vec::with_capacity(declarations.len());
    for declaration in declarations {
        let mut weights = Weights::new();
        for node_type in &declaration.node_types {
            weights.set_node_weight(node_type.prefix.clone(), node_type.default_weight)?;
        }
        for edge_type in &declaration.edge_types {
            weights.set_edge_weight(edge_type.prefix.clone(), edge_type.default_weight)?;
        }
        per_plugin.push(weights);
    }
    Weights::merge(&per_plugin)
}

// =============================================================================
// PARTICIPANTS
// =============================================================================

/// A scoring participant: a node that is expanded into epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub address: NodeAddress,
    pub description: String,
    pub id: Uuid,
}

impl Participant {
    /// Participant with an id derived from its address.
    #[must_use]
    pub fn from_address(address: NodeAddress, description: impl Into<String>) -> Self {
        let id = participant_id(&address);
        Self {
            address,
            description: description.into(),
            id,
        }
    }
}

/// Deterministic participant id: UUID v5 over the canonical address.
#[must_use]
pub fn participant_id(address: &NodeAddress) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, address.as_raw().as_bytes())
}

/// Every node of `graph` that matches a declared user type, in address order.
pub fn participants_from_graph(graph: &Graph, declarations: &[PluginDeclaration]) -> Vec<Participant> {
    let mut found = BTreeMap::new();
    for user_type in declarations.iter().flat_map(|d| &d.user_types) {
        for node in graph.nodes_with_prefix(&user_type.prefix) {
            found
                .entry(node.address.clone())
                .or_insert_with(|| Participant::from_address(node.address.clone(), &node.description));
        }
    }
    found.into_values().collect()
}

// =============================================================================
// TESTS
// =============================================================================
