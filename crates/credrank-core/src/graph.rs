//! # Contribution Graph
//!
//! A labeled directed multigraph over address-keyed nodes and edges.
//!
//! All data structures use `BTreeMap` for deterministic ordering, so
//! `nodes()` and `edges()` yield in address-sorted order.
//!
//! ## Dangling Edges
//!
//! An edge whose `src` or `dst` is not a node of the graph is *dangling*.
//! Dangling edges are first-class: removing a node keeps its edges, and adding
//! the node back reconnects them. The adjacency index is therefore keyed on
//! node *addresses* (the referenced set), never on stored nodes.
//!
//! ## Modification Tracking
//!
//! Every mutating call bumps a modification counter. Borrowing iterators
//! cannot observe mutation at all; detached cursors ([`NodeCursor`],
//! [`EdgeCursor`]) re-check the counter on every step.

use crate::address::{EdgeAddress, NodeAddress};
use crate::{CredError, Edge, Node, TimestampMs};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

// =============================================================================
// QUERY OPTIONS
// =============================================================================

/// Which adjacent edges `neighbors` follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Edges whose `dst` is the target node.
    In,
    /// Edges whose `src` is the target node.
    Out,
    /// Both.
    #[default]
    Any,
}

/// Filters for [`Graph::edges`].
#[derive(Debug, Clone, Default)]
pub struct EdgesOptions {
    pub show_dangling: bool,
    pub address_prefix: Option<EdgeAddress>,
    pub src_prefix: Option<NodeAddress>,
    pub dst_prefix: Option<NodeAddress>,
}

impl EdgesOptions {
    /// Every edge, dangling or not.
    #[must_use]
    pub fn all() -> Self {
        Self {
            show_dangling: true,
            ..Self::default()
        }
    }

    /// Only edges whose endpoints are both nodes of the graph.
    #[must_use]
    pub fn non_dangling() -> Self {
        Self::default()
    }
}

/// Filters for [`Graph::neighbors`].
#[derive(Debug, Clone, Default)]
pub struct NeighborsOptions {
    pub direction: Direction,
    pub node_prefix: NodeAddress,
    pub edge_prefix: EdgeAddress,
}

impl NeighborsOptions {
    /// Follow edges in `direction`, with no prefix filters.
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }
}

/// An adjacent node together with the edge that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor<'a> {
    pub node: &'a Node,
    pub edge: &'a Edge,
}

/// Merge a set of old node addresses into a single replacement node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContraction {
    pub old: Vec<NodeAddress>,
    pub replacement: Node,
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The contribution graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node storage: address -> node
    nodes: BTreeMap<NodeAddress, Node>,

    /// Edge storage: address -> edge
    edges: BTreeMap<EdgeAddress, Edge>,

    /// In-adjacency: referenced node address -> addresses of edges ending there
    in_edges: BTreeMap<NodeAddress, BTreeSet<EdgeAddress>>,

    /// Out-adjacency: referenced node address -> addresses of edges starting there
    out_edges: BTreeMap<NodeAddress, BTreeSet<EdgeAddress>>,

    /// Bumped by every mutating call.
    modification_count: u64,
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl Eq for Graph {}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls applied so far.
    #[must_use]
    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    fn mark_modified(&mut self) {
        self.modification_count = self.modification_count.saturating_add(1);
    }

    #[cfg(test)]
    fn check_after_mutation(&self) -> Result<(), CredError> {
        self.check_invariants()
    }

    #[cfg(not(test))]
    fn check_after_mutation(&self) -> Result<(), CredError> {
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Add a node. Adding a node equal to the stored one is a no-op.
    pub fn add_node(&mut self, node: Node) -> Result<(), CredError> {
        match self.nodes.get(&node.address) {
            Some(existing) if existing != &node => {
                return Err(CredError::Conflict(format!(
                    "conflict between new node {:?} and existing {:?}",
                    node, existing
                )));
            }
            Some(_) => {}
            None => {
                self.nodes.insert(node.address.clone(), node);
            }
        }
        self.mark_modified();
        self.check_after_mutation()
    }

    /// Remove a node. Its edges are kept and become dangling.
    pub fn remove_node(&mut self, address: &NodeAddress) -> Result<(), CredError> {
        self.nodes.remove(address);
        self.mark_modified();
        self.check_after_mutation()
    }

    /// Check if the graph contains a node.
    #[must_use]
    pub fn has_node(&self, address: &NodeAddress) -> bool {
        self.nodes.contains_key(address)
    }

    /// Lookup a node by address.
    #[must_use]
    pub fn node(&self, address: &NodeAddress) -> Option<&Node> {
        self.nodes.get(address)
    }

    /// All nodes in address order.
    pub fn nodes<'a>(&'a self) -> impl Iterator<Item = &'a Node> + use<'a> {
        self.nodes.values()
    }

    /// Nodes whose address starts with `prefix`, in address order.
    pub fn nodes_with_prefix<'a>(
        &'a self,
        prefix: &NodeAddress,
    ) -> impl Iterator<Item = &'a Node> + use<'a> {
        let prefix = prefix.clone();
        self.nodes
            .range(prefix.clone()..)
            .take_while(move |(address, _)| address.has_prefix(&prefix))
            .map(|(_, node)| node)
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // -------------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------------

    /// Add an edge. Endpoints need not exist.
    ///
    /// Adding an edge equal to the stored one is a no-op; a different edge at
    /// the same address is a conflict.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), CredError> {
        match self.edges.get(&edge.address) {
            Some(existing) if existing != &edge => {
                return Err(CredError::Conflict(format!(
                    "conflict between new edge {:?} and existing {:?}",
                    edge, existing
                )));
            }
            Some(_) => {}
            None => {
                self.in_edges
                    .entry(edge.dst.clone())
                    .or_default()
                    .insert(edge.address.clone());
                self.out_edges
                    .entry(edge.src.clone())
                    .or_default()
                    .insert(edge.address.clone());
                self.edges.insert(edge.address.clone(), edge);
            }
        }
        self.mark_modified();
        self.check_after_mutation()
    }

    /// Remove an edge. Removing an absent edge is a no-op.
    pub fn remove_edge(&mut self, address: &EdgeAddress) -> Result<(), CredError> {
        if let Some(edge) = self.edges.remove(address) {
            detach(&mut self.in_edges, &edge.dst, address);
            detach(&mut self.out_edges, &edge.src, address);
        }
        self.mark_modified();
        self.check_after_mutation()
    }

    /// Check if the graph contains an edge (dangling or not).
    #[must_use]
    pub fn has_edge(&self, address: &EdgeAddress) -> bool {
        self.edges.contains_key(address)
    }

    /// Whether the edge dangles; `None` if there is no such edge.
    #[must_use]
    pub fn is_dangling_edge(&self, address: &EdgeAddress) -> Option<bool> {
        self.edges.get(address).map(|edge| self.is_dangling(edge))
    }

    fn is_dangling(&self, edge: &Edge) -> bool {
        !self.nodes.contains_key(&edge.src) || !self.nodes.contains_key(&edge.dst)
    }

    /// Lookup an edge by address.
    #[must_use]
    pub fn edge(&self, address: &EdgeAddress) -> Option<&Edge> {
        self.edges.get(address)
    }

    /// Edges matching `options`, in address order.
    pub fn edges<'a>(&'a self, options: &EdgesOptions) -> impl Iterator<Item = &'a Edge> + use<'a> {
        let options = options.clone();
        let prefix = options.address_prefix.clone().unwrap_or_default();
        let range_start = prefix.clone();
        self.edges
            .range(range_start..)
            .take_while(move |(address, _)| address.has_prefix(&prefix))
            .map(|(_, edge)| edge)
            .filter(move |edge| {
                (options.show_dangling || !self.is_dangling(edge))
                    && options
                        .src_prefix
                        .as_ref()
                        .is_none_or(|p| edge.src.has_prefix(p))
                    && options
                        .dst_prefix
                        .as_ref()
                        .is_none_or(|p| edge.dst.has_prefix(p))
            })
    }

    /// Total number of edges, dangling included.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // -------------------------------------------------------------------------
    // Neighbors
    // -------------------------------------------------------------------------

    /// Nodes adjacent to `address`, with the connecting edge.
    ///
    /// A loop edge yields its node once. Dangling edges yield nothing.
    pub fn neighbors<'a>(
        &'a self,
        address: &NodeAddress,
        options: &NeighborsOptions,
    ) -> Result<impl Iterator<Item = Neighbor<'a>> + use<'a>, CredError> {
        if !self.has_node(address) {
            return Err(CredError::MissingReference(format!(
                "node does not exist: {}",
                address
            )));
        }
        let options = options.clone();
        let wants_in = matches!(options.direction, Direction::In | Direction::Any);
        let wants_out = matches!(options.direction, Direction::Out | Direction::Any);

        let incoming = self
            .in_edges
            .get(address)
            .filter(|_| wants_in)
            .into_iter()
            .flatten()
            .map(|edge_address| (edge_address, true));
        let outgoing = self
            .out_edges
            .get(address)
            .filter(|_| wants_out)
            .into_iter()
            .flatten()
            .map(|edge_address| (edge_address, false));

        Ok(incoming
            .chain(outgoing)
            .filter_map(move |(edge_address, is_incoming)| {
                let edge = self.edges.get(edge_address)?;
                // Loops were already yielded from the in-adjacency.
                if !is_incoming && wants_in && edge.is_loop() {
                    return None;
                }
                if !edge.address.has_prefix(&options.edge_prefix) {
                    return None;
                }
                let neighbor_address = if is_incoming { &edge.src } else { &edge.dst };
                let node = self.nodes.get(neighbor_address)?;
                if !node.address.has_prefix(&options.node_prefix) {
                    return None;
                }
                Some(Neighbor { node, edge })
            }))
    }

    // -------------------------------------------------------------------------
    // Whole-graph operations
    // -------------------------------------------------------------------------

    /// Union of several graphs.
    ///
    /// Entities with the same address must be equal across inputs.
    pub fn merge<'g>(graphs: impl IntoIterator<Item = &'g Graph>) -> Result<Graph, CredError> {
        let mut result = Graph::new();
        for graph in graphs {
            for node in graph.nodes.values() {
                result.add_node(node.clone())?;
            }
            for edge in graph.edges.values() {
                result.add_edge(edge.clone())?;
            }
        }
        Ok(result)
    }

    /// Return a copy where each contraction's old nodes are replaced by its
    /// replacement node, and every edge endpoint is rewritten accordingly.
    ///
    /// Chained contractions (A into B and B into C in one call) are rejected.
    pub fn contract_nodes(&self, contractions: &[NodeContraction]) -> Result<Graph, CredError> {
        let mut remap: BTreeMap<&NodeAddress, &NodeAddress> = BTreeMap::new();
        for contraction in contractions {
            let target = &contraction.replacement.address;
            for old in &contraction.old {
                if let Some(previous) = remap.insert(old, target)
                    && previous != target
                {
                    return Err(CredError::Parameter(format!(
                        "node {} contracted into both {} and {}",
                        old, previous, target
                    )));
                }
            }
        }
        for contraction in contractions {
            let target = &contraction.replacement.address;
            if let Some(next) = remap.get(target)
                && *next != target
            {
                return Err(CredError::Parameter(format!(
                    "chained contraction: {} is a replacement and is also contracted into {}",
                    target, next
                )));
            }
        }

        let mut result = Graph::new();
        for node in self.nodes.values() {
            if !remap.contains_key(&node.address) {
                result.add_node(node.clone())?;
            }
        }
        for contraction in contractions {
            result.add_node(contraction.replacement.clone())?;
        }
        for edge in self.edges.values() {
            let rewrite = |address: &NodeAddress| {
                remap
                    .get(address)
                    .map_or_else(|| address.clone(), |&target| target.clone())
            };
            result.add_edge(Edge::new(
                edge.address.clone(),
                rewrite(&edge.src),
                rewrite(&edge.dst),
                edge.timestamp_ms,
            ))?;
        }
        Ok(result)
    }

    /// Every address that is a node or an edge endpoint.
    fn referenced_addresses(&self) -> BTreeSet<&NodeAddress> {
        self.nodes
            .keys()
            .chain(self.in_edges.keys())
            .chain(self.out_edges.keys())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Cursors
    // -------------------------------------------------------------------------

    /// Detached cursor over nodes under `prefix`.
    #[must_use]
    pub fn node_cursor(&self, prefix: Option<&NodeAddress>) -> NodeCursor {
        NodeCursor {
            prefix: prefix.cloned().unwrap_or_default(),
            expected_modification_count: self.modification_count,
            last: None,
        }
    }

    /// Detached cursor over edges (dangling included) under `prefix`.
    #[must_use]
    pub fn edge_cursor(&self, prefix: Option<&EdgeAddress>) -> EdgeCursor {
        EdgeCursor {
            prefix: prefix.cloned().unwrap_or_default(),
            expected_modification_count: self.modification_count,
            last: None,
        }
    }

    // -------------------------------------------------------------------------
    // Invariants
    // -------------------------------------------------------------------------

    /// Verify the internal consistency of the adjacency index.
    ///
    /// Any failure is a programming error in this module.
    pub fn check_invariants(&self) -> Result<(), CredError> {
        for (address, node) in &self.nodes {
            if &node.address != address {
                return Err(CredError::Invariant(format!(
                    "node stored at {} has address {}",
                    address, node.address
                )));
            }
        }
        for (address, edge) in &self.edges {
            if &edge.address != address {
                return Err(CredError::Invariant(format!(
                    "edge stored at {} has address {}",
                    address, edge.address
                )));
            }
            if !self
                .out_edges
                .get(&edge.src)
                .is_some_and(|set| set.contains(address))
            {
                return Err(CredError::Invariant(format!(
                    "edge {} missing from out-adjacency of {}",
                    address, edge.src
                )));
            }
            if !self
                .in_edges
                .get(&edge.dst)
                .is_some_and(|set| set.contains(address))
            {
                return Err(CredError::Invariant(format!(
                    "edge {} missing from in-adjacency of {}",
                    address, edge.dst
                )));
            }
        }
        check_adjacency(&self.in_edges, &self.edges, "in", |edge| &edge.dst)?;
        check_adjacency(&self.out_edges, &self.edges, "out", |edge| &edge.src)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Index-compressed JSON form.
    #[must_use]
    pub fn to_json(&self) -> GraphJson {
        let sorted: Vec<&NodeAddress> = self.referenced_addresses().into_iter().collect();
        let index: BTreeMap<&NodeAddress, usize> =
            sorted.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        let position = |address: &NodeAddress| index.get(address).copied().unwrap_or_default();

        GraphJson {
            sorted_node_addresses: sorted.iter().map(|&a| a.clone()).collect(),
            nodes: self
                .nodes
                .values()
                .map(|node| IndexedNodeJson {
                    index: position(&node.address),
                    description: node.description.clone(),
                    timestamp_ms: node.timestamp_ms,
                })
                .collect(),
            edges: self
                .edges
                .values()
                .map(|edge| IndexedEdgeJson {
                    address: edge.address.clone(),
                    src_index: position(&edge.src),
                    dst_index: position(&edge.dst),
                    timestamp_ms: edge.timestamp_ms,
                })
                .collect(),
        }
    }

    /// Rebuild a graph from its JSON form.
    pub fn from_json(json: &GraphJson) -> Result<Graph, CredError> {
        let addresses = &json.sorted_node_addresses;
        if addresses.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(CredError::Serialization(
                "sortedNodeAddresses is not strictly sorted".to_string(),
            ));
        }
        let lookup = |index: usize| {
            addresses.get(index).cloned().ok_or_else(|| {
                CredError::Serialization(format!("node index {} out of range", index))
            })
        };

        let mut graph = Graph::new();
        for node in &json.nodes {
            graph.add_node(Node {
                address: lookup(node.index)?,
                description: node.description.clone(),
                timestamp_ms: node.timestamp_ms,
            })?;
        }
        for edge in &json.edges {
            graph.add_edge(Edge::new(
                edge.address.clone(),
                lookup(edge.src_index)?,
                lookup(edge.dst_index)?,
                edge.timestamp_ms,
            ))?;
        }
        Ok(graph)
    }
}

fn detach(
    index: &mut BTreeMap<NodeAddress, BTreeSet<EdgeAddress>>,
    node: &NodeAddress,
    edge: &EdgeAddress,
) {
    if let Some(set) = index.get_mut(node) {
        set.remove(edge);
        if set.is_empty() {
            index.remove(node);
        }
    }
}

fn check_adjacency(
    index: &BTreeMap<NodeAddress, BTreeSet<EdgeAddress>>,
    edges: &BTreeMap<EdgeAddress, Edge>,
    label: &str,
    endpoint: impl Fn(&Edge) -> &NodeAddress,
) -> Result<(), CredError> {
    let mut total = 0usize;
    for (node, set) in index {
        if set.is_empty() {
            return Err(CredError::Invariant(format!(
                "empty {}-adjacency entry for {}",
                label, node
            )));
        }
        for address in set {
            match edges.get(address) {
                Some(edge) if endpoint(edge) == node => {}
                Some(_) => {
                    return Err(CredError::Invariant(format!(
                        "edge {} listed in {}-adjacency of wrong node {}",
                        address, label, node
                    )));
                }
                None => {
                    return Err(CredError::Invariant(format!(
                        "{}-adjacency of {} references missing edge {}",
                        label, node, address
                    )));
                }
            }
        }
        total = total.saturating_add(set.len());
    }
    if total != edges.len() {
        return Err(CredError::Invariant(format!(
            "{}-adjacency holds {} entries for {} edges",
            label,
            total,
            edges.len()
        )));
    }
    Ok(())
}

// =============================================================================
// CURSORS
// =============================================================================

/// Iterates nodes without borrowing the graph; fails fast on modification.
#[derive(Debug, Clone)]
pub struct NodeCursor {
    prefix: NodeAddress,
    expected_modification_count: u64,
    last: Option<NodeAddress>,
}

impl NodeCursor {
    /// Yield the next node, or `None` when exhausted.
    pub fn advance(&mut self, graph: &Graph) -> Result<Option<Node>, CredError> {
        if graph.modification_count != self.expected_modification_count {
            return Err(CredError::ConcurrentModification);
        }
        let lower = match &self.last {
            Some(last) => Bound::Excluded(last),
            None => Bound::Included(&self.prefix),
        };
        let next = graph
            .nodes
            .range::<NodeAddress, _>((lower, Bound::Unbounded))
            .next()
            .filter(|(address, _)| address.has_prefix(&self.prefix))
            .map(|(_, node)| node.clone());
        if let Some(node) = &next {
            self.last = Some(node.address.clone());
        }
        Ok(next)
    }
}

/// Iterates edges without borrowing the graph; fails fast on modification.
#[derive(Debug, Clone)]
pub struct EdgeCursor {
    prefix: EdgeAddress,
    expected_modification_count: u64,
    last: Option<EdgeAddress>,
}

impl EdgeCursor {
    /// Yield the next edge, or `None` when exhausted.
    pub fn advance(&mut self, graph: &Graph) -> Result<Option<Edge>, CredError> {
        if graph.modification_count != self.expected_modification_count {
            return Err(CredError::ConcurrentModification);
        }
        let lower = match &self.last {
            Some(last) => Bound::Excluded(last),
            None => Bound::Included(&self.prefix),
        };
        let next = graph
            .edges
            .range::<EdgeAddress, _>((lower, Bound::Unbounded))
            .next()
            .filter(|(address, _)| address.has_prefix(&self.prefix))
            .map(|(_, edge)| edge.clone());
        if let Some(edge) = &next {
            self.last = Some(edge.address.clone());
        }
        Ok(next)
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Index-compressed JSON representation of a graph.
///
/// `sorted_node_addresses` holds every node address and every endpoint of a
/// dangling edge; nodes and edges refer to it by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphJson {
    pub sorted_node_addresses: Vec<NodeAddress>,
    pub nodes: Vec<IndexedNodeJson>,
    pub edges: Vec<IndexedEdgeJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedNodeJson {
    pub index: usize,
    pub description: String,
    pub timestamp_ms: Option<TimestampMs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedEdgeJson {
    pub address: EdgeAddress,
    pub src_index: usize,
    pub dst_index: usize,
    pub timestamp_ms: TimestampMs,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn na(parts: &[&str]) -> NodeAddress {
        NodeAddress::from_parts(parts).expect("node address")
    }

    fn ea(parts: &[&str]) -> EdgeAddress {
        EdgeAddress::from_parts(parts).expect("edge address")
    }

    fn node(name: &str) -> Node {
        Node::new(na(&[name]), name, 0)
    }

    fn edge(name: &str, src: &str, dst: &str) -> Edge {
        Edge::new(ea(&[name]), na(&[src]), na(&[dst]), 0)
    }

    fn neighbor_names(graph: &Graph, target: &str, direction: Direction) -> Vec<String> {
        graph
            .neighbors(&na(&[target]), &NeighborsOptions::new(direction))
            .expect("neighbors")
            .map(|n| n.edge.address.to_parts().join("/"))
            .collect()
    }

    #[test]
    fn add_and_lookup_node() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        assert!(graph.has_node(&na(&["a"])));
        assert_eq!(graph.node(&na(&["a"])), Some(&node("a")));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn add_node_idempotent() {
        let mut once = Graph::new();
        once.add_node(node("a")).expect("add");
        let mut twice = Graph::new();
        twice.add_node(node("a")).expect("add");
        twice.add_node(node("a")).expect("add again");
        assert_eq!(once, twice);
    }

    #[test]
    fn conflicting_node_rejected() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        let result = graph.add_node(Node::new(na(&["a"]), "different", 0));
        assert!(matches!(result, Err(CredError::Conflict(_))));
    }

    #[test]
    fn conflicting_edge_rejected() {
        let mut graph = Graph::new();
        graph.add_edge(edge("e", "a", "b")).expect("add");
        graph.add_edge(edge("e", "a", "b")).expect("idempotent");
        let result = graph.add_edge(edge("e", "a", "c"));
        assert!(matches!(result, Err(CredError::Conflict(_))));
    }

    #[test]
    fn remove_node_keeps_dangling_edges() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        graph.add_node(node("b")).expect("add");
        graph.add_edge(edge("e", "a", "b")).expect("add");
        assert_eq!(graph.is_dangling_edge(&ea(&["e"])), Some(false));

        graph.remove_node(&na(&["b"])).expect("remove");
        assert!(graph.has_edge(&ea(&["e"])));
        assert_eq!(graph.is_dangling_edge(&ea(&["e"])), Some(true));
        assert_eq!(graph.is_dangling_edge(&ea(&["missing"])), None);

        graph.add_node(node("b")).expect("re-add");
        assert_eq!(graph.is_dangling_edge(&ea(&["e"])), Some(false));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut graph = Graph::new();
        graph.add_edge(edge("e", "a", "b")).expect("add");
        graph.remove_edge(&ea(&["e"])).expect("remove");
        graph.remove_edge(&ea(&["e"])).expect("remove again");
        graph.remove_node(&na(&["a"])).expect("remove absent node");
        assert_eq!(graph, Graph::new());
        graph.check_invariants().expect("invariants");
    }

    #[test]
    fn nodes_sorted_and_prefix_filtered() {
        let mut graph = Graph::new();
        for parts in [&["b"][..], &["a", "2"], &["a", "1"], &["ab"]] {
            graph
                .add_node(Node::timeless(na(parts), "x"))
                .expect("add");
        }
        let all: Vec<_> = graph.nodes().map(|n| n.address.clone()).collect();
        assert_eq!(all, vec![na(&["a", "1"]), na(&["a", "2"]), na(&["ab"]), na(&["b"])]);

        let under_a: Vec<_> = graph
            .nodes_with_prefix(&na(&["a"]))
            .map(|n| n.address.clone())
            .collect();
        assert_eq!(under_a, vec![na(&["a", "1"]), na(&["a", "2"])]);
    }

    #[test]
    fn edges_filtered_by_dangling_and_prefixes() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        graph.add_node(node("b")).expect("add");
        graph.add_edge(edge("ab", "a", "b")).expect("add");
        graph.add_edge(edge("ax", "a", "x")).expect("add");
        graph.add_edge(edge("ba", "b", "a")).expect("add");

        assert_eq!(graph.edges(&EdgesOptions::all()).count(), 3);
        assert_eq!(graph.edges(&EdgesOptions::non_dangling()).count(), 2);

        let from_a = EdgesOptions {
            show_dangling: true,
            src_prefix: Some(na(&["a"])),
            ..EdgesOptions::default()
        };
        assert_eq!(graph.edges(&from_a).count(), 2);

        let to_a = EdgesOptions {
            show_dangling: true,
            dst_prefix: Some(na(&["a"])),
            ..EdgesOptions::default()
        };
        let names: Vec<_> = graph.edges(&to_a).map(|e| e.address.clone()).collect();
        assert_eq!(names, vec![ea(&["ba"])]);

        let by_address = EdgesOptions {
            show_dangling: true,
            address_prefix: Some(ea(&["ax"])),
            ..EdgesOptions::default()
        };
        assert_eq!(graph.edges(&by_address).count(), 1);
    }

    #[test]
    fn neighbors_follow_direction() {
        let mut graph = Graph::new();
        for name in ["a", "b", "c"] {
            graph.add_node(node(name)).expect("add");
        }
        graph.add_edge(edge("ab", "a", "b")).expect("add");
        graph.add_edge(edge("cb", "c", "b")).expect("add");
        graph.add_edge(edge("bc", "b", "c")).expect("add");

        assert_eq!(neighbor_names(&graph, "b", Direction::In), vec!["ab", "cb"]);
        assert_eq!(neighbor_names(&graph, "b", Direction::Out), vec!["bc"]);
        assert_eq!(neighbor_names(&graph, "b", Direction::Any), vec!["ab", "cb", "bc"]);
    }

    #[test]
    fn loop_edge_yields_one_neighbor() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        graph.add_edge(edge("loop", "a", "a")).expect("add");
        for direction in [Direction::In, Direction::Out, Direction::Any] {
            assert_eq!(neighbor_names(&graph, "a", direction), vec!["loop"]);
        }
    }

    #[test]
    fn dangling_edges_yield_no_neighbors() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        graph.add_edge(edge("ax", "a", "x")).expect("add");
        assert!(neighbor_names(&graph, "a", Direction::Any).is_empty());
    }

    #[test]
    fn neighbors_of_missing_node_fails() {
        let graph = Graph::new();
        let result = graph.neighbors(&na(&["nope"]), &NeighborsOptions::default());
        assert!(matches!(result, Err(CredError::MissingReference(_))));
    }

    #[test]
    fn neighbors_respect_prefixes() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        graph.add_node(Node::new(na(&["user", "x"]), "x", 0)).expect("add");
        graph.add_node(node("b")).expect("add");
        graph
            .add_edge(Edge::new(ea(&["auth", "1"]), na(&["user", "x"]), na(&["a"]), 0))
            .expect("add");
        graph.add_edge(edge("ref", "b", "a")).expect("add");

        let options = NeighborsOptions {
            direction: Direction::In,
            node_prefix: na(&["user"]),
            edge_prefix: EdgeAddress::empty(),
        };
        let found: Vec<_> = graph
            .neighbors(&na(&["a"]), &options)
            .expect("neighbors")
            .map(|n| n.node.address.clone())
            .collect();
        assert_eq!(found, vec![na(&["user", "x"])]);

        let options = NeighborsOptions {
            direction: Direction::In,
            node_prefix: NodeAddress::empty(),
            edge_prefix: ea(&["ref"]),
        };
        assert_eq!(graph.neighbors(&na(&["a"]), &options).expect("neighbors").count(), 1);
    }

    #[test]
    fn merge_is_commutative() {
        let mut g1 = Graph::new();
        g1.add_node(node("a")).expect("add");
        g1.add_edge(edge("ab", "a", "b")).expect("add");
        let mut g2 = Graph::new();
        g2.add_node(node("b")).expect("add");
        g2.add_edge(edge("ab", "a", "b")).expect("add");

        let m1 = Graph::merge([&g1, &g2]).expect("merge");
        let m2 = Graph::merge([&g2, &g1]).expect("merge");
        assert_eq!(m1, m2);
        assert_eq!(m1.node_count(), 2);
        assert_eq!(m1.edge_count(), 1);
    }

    #[test]
    fn merge_rejects_conflicting_edges() {
        let mut g1 = Graph::new();
        g1.add_edge(edge("e", "a", "b")).expect("add");
        let mut g2 = Graph::new();
        g2.add_edge(edge("e", "b", "a")).expect("add");
        assert!(Graph::merge([&g1, &g2]).is_err());
    }

    #[test]
    fn contract_nodes_rewrites_endpoints() {
        let mut graph = Graph::new();
        for name in ["a1", "a2", "b"] {
            graph.add_node(node(name)).expect("add");
        }
        graph.add_edge(edge("e1", "a1", "b")).expect("add");
        graph.add_edge(edge("e2", "b", "a2")).expect("add");
        graph.add_edge(edge("e3", "a1", "a2")).expect("add");

        let contracted = graph
            .contract_nodes(&[NodeContraction {
                old: vec![na(&["a1"]), na(&["a2"])],
                replacement: node("a"),
            }])
            .expect("contract");

        assert!(!contracted.has_node(&na(&["a1"])));
        assert!(contracted.has_node(&na(&["a"])));
        let e1 = contracted.edge(&ea(&["e1"])).expect("e1");
        assert_eq!(e1.src, na(&["a"]));
        let e3 = contracted.edge(&ea(&["e3"])).expect("e3");
        assert!(e3.is_loop());
        contracted.check_invariants().expect("invariants");
    }

    #[test]
    fn chained_contraction_rejected() {
        let graph = Graph::new();
        let result = graph.contract_nodes(&[
            NodeContraction {
                old: vec![na(&["a"])],
                replacement: node("b"),
            },
            NodeContraction {
                old: vec![na(&["b"])],
                replacement: node("c"),
            },
        ]);
        assert!(matches!(result, Err(CredError::Parameter(_))));
    }

    #[test]
    fn cursor_detects_concurrent_modification() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        graph.add_node(node("b")).expect("add");

        let mut cursor = graph.node_cursor(None);
        assert_eq!(cursor.advance(&graph).expect("first").map(|n| n.address), Some(na(&["a"])));
        graph.add_node(node("c")).expect("add");
        assert!(matches!(
            cursor.advance(&graph),
            Err(CredError::ConcurrentModification)
        ));
    }

    #[test]
    fn cursors_walk_in_order() {
        let mut graph = Graph::new();
        graph.add_node(node("b")).expect("add");
        graph.add_node(node("a")).expect("add");
        graph.add_edge(edge("y", "a", "b")).expect("add");
        graph.add_edge(edge("x", "b", "zz")).expect("add");

        let mut nodes = Vec::new();
        let mut cursor = graph.node_cursor(None);
        while let Some(node) = cursor.advance(&graph).expect("advance") {
            nodes.push(node.address);
        }
        assert_eq!(nodes, vec![na(&["a"]), na(&["b"])]);

        let mut edges = Vec::new();
        let mut cursor = graph.edge_cursor(None);
        while let Some(edge) = cursor.advance(&graph).expect("advance") {
            edges.push(edge.address);
        }
        assert_eq!(edges, vec![ea(&["x"]), ea(&["y"])]);
    }

    #[test]
    fn modification_count_increments() {
        let mut graph = Graph::new();
        assert_eq!(graph.modification_count(), 0);
        graph.add_node(node("a")).expect("add");
        graph.add_node(node("a")).expect("add again");
        assert_eq!(graph.modification_count(), 2);
    }

    #[test]
    fn json_roundtrip_includes_dangling_endpoints() {
        let mut graph = Graph::new();
        graph.add_node(node("a")).expect("add");
        graph.add_node(Node::timeless(na(&["u"]), "user")).expect("add");
        graph.add_edge(edge("ax", "a", "x")).expect("add");
        graph.add_edge(edge("ua", "u", "a")).expect("add");

        let json = graph.to_json();
        assert_eq!(json.sorted_node_addresses, vec![na(&["a"]), na(&["u"]), na(&["x"])]);
        let restored = Graph::from_json(&json).expect("from json");
        assert_eq!(restored, graph);
    }

    #[test]
    fn from_json_rejects_bad_index() {
        let json = GraphJson {
            sorted_node_addresses: vec![na(&["a"])],
            nodes: vec![IndexedNodeJson {
                index: 3,
                description: "a".to_string(),
                timestamp_ms: None,
            }],
            edges: vec![],
        };
        assert!(matches!(
            Graph::from_json(&json),
            Err(CredError::Serialization(_))
        ));
    }
}
