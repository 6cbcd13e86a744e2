//! # Credrank Benchmarks
//!
//! Performance benchmarks for the scoring pipeline.
//!
//! Run with: `cargo bench -p credrank-core`

use credrank_core::primitives::WEEK_MS;
use credrank_core::{
    CredrankInput, Edge, EdgeAddress, EdgeType, EdgeWeight, Graph, MarkovProcessGraph, NoYield,
    Node, NodeAddress, NodeType, OrderedSparseMarkovChain, PagerankOptions, PagerankParams,
    PluginDeclaration, WeightedGraph, Weights, compute_cred, find_stationary_distribution,
    graph_intervals, participants_from_graph,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const USERS: usize = 20;

fn user(i: usize) -> NodeAddress {
    NodeAddress::from_parts(["bench", "forum", "user", i.to_string().as_str()]).expect("address")
}

fn post(i: usize) -> NodeAddress {
    NodeAddress::from_parts(["bench", "forum", "post", i.to_string().as_str()]).expect("address")
}

fn declaration() -> PluginDeclaration {
    let user_type = NodeType {
        name: "user".to_string(),
        plural_name: "users".to_string(),
        prefix: NodeAddress::from_parts(["bench", "forum", "user"]).expect("address"),
        default_weight: 0.0,
        description: String::new(),
    };
    let post_type = NodeType {
        name: "post".to_string(),
        plural_name: "posts".to_string(),
        prefix: NodeAddress::from_parts(["bench", "forum", "post"]).expect("address"),
        default_weight: 1.0,
        description: String::new(),
    };
    PluginDeclaration {
        name: "forum".to_string(),
        node_prefix: NodeAddress::from_parts(["bench", "forum"]).expect("address"),
        edge_prefix: EdgeAddress::from_parts(["bench", "forum"]).expect("address"),
        node_types: vec![user_type.clone(), post_type],
        edge_types: vec![
            EdgeType {
                forward_name: "authors".to_string(),
                backward_name: "is authored by".to_string(),
                prefix: EdgeAddress::from_parts(["bench", "forum", "authors"]).expect("address"),
                default_weight: EdgeWeight::new(0.5, 1.0),
                description: String::new(),
            },
            EdgeType {
                forward_name: "replies to".to_string(),
                backward_name: "is replied to by".to_string(),
                prefix: EdgeAddress::from_parts(["bench", "forum", "replies"]).expect("address"),
                default_weight: EdgeWeight::new(1.0, 0.25),
                description: String::new(),
            },
        ],
        user_types: vec![user_type],
    }
}

/// `size` posts spread over ten weeks, each authored by a user and replying
/// to an earlier post.
fn create_forum_graph(size: usize) -> Graph {
    let mut graph = Graph::new();
    for i in 0..USERS {
        graph
            .add_node(Node::timeless(user(i), format!("user {}", i)))
            .expect("user");
    }
    let step = (10 * WEEK_MS) / size.max(1) as i64;
    for i in 0..size {
        let t = i as i64 * step;
        let id = i.to_string();
        graph.add_node(Node::new(post(i), format!("post {}", i), t)).expect("post");
        graph
            .add_edge(Edge::new(
                EdgeAddress::from_parts(["bench", "forum", "authors", id.as_str()])
                    .expect("address"),
                user(i % USERS),
                post(i),
                t,
            ))
            .expect("authors");
        if i > 0 {
            graph
                .add_edge(Edge::new(
                    EdgeAddress::from_parts(["bench", "forum", "replies", id.as_str()])
                        .expect("address"),
                    post(i),
                    post(i / 2),
                    t,
                ))
                .expect("replies");
        }
    }
    graph
}

fn weighted_forum(size: usize) -> WeightedGraph {
    let weights = credrank_core::weights_for_declarations(&[declaration()]).expect("weights");
    WeightedGraph::new(create_forum_graph(size), weights)
}

fn forum_mpg(size: usize) -> MarkovProcessGraph {
    let weighted = weighted_forum(size);
    let participants = participants_from_graph(&weighted.graph, &[declaration()]);
    let intervals = graph_intervals(&weighted.graph, Default::default()).expect("intervals");
    let params = credrank_core::CredParams::default();
    MarkovProcessGraph::new(
        &weighted,
        &participants,
        &intervals,
        &params.transition_probabilities(),
    )
    .expect("mpg")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_graph_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_insertion");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_forum_graph(size)));
        });
    }

    group.finish();
}

fn bench_mpg_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpg_construction");

    for size in [100, 1000, 5000].iter() {
        let weighted = weighted_forum(*size);
        let participants = participants_from_graph(&weighted.graph, &[declaration()]);
        let intervals = graph_intervals(&weighted.graph, Default::default()).expect("intervals");
        let params = credrank_core::CredParams::default().transition_probabilities();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(MarkovProcessGraph::new(&weighted, &participants, &intervals, &params))
            });
        });
    }

    group.finish();
}

fn bench_power_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("power_iteration");
    group.sample_size(20);

    for size in [100, 1000, 5000].iter() {
        let ordered =
            OrderedSparseMarkovChain::from_process_graph(&forum_mpg(*size), 1e-3).expect("chain");

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(find_stationary_distribution(
                    &ordered.chain,
                    &PagerankParams::default(),
                    &PagerankOptions::default(),
                    &mut NoYield,
                ))
            });
        });
    }

    group.finish();
}

fn bench_compute_cred(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_cred");
    group.sample_size(10);

    for size in [100, 1000].iter() {
        let input = CredrankInput {
            weighted_graph: WeightedGraph::new(create_forum_graph(*size), Weights::new()),
            plugins: vec![declaration()],
            ..CredrankInput::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(compute_cred(&input, &mut NoYield)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_insertion,
    bench_mpg_construction,
    bench_power_iteration,
    bench_compute_cred,
);
criterion_main!(benches);
