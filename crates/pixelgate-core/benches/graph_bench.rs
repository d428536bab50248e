//! # Graph Benchmarks
//!
//! Performance benchmarks for pixelgate-core scheduling and evaluation.
//!
//! Run with: `cargo bench -p pixelgate-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pixelgate_core::{
    Blackboard, Condition, Graph, LogicType, Node, NodeId, TickContext, graph_from_json,
    graph_to_json,
};
use std::hint::black_box;

/// A key-driven input feeding a chain of `size` OR gates.
fn create_linear_graph(size: usize) -> Graph {
    let mut graph = Graph::with_max_nodes(size + 1);
    let mut prev = graph
        .add_node(Node::input("key", Condition::KeyPress { key_code: "a".to_string() }).with_id("key"))
        .expect("insert");

    for i in 0..size {
        let gate = graph
            .add_node(Node::process(format!("gate {}", i), LogicType::Or).with_id(format!("g{:05}", i).as_str()))
            .expect("insert");
        graph.add_link(&prev, "Out", &gate, "In1");
        prev = gate;
    }

    graph
}

/// One input fanned out to `size` NOT gates.
fn create_star_graph(size: usize) -> Graph {
    let mut graph = Graph::with_max_nodes(size + 1);
    let hub = graph
        .add_node(Node::input("key", Condition::KeyPress { key_code: "a".to_string() }).with_id("hub"))
        .expect("insert");

    for i in 0..size {
        let spoke = graph
            .add_node(Node::process(format!("spoke {}", i), LogicType::Not).with_id(format!("s{:05}", i).as_str()))
            .expect("insert");
        graph.add_link(&hub, "Out", &spoke, "In1");
    }

    graph
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_topological_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("topological_order");

    for size in [100, 500, 1000].iter() {
        let linear = create_linear_graph(*size);
        group.bench_with_input(BenchmarkId::new("linear", size), size, |b, _| {
            b.iter(|| black_box(linear.topological_order()));
        });

        let star = create_star_graph(*size);
        group.bench_with_input(BenchmarkId::new("star", size), size, |b, _| {
            b.iter(|| black_box(star.topological_order()));
        });
    }

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    let blackboard = Blackboard::new();
    blackboard.set("key_pressed_a", true);

    for size in [100, 500, 1000].iter() {
        let mut graph = create_linear_graph(*size);
        let mut now = 0u64;
        group.bench_with_input(BenchmarkId::new("linear", size), size, |b, _| {
            b.iter(|| {
                now = now.wrapping_add(33);
                black_box(graph.execute_at(&TickContext::new(&blackboard).at(now)))
            });
        });

        let mut star = create_star_graph(*size);
        group.bench_with_input(BenchmarkId::new("star", size), size, |b, _| {
            b.iter(|| black_box(star.execute_at(&TickContext::new(&blackboard).at(0))));
        });
    }

    group.finish();
}

fn bench_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("document");

    for size in [100, 500].iter() {
        let graph = create_linear_graph(*size);
        let text = graph_to_json(&graph).expect("serialize");

        group.bench_with_input(BenchmarkId::new("to_json", size), size, |b, _| {
            b.iter(|| black_box(graph_to_json(&graph)));
        });
        group.bench_with_input(BenchmarkId::new("from_json", size), &text, |b, text| {
            b.iter(|| black_box(graph_from_json(text)));
        });
    }

    group.finish();
}

fn bench_node_lookup(c: &mut Criterion) {
    let graph = create_linear_graph(1000);
    let target = NodeId::from("g00500");

    c.bench_function("node_lookup", |b| {
        b.iter(|| black_box(graph.node(&target)));
    });
}

criterion_group!(
    benches,
    bench_topological_order,
    bench_execute,
    bench_document,
    bench_node_lookup,
);

criterion_main!(benches);
