//! Benchmarks for graph queries and evaluation
//!
//! Measures:
//! - Ancestor queries on long chains and dense cyclic graphs
//! - Cold evaluation (empty cache) versus warm evaluation (all cached)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flowgraph_core::{
    CyclePolicy, EvalConfig, Evaluator, FanIn, FlowGraph, GraphConfig, OperatorId,
};

fn link(graph: &mut FlowGraph, from: OperatorId, to: OperatorId) {
    let outlet = graph.operator(from).unwrap().outlets()[0].id();
    let inlet = graph.operator(to).unwrap().inlets()[0].id();
    graph.add_link(outlet, inlet).unwrap();
}

/// op0 -> op1 -> ... -> op(n-1)
fn chain(n: usize) -> (FlowGraph, OperatorId) {
    let mut graph = FlowGraph::new();
    let mut previous = graph.create_operator("op0", "1").unwrap();
    for i in 1..n {
        let next = graph.create_operator(format!("op{i}"), "x + 1").unwrap();
        link(&mut graph, previous, next);
        previous = next;
    }
    (graph, previous)
}

/// Every operator feeds the next few, wrapping around.
fn ring(n: usize, fan: usize) -> (FlowGraph, OperatorId) {
    let mut graph = FlowGraph::with_config(GraphConfig {
        fan_in: FanIn::Multiple,
        ..GraphConfig::default()
    });
    let ids: Vec<OperatorId> = (0..n)
        .map(|i| graph.create_operator(format!("op{i}"), "x * 0.5").unwrap())
        .collect();
    for i in 0..n {
        for step in 1..=fan {
            link(&mut graph, ids[i], ids[(i + step) % n]);
        }
    }
    (graph, ids[0])
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("ancestors");
    for size in [100, 1_000, 10_000] {
        let (graph, tail) = chain(size);
        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, _| {
            b.iter(|| black_box(graph.ancestors(black_box(tail)).unwrap()))
        });

        let (graph, head) = ring(size, 4);
        group.bench_with_input(BenchmarkId::new("ring", size), &size, |b, _| {
            b.iter(|| black_box(graph.ancestors(black_box(head)).unwrap()))
        });
    }
    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    for size in [100, 1_000] {
        let (graph, tail) = chain(size);
        group.bench_with_input(BenchmarkId::new("chain_cold", size), &size, |b, _| {
            b.iter(|| {
                let mut evaluator = Evaluator::new();
                black_box(evaluator.evaluate(&graph, tail).unwrap())
            })
        });

        let mut warm = Evaluator::new();
        warm.evaluate(&graph, tail).unwrap();
        group.bench_with_input(BenchmarkId::new("chain_warm", size), &size, |b, _| {
            b.iter(|| black_box(warm.evaluate(&graph, tail).unwrap()))
        });

        let (graph, head) = ring(size, 4);
        group.bench_with_input(BenchmarkId::new("ring_use_cached", size), &size, |b, _| {
            b.iter(|| {
                let mut evaluator = Evaluator::with_config(EvalConfig {
                    cycle_policy: CyclePolicy::UseCached,
                });
                black_box(evaluator.evaluate(&graph, head).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queries, bench_evaluation);
criterion_main!(benches);
