//! Benchmarks for the layered layout engine.
//!
//! Run with: cargo bench -p flowscope-layout --bench layered_layout_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flowscope_layout::{Direction, Footprint, LayeredGraph, LayoutConfig, layout};
use std::hint::black_box;

/// Workflow-shaped tree: `workflows` roots, each with `agents` children,
/// each with `tools` leaves. Footprints vary by depth.
fn workflow_tree(workflows: usize, agents: usize, tools: usize) -> LayeredGraph {
    let mut g = LayeredGraph::new();
    for _ in 0..workflows {
        let w = g.add_node(Footprint::new(220.0, 64.0));
        for _ in 0..agents {
            let a = g.add_node(Footprint::new(200.0, 96.0));
            g.add_edge(w, a);
            for _ in 0..tools {
                let t = g.add_node(Footprint::new(160.0, 48.0));
                g.add_edge(a, t);
            }
        }
    }
    g
}

/// Deterministic pseudo-random DAG with `n` nodes.
fn random_dag(n: usize) -> LayeredGraph {
    let mut g = LayeredGraph::with_capacity(n, n * 2);
    for _ in 0..n {
        g.add_node(Footprint::new(120.0, 40.0));
    }
    let mut seed: u64 = 42;
    for i in 0..n.saturating_sub(1) {
        let fan_out = 1 + (seed % 3) as usize;
        for _ in 0..fan_out {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let target = i + 1 + (seed as usize % (n - i - 1).max(1));
            if target < n {
                g.add_edge(i, target);
            }
        }
    }
    g
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered_layout");
    let config = LayoutConfig::default();

    for (name, g) in [
        ("tree_small", workflow_tree(1, 3, 2)),
        ("tree_medium", workflow_tree(4, 5, 3)),
        ("random_dag", random_dag(100)),
    ] {
        let n = g.node_count() as u64;
        group.throughput(Throughput::Elements(n));
        for dir in [Direction::TopBottom, Direction::LeftRight] {
            group.bench_with_input(
                BenchmarkId::new(format!("{name}/{dir}"), n),
                &g,
                |b, g| b.iter(|| black_box(layout(black_box(g), dir, &config))),
            );
        }
    }

    group.finish();
}

fn bench_budget(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered_budget");
    let g = random_dag(100);
    for budget in [500usize, 2_000, 10_000] {
        let config = LayoutConfig {
            iteration_budget: budget,
            ..LayoutConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(budget), &config, |b, cfg| {
            b.iter(|| black_box(layout(black_box(&g), Direction::TopBottom, cfg)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_layout, bench_budget);
criterion_main!(benches);
