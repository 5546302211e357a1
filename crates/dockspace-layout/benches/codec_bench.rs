//! Benchmarks for layout encode/decode and snapshotting.
//!
//! Run with: cargo bench -p dockspace-layout

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dockspace_core::{Alignment, DockTree, Factory, Orientation};
use dockspace_layout::{LayoutCodec, build_snapshot};
use std::hint::black_box;

/// Build a layout with `docks` tool docks of `tools` tools each.
fn make_layout(docks: usize, tools: usize) -> DockTree {
    let factory = Factory::new();
    let mut tree = factory.create_layout("Root");
    let root = tree.root();
    let Ok(main) = tree.attach(
        root,
        factory.create_proportional_dock("MainLayout", Orientation::Horizontal),
    ) else {
        return tree;
    };
    for d in 0..docks {
        let Ok(dock) = tree.attach(
            main,
            factory.create_tool_dock(format!("dock-{d}"), Alignment::Left),
        ) else {
            continue;
        };
        for t in 0..tools {
            let _ = tree.attach(dock, factory.create_tool(format!("tool-{d}-{t}"), "Tool", None));
        }
        let _ = tree.attach(main, factory.create_proportional_dock_splitter(""));
    }
    tree
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/encode");
    let codec = LayoutCodec::new();
    for docks in [2, 8, 32] {
        let tree = make_layout(docks, 6);
        group.bench_with_input(BenchmarkId::new("docks", docks), &tree, |b, tree| {
            b.iter(|| black_box(codec.serialize(tree)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/decode");
    let codec = LayoutCodec::new();
    for docks in [2, 8, 32] {
        let Ok(text) = codec.serialize(&make_layout(docks, 6)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("docks", docks), &text, |b, text| {
            b.iter(|| black_box(codec.deserialize(text)))
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot/build");
    for docks in [2, 8, 32] {
        let tree = make_layout(docks, 6);
        group.bench_with_input(BenchmarkId::new("docks", docks), &tree, |b, tree| {
            b.iter(|| black_box(build_snapshot(tree)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_snapshot);
criterion_main!(benches);
