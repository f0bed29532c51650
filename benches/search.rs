//! Criterion benchmarks for refgraph over a Go web application fixture.
//!
//! Loads the Go benchmark fixture, then measures workspace loading, edge
//! search under different configurations, and graph rendering.
//!
//! Run with: `cargo bench --bench search`

use criterion::{criterion_group, criterion_main, Criterion};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use refgraph::oracle::{self, Workspace};
use refgraph::profile::Counters;
use refgraph::render::{DotNodeWriter, DotPackageWriter, JsonWriter, RenderOptions, Writer};
use refgraph::search::{SearchConfig, Searcher, UseEdge};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("benchmarks")
        .join("fixtures")
        .join("webapp_go")
}

/// Parse and resolve the fixture once for the search and render benches.
fn setup_workspace() -> Arc<Workspace> {
    let counters = Counters::default();
    Arc::new(oracle::load(&[fixture_dir()], &counters).expect("load fixture"))
}

fn collect_edges(ws: &Arc<Workspace>, config: SearchConfig) -> Vec<UseEdge> {
    let searcher = Searcher::new(Arc::clone(ws), config, Arc::new(Counters::default()));
    searcher.search().expect("spawn search").collect()
}

fn bench_load(c: &mut Criterion) {
    let dirs = [fixture_dir()];

    c.bench_function("load_workspace", |b| {
        b.iter(|| {
            let counters = Counters::default();
            oracle::load(&dirs, &counters).expect("load fixture")
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let ws = setup_workspace();

    c.bench_function("search_exported", |b| {
        b.iter(|| collect_edges(&ws, SearchConfig::default()))
    });

    c.bench_function("search_private", |b| {
        b.iter(|| {
            collect_edges(
                &ws,
                SearchConfig {
                    include_private: true,
                    ..SearchConfig::default()
                },
            )
        })
    });

    c.bench_function("search_all_targets", |b| {
        b.iter(|| {
            collect_edges(
                &ws,
                SearchConfig {
                    include_private: true,
                    include_foreign: true,
                    include_builtin: true,
                    ..SearchConfig::default()
                },
            )
        })
    });

    c.bench_function("search_single_worker", |b| {
        b.iter(|| {
            collect_edges(
                &ws,
                SearchConfig {
                    workers: 1,
                    include_private: true,
                    ..SearchConfig::default()
                },
            )
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let ws = setup_workspace();
    let edges = collect_edges(
        &ws,
        SearchConfig {
            include_private: true,
            ..SearchConfig::default()
        },
    );

    c.bench_function("render_dot_nodes", |b| {
        b.iter(|| {
            let mut writer =
                DotNodeWriter::new(Vec::new(), Arc::clone(&ws), RenderOptions::default());
            for edge in &edges {
                writer.write(edge).expect("write edge");
            }
            writer.flush().expect("flush");
        })
    });

    c.bench_function("render_dot_packages", |b| {
        b.iter(|| {
            let mut writer = DotPackageWriter::new(Vec::new(), RenderOptions::default());
            for edge in &edges {
                writer.write(edge).expect("write edge");
            }
            writer.flush().expect("flush");
        })
    });

    c.bench_function("render_json_stat", |b| {
        b.iter(|| {
            let mut writer = JsonWriter::new(Vec::new(), Arc::clone(&ws), true);
            for edge in &edges {
                writer.write(edge).expect("write edge");
            }
            writer.flush().expect("flush");
        })
    });
}

criterion_group!(benches, bench_load, bench_search, bench_render);
criterion_main!(benches);
