use arbor_access::{HierarchyBuilder, ScopeEngine, ScopeResolver};
use arbor_core::{Agent, AgentId, ArborConfig, Principal};
use arbor_storage::{DirectoryView, HierarchyIndex, InMemoryDirectory};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

/// Balanced tree with `fanout` children per agent, `depth` levels deep.
fn tree(fanout: usize, depth: usize) -> Vec<Agent> {
    let mut agents = vec![Agent::new("root", "Root", 0)];
    let mut frontier = vec![AgentId::from("root")];
    for level in 1..=depth {
        let mut next = Vec::with_capacity(frontier.len() * fanout);
        for parent in &frontier {
            for i in 0..fanout {
                let id = AgentId::new(format!("{}.{}", parent, i));
                agents.push(Agent::new(id.clone(), id.as_str(), level as i32).with_parent(parent.clone()));
                next.push(id);
            }
        }
        frontier = next;
    }
    agents
}

fn bench_hierarchy_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy/build_admin");
    for (fanout, depth) in [(4, 4), (8, 4), (10, 4)] {
        let agents = tree(fanout, depth);
        let directory = InMemoryDirectory::load_unchecked(agents.clone());
        let engine = ScopeEngine::new(Arc::new(directory));
        group.bench_with_input(BenchmarkId::from_parameter(agents.len()), &engine, |b, engine| {
            b.iter(|| {
                let forest = engine.build_hierarchy(black_box(&Principal::Admin)).expect("build");
                black_box(forest.len());
            });
        });
    }
    group.finish();
}

fn bench_resolve_index_vs_directory(c: &mut Criterion) {
    let agents = tree(8, 4);
    let directory = InMemoryDirectory::load_unchecked(agents.clone());
    let index = HierarchyIndex::from_agents(agents);
    let root = AgentId::from("root");

    c.bench_function("resolve/index", |b| {
        b.iter(|| {
            let scope = ScopeResolver::new(&index).resolve(black_box(&root)).expect("resolve");
            black_box(scope.len());
        });
    });

    c.bench_function("resolve/directory", |b| {
        let view = DirectoryView::new(&directory);
        b.iter(|| {
            let scope = ScopeResolver::new(&view).resolve(black_box(&root)).expect("resolve");
            black_box(scope.len());
        });
    });

    c.bench_function("hierarchy/builder_only", |b| {
        b.iter(|| {
            let forest = HierarchyBuilder::new(&index).build(&Principal::Admin).expect("build");
            black_box(forest.len());
        });
    });
}

fn bench_cached_scope(c: &mut Criterion) {
    let agents = tree(8, 4);
    let directory = Arc::new(InMemoryDirectory::load_unchecked(agents));
    let cached = ScopeEngine::new(Arc::clone(&directory));
    let uncached = ScopeEngine::with_config(directory, ArborConfig::uncached()).expect("config");
    let principal = Principal::bound("root.3");

    c.bench_function("scope/cached", |b| {
        b.iter(|| black_box(cached.resolve_scope(&principal).expect("scope")));
    });
    c.bench_function("scope/uncached", |b| {
        b.iter(|| black_box(uncached.resolve_scope(&principal).expect("scope")));
    });
}

criterion_group!(
    benches,
    bench_hierarchy_build,
    bench_resolve_index_vs_directory,
    bench_cached_scope
);
criterion_main!(benches);
