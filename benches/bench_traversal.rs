use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::json;
use simplegraph::{Direction, EdgeSpec, GraphConfig, NewNode, SimpleGraph};
use tempfile::TempDir;

const LINE_SEED: u64 = 0xDD21;
const ER_SEED: u64 = 0xEE45;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

enum GraphShape {
    Line,
    RandomErdosRenyi { edges: usize },
}

struct PreparedGraph {
    _dir: TempDir,
    graph: SimpleGraph,
    nodes: usize,
    label: &'static str,
}

fn bench_scale() -> usize {
    #[cfg(feature = "bench-ci")]
    {
        1_000
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        5_000
    }
}

fn prepared_graphs() -> Vec<PreparedGraph> {
    let nodes = bench_scale();
    vec![
        materialize(GraphShape::Line, nodes, LINE_SEED, "line"),
        materialize(
            GraphShape::RandomErdosRenyi {
                edges: nodes.saturating_mul(3),
            },
            nodes,
            ER_SEED,
            "er",
        ),
    ]
}

fn bench_neighbors(c: &mut Criterion) {
    let graphs = prepared_graphs();
    let mut group = c.benchmark_group("neighbors");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        let start = (prepared.nodes / 2).to_string();
        group.bench_function(prepared.label, |b| {
            b.iter(|| prepared.graph.find_neighbors(&start).expect("neighbors"));
        });
    }
    group.finish();
}

fn bench_traverse(c: &mut Criterion) {
    let graphs = prepared_graphs();
    let mut group = c.benchmark_group("traverse");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        let end = (prepared.nodes - 1).to_string();
        group.bench_function(prepared.label, |b| {
            b.iter(|| {
                prepared
                    .graph
                    .traverse("0", Some(&end), Direction::Outbound)
                    .expect("traverse")
            });
        });
    }
    group.finish();
}

fn bench_shortest_paths(c: &mut Criterion) {
    let graphs = prepared_graphs();
    let mut group = c.benchmark_group("shortest_path");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for prepared in &graphs {
        let end = (prepared.nodes - 1).to_string();
        group.bench_function(prepared.label, |b| {
            b.iter(|| {
                prepared
                    .graph
                    .shortest_path("0", &end, Direction::Both)
                    .expect("shortest")
            });
        });
    }
    group.finish();
}

fn materialize(shape: GraphShape, nodes: usize, seed: u64, label: &'static str) -> PreparedGraph {
    let dir = tempfile::tempdir().expect("tempdir");
    let graph = SimpleGraph::initialize(dir.path().join("bench.sqlite"), GraphConfig::default())
        .expect("graph");
    let batch: Vec<NewNode> = (0..nodes)
        .map(|idx| {
            let body = json!({"name": format!("node_{idx}"), "rank": idx});
            NewNode::new(body.as_object().cloned().unwrap_or_default()).with_id(idx.to_string())
        })
        .collect();
    graph.add_nodes(&batch).expect("nodes");

    let mut rng = StdRng::seed_from_u64(seed);
    let edges: Vec<EdgeSpec> = match shape {
        GraphShape::Line => (1..nodes)
            .map(|idx| EdgeSpec::new((idx - 1).to_string(), idx.to_string()))
            .collect(),
        GraphShape::RandomErdosRenyi { edges } => (0..edges)
            .map(|_| {
                let from = rng.gen_range(0..nodes);
                let to = rng.gen_range(0..nodes);
                EdgeSpec::new(from.to_string(), to.to_string())
            })
            .collect(),
    };
    graph.connect_many_nodes(&edges).expect("edges");
    PreparedGraph {
        _dir: dir,
        graph,
        nodes,
        label,
    }
}

criterion_group!(
    name = traversal_benches;
    config = Criterion::default();
    targets = bench_neighbors, bench_traverse, bench_shortest_paths
);
criterion_main!(traversal_benches);
