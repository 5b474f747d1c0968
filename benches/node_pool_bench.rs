// Criterion benchmarks for transport-node-pool
//
// Run benchmarks with:
//   cargo bench --bench node_pool_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::thread;
use transport_node_pool::node::{NodeConfig, Scheme};
use transport_node_pool::pool::{NodePool, PoolConfig};
use transport_node_pool::utils::parse_cloud_id;

fn node_configs(count: u16) -> Vec<NodeConfig> {
    (0..count)
        .map(|port| NodeConfig::new(Scheme::Http, "localhost", 9200 + port))
        .collect()
}

fn bench_pool_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_creation");

    for count in [1u16, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let configs = node_configs(count);
            b.iter(|| NodePool::new(black_box(configs.clone()), |_| (), PoolConfig::default()));
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for selector in ["random", "round_robin"] {
        for count in [2u16, 10, 50].iter() {
            let pool =
                NodePool::new(node_configs(*count), |_| (), PoolConfig::new(selector)).unwrap();
            group.bench_with_input(
                BenchmarkId::new(selector, count),
                count,
                |b, _| b.iter(|| black_box(pool.get())),
            );
        }
    }

    group.finish();
}

fn bench_mark_dead_and_live(c: &mut Criterion) {
    let mut group = c.benchmark_group("health_transitions");

    group.bench_function("mark_dead_then_live_10_nodes", |b| {
        let pool = NodePool::new(node_configs(10), |_| (), PoolConfig::default()).unwrap();
        b.iter(|| {
            let node = pool.get();
            pool.mark_dead(&node);
            pool.mark_live(black_box(&node));
        });
    });

    group.bench_function("get_all_dead_10_nodes", |b| {
        let pool = NodePool::new(node_configs(10), |_| (), PoolConfig::default()).unwrap();
        for node in pool.all() {
            pool.mark_dead(&node);
        }
        b.iter(|| black_box(pool.get()));
    });

    group.finish();
}

fn bench_contended_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_get");

    group.bench_function("4_threads_1000_gets", |b| {
        let pool = NodePool::new(node_configs(8), |_| (), PoolConfig::round_robin()).unwrap();
        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..250 {
                            black_box(pool.get());
                        }
                    });
                }
            });
        });
    });

    group.finish();
}

fn bench_parse_cloud_id(c: &mut Criterion) {
    c.bench_function("parse_cloud_id", |b| {
        let cloud_id = "cluster:dXMtZWFzdC0xLmF3cy5mb3VuZC5pbyQ0ZmE4ODIxZTc1NjM0MDMyYmVk\
                        MWNmMjIxMTBlMmY5NyQ0ZmE4ODIxZTc1NjM0MDMyYmVkMWNmMjIxMTBlMmY5Ng==";
        b.iter(|| parse_cloud_id(black_box(cloud_id)));
    });
}

criterion_group!(
    benches,
    bench_pool_creation,
    bench_get,
    bench_mark_dead_and_live,
    bench_contended_get,
    bench_parse_cloud_id
);
criterion_main!(benches);
