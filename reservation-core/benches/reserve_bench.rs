//! Benchmarks for the reservation hot path
//!
//! Measures single-caller reserve latency, the cost of full contention (every
//! caller fighting for one resource's lock) versus callers spread across
//! independent resources, and the cancel round-trip.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reservation_core::{Config, Coordinator, RequesterId, ResourceId, ResourceSpec};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

// Large enough that no bench iteration exhausts it
const BENCH_CAPACITY: u32 = u32::MAX;

fn bench_coordinator() -> (Arc<Coordinator>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    config.rocksdb.sync_writes = false; // Measure the protocol, not fsync
    (Arc::new(Coordinator::open(config).unwrap()), temp_dir)
}

fn register(rt: &Runtime, coordinator: &Coordinator, id: &str) {
    rt.block_on(coordinator.register_resource(ResourceSpec {
        id: ResourceId::new(id),
        name: format!("Run {}", id),
        origin: "Amsterdam".to_string(),
        destination: "Paris".to_string(),
        total_seats: BENCH_CAPACITY,
    }))
    .unwrap();
}

fn bench_reserve_single(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (coordinator, _temp) = bench_coordinator();
    register(&rt, &coordinator, "IC-100");

    c.bench_function("reserve_single_caller", |b| {
        b.iter(|| {
            rt.block_on(coordinator.reserve(
                ResourceId::new("IC-100"),
                RequesterId::new("bench"),
                1,
            ))
            .unwrap()
        })
    });
}

fn bench_reserve_contention(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("reserve_16_callers");

    for &resources in &[1usize, 16] {
        let (coordinator, _temp) = bench_coordinator();
        for run in 0..resources {
            register(&rt, &coordinator, &format!("IC-{}", run));
        }

        group.throughput(Throughput::Elements(16));
        group.bench_with_input(
            BenchmarkId::new("resources", resources),
            &resources,
            |b, &resources| {
                b.iter(|| {
                    rt.block_on(async {
                        let mut handles = Vec::with_capacity(16);
                        for caller in 0..16usize {
                            let coordinator = coordinator.clone();
                            handles.push(tokio::spawn(async move {
                                coordinator
                                    .reserve(
                                        ResourceId::new(format!("IC-{}", caller % resources)),
                                        RequesterId::new(format!("bench-{}", caller)),
                                        1,
                                    )
                                    .await
                                    .unwrap()
                            }));
                        }
                        for handle in handles {
                            handle.await.unwrap();
                        }
                    })
                })
            },
        );
    }
    group.finish();
}

fn bench_reserve_cancel_roundtrip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (coordinator, _temp) = bench_coordinator();
    register(&rt, &coordinator, "IC-100");

    c.bench_function("reserve_cancel_roundtrip", |b| {
        b.iter(|| {
            rt.block_on(async {
                let reservation_id = coordinator
                    .reserve(ResourceId::new("IC-100"), RequesterId::new("bench"), 1)
                    .await
                    .unwrap();
                coordinator.cancel(reservation_id).await.unwrap();
            })
        })
    });
}

criterion_group!(
    benches,
    bench_reserve_single,
    bench_reserve_contention,
    bench_reserve_cancel_roundtrip
);
criterion_main!(benches);
