// Assembler benchmark suite
//
// Compares the two assembler strategies on edit patterns that stay on the
// linear fast path and on patterns that force the order-statistics tree:
// - sequential appends
// - clearing from the front
// - random inserts
// - random updates of a large list

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use deltalist::DeltaAssembler;
use deltalist::Strategy;

const STRATEGIES: [(&str, Strategy); 2] = [
    ("adaptive", Strategy::Adaptive),
    ("tree", Strategy::OrderStatisticsTree),
];

// =============================================================================
// Benchmark Helpers
// =============================================================================

/// Append `count` elements one at a time.
fn appends(assembler: &mut DeltaAssembler, count: usize) {
    assembler.begin(true, 0).unwrap();
    for i in 0..count {
        assembler.insert(i).unwrap();
    }
    assembler.commit().unwrap();
}

/// Delete every element of a list of `count`, always at the front.
fn front_deletes(assembler: &mut DeltaAssembler, count: usize) {
    assembler.begin(true, count).unwrap();
    for _ in 0..count {
        assembler.delete(0).unwrap();
    }
    assembler.commit().unwrap();
}

/// Insert `count` elements at random positions.
fn random_inserts(assembler: &mut DeltaAssembler, count: usize, rng: &mut StdRng) {
    assembler.begin(true, 0).unwrap();
    for len in 0..count {
        let index = rng.gen_range(0..=len);
        assembler.insert(index).unwrap();
    }
    assembler.commit().unwrap();
}

/// Update `count` random elements of a list of `count * 10`.
fn random_updates(assembler: &mut DeltaAssembler, count: usize, rng: &mut StdRng) {
    let len = count * 10;
    assembler.begin(true, len).unwrap();
    for _ in 0..count {
        assembler.update(rng.gen_range(0..len)).unwrap();
    }
    assembler.commit().unwrap();
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_appends(c: &mut Criterion) {
    let mut group = c.benchmark_group("appends");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));
        for (name, strategy) in STRATEGIES {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                let mut assembler = DeltaAssembler::with_strategy(strategy);
                b.iter(|| {
                    appends(&mut assembler, size);
                    let delta = assembler.take();
                    black_box(&delta);
                    if let Some(delta) = delta {
                        assembler.recycle(delta);
                    }
                });
            });
        }
    }

    group.finish();
}

fn bench_front_deletes(c: &mut Criterion) {
    let mut group = c.benchmark_group("front_deletes");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));
        for (name, strategy) in STRATEGIES {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                let mut assembler = DeltaAssembler::with_strategy(strategy);
                b.iter(|| {
                    front_deletes(&mut assembler, size);
                    black_box(assembler.take())
                });
            });
        }
    }

    group.finish();
}

fn bench_random_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_inserts");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));
        for (name, strategy) in STRATEGIES {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                let mut assembler = DeltaAssembler::with_strategy(strategy);
                let mut rng = StdRng::seed_from_u64(42);
                b.iter(|| {
                    random_inserts(&mut assembler, size, &mut rng);
                    black_box(assembler.take())
                });
            });
        }
    }

    group.finish();
}

fn bench_random_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_updates");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));
        for (name, strategy) in STRATEGIES {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                let mut assembler = DeltaAssembler::with_strategy(strategy);
                let mut rng = StdRng::seed_from_u64(7);
                b.iter(|| {
                    random_updates(&mut assembler, size, &mut rng);
                    black_box(assembler.take())
                });
            });
        }
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_appends,
    bench_front_deletes,
    bench_random_inserts,
    bench_random_updates,
);

criterion_main!(benches);
