// Diff benchmark suite
//
// Measures the Myers edit script on lists that differ by a few scattered
// edits (small D) and on unrelated lists (D close to N + M).

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use deltalist::diff;

/// A copy of `base` with `edits` random single-element changes.
fn perturb(base: &[u32], edits: usize, rng: &mut StdRng) -> Vec<u32> {
    let mut target = base.to_vec();
    for _ in 0..edits {
        match rng.gen_range(0..3) {
            0 if !target.is_empty() => {
                let index = rng.gen_range(0..target.len());
                target.remove(index);
            }
            1 if !target.is_empty() => {
                let index = rng.gen_range(0..target.len());
                target[index] = rng.r#gen();
            }
            _ => {
                let index = rng.gen_range(0..=target.len());
                target.insert(index, rng.r#gen());
            }
        }
    }
    return target;
}

fn bench_few_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("few_edits");
    let mut rng = StdRng::seed_from_u64(1);

    for size in [1000, 10000, 100000] {
        let base: Vec<u32> = (0..size).collect();
        let target = perturb(&base, 10, &mut rng);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("synthesize", size), &target, |b, target| {
            b.iter(|| black_box(diff::synthesize(&base, target, false)));
        });
    }

    group.finish();
}

fn bench_unrelated(c: &mut Criterion) {
    let mut group = c.benchmark_group("unrelated");
    let mut rng = StdRng::seed_from_u64(2);

    for size in [100, 500, 1000] {
        let base: Vec<u32> = (0..size).map(|_| rng.gen_range(0..4)).collect();
        let target: Vec<u32> = (0..size).map(|_| rng.gen_range(0..4)).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("synthesize", size), &target, |b, target| {
            b.iter(|| black_box(diff::synthesize(&base, target, false)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_few_edits, bench_unrelated);

criterion_main!(benches);
