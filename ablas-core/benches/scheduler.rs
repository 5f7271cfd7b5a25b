use ablas_core::dense::{Matrix, Vector};
use ablas_core::ops::{matrix, vector};
use ablas_core::{DependencyNode, PoolConfig, Scheduler};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_independent_spawn(c: &mut Criterion) {
    let scheduler = Scheduler::new(PoolConfig::with_workers(4)).unwrap();
    let mut group = c.benchmark_group("independent_spawn");
    for &n in &[16, 256, 4096] {
        let nodes: Vec<DependencyNode> = (0..n).map(|_| DependencyNode::new()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_n| {
            b.iter(|| {
                for node in &nodes {
                    scheduler.spawn(|| {}, node, &[]);
                }
                scheduler.wait();
            });
        });
    }
    group.finish();
}

fn bench_update_chain(c: &mut Criterion) {
    let scheduler = Scheduler::new(PoolConfig::with_workers(4)).unwrap();
    let mut group = c.benchmark_group("update_chain");
    for &n in &[16, 256, 4096] {
        let mut x = Vector::from_elem_in(&scheduler, 64, 1.0f64);
        let v = Vector::from_elem_in(&scheduler, 64, 0.5f64);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                for _ in 0..n {
                    vector::plus_assign(&mut x, &v, 1e-3).unwrap();
                }
                x.wait().unwrap();
            });
        });
    }
    group.finish();
}

fn bench_async_product(c: &mut Criterion) {
    let scheduler = Scheduler::new(PoolConfig::default()).unwrap();
    let mut group = c.benchmark_group("async_product");
    for &n in &[32, 64, 128] {
        let x = Matrix::from_elem_in(&scheduler, n, n, 1.0f64);
        let y = Matrix::from_elem_in(&scheduler, n, n, 0.01f64);
        let mut r = Matrix::new_in(&scheduler, n, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_n| {
            b.iter(|| {
                for _ in 0..8 {
                    let p = matrix::prod_async(&x, &y).unwrap();
                    matrix::plus_assign(&mut r, &p, 1.0).unwrap();
                }
                r.wait().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_independent_spawn, bench_update_chain, bench_async_product);
criterion_main!(benches);
