//! Benchmarks for bulk SDF evaluation.

use std::f64::consts::PI;

use cloud_scan::PointCloud;
use cloud_sdf::{SignStrategy, SurfaceSdf};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nalgebra::{Point3, Vector3};

fn sphere_sdf(count: usize) -> SurfaceSdf {
    let golden = PI * (3.0 - 5.0_f64.sqrt());
    let (points, normals): (Vec<_>, Vec<_>) = (0..count)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
            let ring = (1.0 - z * z).sqrt();
            let phi = i as f64 * golden;
            let dir = Vector3::new(ring * phi.cos(), ring * phi.sin(), z);
            (Point3::from(dir), dir)
        })
        .unzip();
    let cloud = PointCloud::from_points_and_normals(points, normals).unwrap();
    SurfaceSdf::new(cloud).unwrap()
}

fn query_points(count: usize) -> Vec<Point3<f64>> {
    let golden = PI * (3.0 - 5.0_f64.sqrt());
    (0..count)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
            let ring = (1.0 - z * z).sqrt();
            let phi = i as f64 * golden;
            let radius = 0.5 + 1.0 * (i % 3) as f64 / 2.0;
            Point3::new(
                ring * phi.cos() * radius,
                ring * phi.sin() * radius,
                z * radius,
            )
        })
        .collect()
}

fn bench_normal_vote(c: &mut Criterion) {
    let sdf = sphere_sdf(10_000);
    let queries = query_points(10_000);
    let strategy = SignStrategy::normal_vote();

    c.bench_function("normal_vote_10k_queries", |b| {
        b.iter(|| {
            let distances = sdf
                .signed_distances_batched(black_box(&queries), &strategy, 2048)
                .unwrap();
            black_box(distances)
        });
    });
}

fn bench_nearest_only(c: &mut Criterion) {
    let sdf = sphere_sdf(10_000);
    let queries = query_points(10_000);

    c.bench_function("nearest_10k_queries", |b| {
        b.iter(|| {
            let distances: Vec<f64> = queries
                .iter()
                .map(|p| sdf.index().nearest(black_box(p)).distance)
                .collect();
            black_box(distances)
        });
    });
}

criterion_group!(benches, bench_normal_vote, bench_nearest_only);
criterion_main!(benches);
