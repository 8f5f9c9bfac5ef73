//! Benchmark voxel map operations.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::Point3;
use semantic_map::{Aabb, LabeledPoint, MapConfig, SemanticVoxelMap};

/// Points on the walls of a box-shaped room, labeled by wall.
fn room_cloud(num_points: usize, size: f32) -> Vec<LabeledPoint> {
    let per_wall = (num_points / 4).max(1);
    let mut points = Vec::with_capacity(per_wall * 4);
    for wall in 0..4u16 {
        for i in 0..per_wall {
            let t = i as f32 / per_wall as f32 * size;
            let z = (i % 20) as f32 * 0.1;
            let position = match wall {
                0 => Point3::new(t, 0.0, z),
                1 => Point3::new(size, t, z),
                2 => Point3::new(size - t, size, z),
                _ => Point3::new(0.0, size - t, z),
            };
            points.push(LabeledPoint::new(position, wall + 1));
        }
    }
    points
}

fn bench_insert_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_batch");

    for num_points in [1_000, 10_000, 50_000].iter() {
        let map = SemanticVoxelMap::new(MapConfig::default()).unwrap();
        let cloud = room_cloud(*num_points, 8.0);

        // Warm up
        for _ in 0..3 {
            map.insert_batch(&cloud);
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(num_points),
            num_points,
            |b, _| b.iter(|| black_box(map.insert_batch(black_box(&cloud)))),
        );
    }

    group.finish();
}

fn bench_insert_scan(c: &mut Criterion) {
    let map = SemanticVoxelMap::new(MapConfig::default()).unwrap();
    let cloud = room_cloud(5_000, 8.0);
    let origin = Point3::new(4.0, 4.0, 1.0);
    map.insert_batch(&cloud);

    c.bench_function("insert_scan_5000pts", |b| {
        b.iter(|| black_box(map.insert_scan(black_box(&cloud), &origin)))
    });
}

fn bench_query(c: &mut Criterion) {
    let map = SemanticVoxelMap::new(MapConfig::default()).unwrap();
    map.insert_batch(&room_cloud(50_000, 8.0));

    let small = Aabb::from_center(Point3::new(0.0, 4.0, 1.0), 0.5);
    c.bench_function("query_small_region", |b| {
        b.iter(|| black_box(map.query(black_box(&small)).count()))
    });

    c.bench_function("snapshot", |b| b.iter(|| black_box(map.snapshot())));
}

criterion_group!(benches, bench_insert_batch, bench_insert_scan, bench_query);
criterion_main!(benches);
