//! Concurrent access tests for the voxel map.
//!
//! One writer inserts batches while readers query and snapshot. Readers must
//! only ever observe whole batches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use nalgebra::Point3;
use semantic_map::{Aabb, LabeledPoint, MapConfig, SemanticVoxelMap, VoxelKey};

/// Every batch puts one point in each of `VOXELS` voxels along X.
const VOXELS: i32 = 50;
const BATCHES: u64 = 200;

fn batch(class: u16) -> Vec<LabeledPoint> {
    (0..VOXELS)
        .map(|i| LabeledPoint::new(Point3::new(i as f32 + 0.5, 0.5, 0.5), class))
        .collect()
}

#[test]
fn test_readers_never_see_partial_batches() {
    let map = Arc::new(SemanticVoxelMap::new(MapConfig::with_resolution(1.0)).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let map = Arc::clone(&map);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..BATCHES {
                map.insert_batch(&batch((i % 3) as u16));
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let map = Arc::clone(&map);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let region = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(100.0, 1.0, 1.0));
                let mut checks = 0u32;
                while !done.load(Ordering::SeqCst) || checks == 0 {
                    let query = map.query(&region);
                    let generation = query.generation();
                    let samples: Vec<_> = query.collect();
                    if generation == 0 {
                        assert!(samples.is_empty());
                    } else {
                        assert_eq!(samples.len(), VOXELS as usize);
                        // Each voxel received exactly one hit per applied batch
                        for sample in &samples {
                            assert_eq!(sample.hits as u64, generation);
                        }
                    }

                    let snapshot = map.snapshot();
                    for voxel in &snapshot.voxels {
                        assert_eq!(voxel.hits as u64, snapshot.generation);
                    }
                    checks += 1;
                }
                checks
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }

    assert_eq!(map.generation(), BATCHES);
    let histogram = map.class_histogram(&VoxelKey::new(0, 0, 0)).unwrap();
    assert_eq!(histogram.iter().map(|&c| c as u64).sum::<u64>(), BATCHES);
    // 200 batches cycling classes 0,1,2: class 0 and 1 get 67, class 2 gets 66
    assert_eq!(histogram, vec![67, 67, 66]);
    assert_eq!(map.get(&VoxelKey::new(0, 0, 0)).unwrap().dominant_class, 0);
}

#[test]
fn test_reset_while_reading() {
    let map = Arc::new(SemanticVoxelMap::new(MapConfig::with_resolution(1.0)).unwrap());

    let writer = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            for i in 0..100 {
                map.insert_batch(&batch(1));
                if i % 10 == 9 {
                    map.reset();
                }
            }
        })
    };

    for _ in 0..200 {
        let snapshot = map.snapshot();
        // Either empty after a reset or a full batch set
        assert!(snapshot.is_empty() || snapshot.len() == VOXELS as usize);
        let hits = snapshot.voxels.first().map(|v| v.hits);
        assert!(snapshot.voxels.iter().all(|v| Some(v.hits) == hits));
    }

    writer.join().unwrap();
    assert!(map.is_empty());
}
