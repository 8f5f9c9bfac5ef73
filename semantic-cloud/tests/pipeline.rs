//! Update loop integration tests.
//!
//! Runs the synthetic producer, the fusion thread, and map readers together.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use common::{fusion, frame_with, square_camera, uniform_classes};
use nalgebra::Point3;
use semantic_cloud::{
    Frame, FusionConfig, FusionError, LoopEnd, PipelineConfig, PipelineError, PipelineOutputs,
    PipelineThread, PointType, SemanticCloudConfig, SemanticFusion, StepOutcome, SyntheticScene,
    UpdateLoop, frame_channel, spawn_producer,
};
use semantic_map::{Aabb, MapConfig, MapSnapshot, SemanticVoxelMap};

const BANDS: [u16; 4] = [1, 2, 3, 4];
const WALL: f64 = 5.0;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quick_config() -> PipelineConfig {
    PipelineConfig {
        frame_timeout: Duration::from_millis(50),
        max_missed_frames: 0,
        snapshot_interval: Some(Duration::from_millis(5)),
        ..Default::default()
    }
}

fn wall_scene() -> SyntheticScene {
    SyntheticScene::new(square_camera(), BANDS.to_vec(), WALL)
        .with_points(2000)
        .with_points_behind(50)
}

fn new_map() -> Arc<SemanticVoxelMap> {
    Arc::new(SemanticVoxelMap::new(MapConfig::with_resolution(0.25)).unwrap())
}

/// Band the wall point at lateral offset `x` falls into.
fn band_at(x: f32) -> u16 {
    let u = 50.0 + x as f64 * 100.0 / WALL;
    BANDS[((u / 25.0).floor() as usize).min(BANDS.len() - 1)]
}

#[test]
fn test_end_to_end_bands() {
    init_logger();
    let map = new_map();
    let (tx, rx) = frame_channel(4);
    let running = Arc::new(AtomicBool::new(true));

    let producer = spawn_producer(wall_scene(), tx, 0.0, Some(10), Arc::clone(&running)).unwrap();
    let update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        Arc::clone(&map),
        quick_config(),
        PipelineOutputs::default(),
    );
    let pipeline = PipelineThread::spawn(update_loop, rx, Arc::clone(&running)).unwrap();

    let report = pipeline.join().unwrap();
    assert_eq!(producer.join().unwrap(), 10);

    assert_eq!(report.end, Some(LoopEnd::SourceClosed));
    assert_eq!(report.frames_processed, 10);
    assert_eq!(report.frames_skipped, 0);
    assert_eq!(report.fusion.input, 10 * 2050);
    assert_eq!(report.fusion.emitted, 10 * 2000);
    assert_eq!(report.fusion.dropped_out_of_view, 10 * 50);
    assert_eq!(report.points_inserted, 10 * 2000);
    assert_eq!(report.voxels, map.len());

    let all = map.query(&Aabb::new(
        Point3::new(-10.0, -10.0, 0.0),
        Point3::new(10.0, 10.0, 10.0),
    ));
    assert_eq!(all.len(), map.len());
    for sample in all {
        assert_eq!(sample.dominant_class, band_at(sample.center.x));
        assert!(sample.occupancy > 0.5);
    }
}

#[test]
fn test_end_to_end_bayesian_bands() {
    init_logger();
    let map = new_map();
    let (tx, rx) = frame_channel(4);
    let running = Arc::new(AtomicBool::new(true));

    let scene = wall_scene().with_top_k(true);
    let producer = spawn_producer(scene, tx, 0.0, Some(5), Arc::clone(&running)).unwrap();
    let config = FusionConfig {
        point_type: PointType::SemanticsBayesian,
        ..Default::default()
    };
    let update_loop = UpdateLoop::new(
        fusion(10, false, config),
        Arc::clone(&map),
        quick_config(),
        PipelineOutputs::default(),
    );
    let report = PipelineThread::spawn(update_loop, rx, Arc::clone(&running))
        .unwrap()
        .join()
        .unwrap();
    producer.join().unwrap();

    assert_eq!(report.frames_processed, 5);
    assert_eq!(report.fusion.emitted, 5 * 2000);
    for sample in map.snapshot().voxels {
        assert_eq!(sample.dominant_class, band_at(sample.center.x));
        // Own band 0.7 against its two neighbors
        let confidence = sample.class_confidence.unwrap();
        assert!((confidence - 0.7).abs() < 1e-4);
    }
}

#[test]
fn test_dropped_snapshots_lag_live_map() {
    init_logger();
    let map = new_map();
    let (snapshot_tx, snapshot_rx) = crossbeam_channel::bounded::<MapSnapshot>(1);
    let config = PipelineConfig {
        snapshot_interval: Some(Duration::ZERO),
        ..quick_config()
    };
    let outputs = PipelineOutputs {
        cloud_tx: None,
        snapshot_tx: Some(snapshot_tx),
    };
    let mut update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        Arc::clone(&map),
        config,
        outputs,
    );
    let (tx, rx) = frame_channel(4);
    tx.send(frame_with(vec![Point3::new(0.1, 0.1, 2.0)], 4))
        .unwrap();
    tx.send(frame_with(vec![Point3::new(0.5, 0.1, 2.0)], 4))
        .unwrap();
    update_loop.step(&rx).unwrap();
    update_loop.step(&rx).unwrap();

    // Nobody drained the channel, so the second snapshot was dropped
    assert_eq!(update_loop.report().snapshots_dropped, 1);
    let published = snapshot_rx.try_recv().unwrap();
    assert_eq!(published.len(), 1);

    let live = map.snapshot();
    assert_eq!(live.len(), 2);
    assert!(published.generation < live.generation);
}

#[test]
fn test_snapshots_follow_generation() {
    init_logger();
    let map = new_map();
    let (tx, rx) = frame_channel(4);
    let (snapshot_tx, snapshot_rx) = crossbeam_channel::unbounded::<MapSnapshot>();
    let running = Arc::new(AtomicBool::new(true));

    let producer = spawn_producer(wall_scene(), tx, 200.0, Some(10), Arc::clone(&running)).unwrap();
    let outputs = PipelineOutputs {
        cloud_tx: None,
        snapshot_tx: Some(snapshot_tx),
    };
    let update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        Arc::clone(&map),
        quick_config(),
        outputs,
    );
    let report = PipelineThread::spawn(update_loop, rx, Arc::clone(&running))
        .unwrap()
        .join()
        .unwrap();
    producer.join().unwrap();

    let snapshots: Vec<MapSnapshot> = snapshot_rx.iter().collect();
    assert_eq!(snapshots.len() as u64, report.snapshots_published);
    assert!(!snapshots.is_empty());
    for pair in snapshots.windows(2) {
        assert!(pair[0].generation <= pair[1].generation);
    }
    // The final snapshot carries every applied frame
    let last = snapshots.last().unwrap();
    assert_eq!(last.generation, map.generation());
    assert_eq!(last.len(), map.len());
}

#[test]
fn test_readers_during_updates() {
    init_logger();
    let map = new_map();
    let (tx, rx) = frame_channel(2);
    let running = Arc::new(AtomicBool::new(true));

    let producer = spawn_producer(wall_scene(), tx, 0.0, Some(30), Arc::clone(&running)).unwrap();
    let update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        Arc::clone(&map),
        quick_config(),
        PipelineOutputs::default(),
    );
    let pipeline = PipelineThread::spawn(update_loop, rx, Arc::clone(&running)).unwrap();

    let region = Aabb::new(Point3::new(-1.0, -1.0, 4.0), Point3::new(1.0, 1.0, 6.0));
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut last_generation = 0;
                while !pipeline_done(&map, last_generation) {
                    let result = map.query(&region);
                    assert!(result.generation() >= last_generation);
                    last_generation = result.generation();
                    let samples: Vec<_> = result.collect();
                    assert!(samples.windows(2).all(|w| w[0].key < w[1].key));
                    for sample in &samples {
                        assert!(BANDS.contains(&sample.dominant_class));
                    }
                }
            })
        })
        .collect();

    let report = pipeline.join().unwrap();
    producer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(report.frames_processed, 30);
}

/// Readers stop once the map has taken all 30 frames.
fn pipeline_done(map: &SemanticVoxelMap, seen: u64) -> bool {
    seen >= 30 && map.generation() >= 30
}

#[test]
fn test_shutdown_flag_stops_loop() {
    init_logger();
    let map = new_map();
    let (tx, rx) = frame_channel(4);
    let running = Arc::new(AtomicBool::new(true));

    let producer = spawn_producer(wall_scene(), tx, 100.0, None, Arc::clone(&running)).unwrap();
    let update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        Arc::clone(&map),
        quick_config(),
        PipelineOutputs::default(),
    );
    let pipeline = PipelineThread::spawn(update_loop, rx, Arc::clone(&running)).unwrap();

    thread::sleep(Duration::from_millis(200));
    running.store(false, Ordering::Relaxed);

    let report = pipeline.join().unwrap();
    producer.join().unwrap();
    assert_eq!(report.end, Some(LoopEnd::Shutdown));
    assert!(report.frames_processed > 0);
}

#[test]
fn test_missed_frames_end_with_error() {
    init_logger();
    let (tx, rx) = frame_channel(1);
    let config = PipelineConfig {
        frame_timeout: Duration::from_millis(10),
        max_missed_frames: 3,
        ..Default::default()
    };
    let update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        new_map(),
        config,
        PipelineOutputs::default(),
    );
    let running = Arc::new(AtomicBool::new(true));
    let result = PipelineThread::spawn(update_loop, rx, running)
        .unwrap()
        .join();

    assert!(matches!(
        result,
        Err(PipelineError::ProducerExhausted { missed: 3 })
    ));
    drop(tx);
}

#[test]
fn test_resolution_mismatch_stops_loop() {
    init_logger();
    let (tx, rx) = frame_channel(2);
    tx.send(Frame::new(0, vec![], uniform_classes(32, 32, 1)))
        .unwrap();
    drop(tx);

    let update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        new_map(),
        quick_config(),
        PipelineOutputs::default(),
    );
    let running = Arc::new(AtomicBool::new(true));
    let result = PipelineThread::spawn(update_loop, rx, running)
        .unwrap()
        .join();

    assert!(matches!(
        result,
        Err(PipelineError::Fusion(FusionError::ResolutionMismatch { .. }))
    ));
}

#[test]
fn test_step_by_step() {
    init_logger();
    let map = new_map();
    let mut update_loop = UpdateLoop::new(
        fusion(10, false, FusionConfig::default()),
        Arc::clone(&map),
        quick_config(),
        PipelineOutputs::default(),
    );
    let (tx, rx) = frame_channel(4);

    tx.send(frame_with(vec![Point3::new(0.1, 0.1, 2.0)], 4))
        .unwrap();
    let bad_depth = semantic_cloud::DepthImage::new(10, 10);
    tx.send(frame_with(vec![Point3::new(0.1, 0.1, 2.0)], 4).with_depth(bad_depth))
        .unwrap();

    match update_loop.step(&rx).unwrap() {
        StepOutcome::Processed(result) => assert_eq!(result.points_inserted, 1),
        other => panic!("expected a processed frame, got {:?}", other),
    }
    assert_eq!(update_loop.step(&rx).unwrap(), StepOutcome::Skipped);
    assert_eq!(update_loop.step(&rx).unwrap(), StepOutcome::Timeout);

    assert_eq!(update_loop.report().frames_processed, 1);
    assert_eq!(update_loop.report().frames_skipped, 1);
    assert_eq!(map.get_at(&Point3::new(0.1, 0.1, 2.0)).unwrap().dominant_class, 4);
}

#[test]
fn test_shipped_config_drives_pipeline() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/semantic_cloud.yaml");
    let config = SemanticCloudConfig::load(&path).unwrap();
    config.validate().unwrap();

    let fusion: SemanticFusion = config.fusion().unwrap();
    assert_eq!(fusion.calibration().image_size(), (640, 480));
    assert_eq!(fusion.remap_table().num_classes(), 150);

    // A point 5 m ahead of the lidar lands near the image center
    let projection = fusion
        .calibration()
        .project(&Point3::new(5.0, 0.0, 0.0))
        .unwrap();
    assert!((projection.u - 319.5).abs() < 1.0);
    assert!((projection.depth - 4.95).abs() < 1e-9);

    let pipeline = config.pipeline_config();
    assert_eq!(pipeline.frame_timeout, Duration::from_millis(500));
    assert_eq!(pipeline.snapshot_interval, Some(Duration::from_secs(1)));
    assert_eq!(pipeline.frame_id, "lidar");
    assert!(!pipeline.carve_free_space);
    assert_eq!(fusion.config().point_type, PointType::SemanticsMax);
}
