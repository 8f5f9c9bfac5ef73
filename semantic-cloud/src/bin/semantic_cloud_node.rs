//! semantic-cloud-node daemon
//!
//! Fuses synthetic camera/lidar frames into a semantic voxel map and writes
//! the final map as a PLY point cloud.
//!
//! # Usage
//!
//! ```bash
//! # With default config (configs/semantic_cloud.yaml if present)
//! cargo run --bin semantic-cloud-node
//!
//! # With custom config file and output
//! cargo run --bin semantic-cloud-node -- --config my.yaml --frames 200 --output map.ply
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use clap::Parser;
use semantic_cloud::{
    PipelineOutputs, PipelineThread, PointType, SemanticCloudConfig, SyntheticScene, UpdateLoop,
    frame_channel, spawn_producer,
};
use semantic_map::{ColorMode, MapSnapshot, SemanticVoxelMap, save_snapshot_ply};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

/// Distance of the synthetic wall from the camera (meters).
const WALL_DISTANCE: f64 = 5.0;

#[derive(Parser, Debug)]
#[command(name = "semantic-cloud-node", about = "Semantic lidar/camera fusion into a voxel map")]
struct Args {
    /// YAML config file (defaults to configs/semantic_cloud.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to produce (0 runs until interrupted)
    #[arg(short, long, default_value_t = 100)]
    frames: u64,

    /// Frame rate of the synthetic producer (Hz)
    #[arg(short, long, default_value_t = 10.0)]
    rate: f64,

    /// Output PLY file for the final map
    #[arg(short, long, default_value = "semantic_map.ply")]
    output: PathBuf,

    /// Color voxels by observed camera color instead of class
    #[arg(long)]
    observed_colors: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => {
            log::info!("semantic-cloud-node shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("semantic-cloud-node failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            SemanticCloudConfig::load(path)?
        }
        None => SemanticCloudConfig::load_default()?,
    };
    config.validate()?;

    let fusion = config.fusion()?;
    let map = Arc::new(SemanticVoxelMap::new(config.map_config()?)?);
    let calibration = *fusion.calibration();
    let remap = fusion.remap_table();

    log::info!("semantic-cloud-node starting...");
    log::info!(
        "  Camera: {}x{} fx={} fy={}",
        config.camera.width,
        config.camera.height,
        config.camera.fx,
        config.camera.fy
    );
    log::info!(
        "  Classes: {} raw → {} output (background: {})",
        remap.num_classes(),
        remap.num_output_classes(),
        if remap.include_background() { "kept" } else { "dropped" }
    );
    log::info!("  Point type: {:?}", config.semantic.point_type);
    log::info!("  Voxel resolution: {} m", map.resolution());
    log::info!("  Segmentation device: {}", config.semantic.device);

    // Shutdown on SIGINT/SIGTERM
    let running = Arc::new(AtomicBool::new(true));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signal_handle = signals.handle();
    {
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("signals".into())
            .spawn(move || {
                if signals.forever().next().is_some() {
                    log::info!("Received shutdown signal");
                    running.store(false, Ordering::Relaxed);
                }
            })?;
    }

    // Snapshot reader reports map growth while the loop runs
    let (snapshot_tx, snapshot_rx) = crossbeam_channel::bounded::<MapSnapshot>(1);
    let reader = thread::Builder::new()
        .name("snapshot-reader".into())
        .spawn(move || {
            let mut received = 0u64;
            for snapshot in snapshot_rx {
                received += 1;
                log::debug!(
                    "Snapshot: {} voxels (generation {})",
                    snapshot.len(),
                    snapshot.generation
                );
            }
            received
        })?;

    // Producer → update loop
    let (frame_tx, frame_rx) = frame_channel(config.pipeline.queue_size);
    let num_raw = remap.num_classes();
    let bands: Vec<u16> = (0..4).map(|i| (i * num_raw / 4) as u16).collect();
    let scene = SyntheticScene::new(calibration, bands, WALL_DISTANCE)
        .with_points(5000)
        .with_points_behind(200)
        .with_noise(0.02)
        .with_top_k(config.semantic.point_type == PointType::SemanticsBayesian);
    let frames = (args.frames > 0).then_some(args.frames);
    let producer = spawn_producer(scene, frame_tx, args.rate, frames, Arc::clone(&running))?;

    let outputs = PipelineOutputs {
        cloud_tx: None,
        snapshot_tx: Some(snapshot_tx),
    };
    let update_loop = UpdateLoop::new(fusion, Arc::clone(&map), config.pipeline_config(), outputs);
    let pipeline = PipelineThread::spawn(update_loop, frame_rx, Arc::clone(&running))?;

    let result = pipeline.join();
    running.store(false, Ordering::Relaxed);
    signal_handle.close();
    producer.join().ok();
    let snapshots = reader.join().unwrap_or(0);

    let report = result?;
    log::info!(
        "Processed {} frames ({} skipped), {} points labeled, {} voxels, {} snapshots",
        report.frames_processed,
        report.frames_skipped,
        report.fusion.emitted,
        report.voxels,
        snapshots
    );

    // Published snapshots can lag the map
    let snapshot = map.snapshot();
    let mode = if args.observed_colors {
        ColorMode::Observed
    } else {
        ColorMode::Semantic
    };
    let occupied_threshold = semantic_map::LogOddsConfig::log_odds_to_probability(
        map.config().log_odds.l_occupied_threshold,
    );
    save_snapshot_ply(&snapshot, &args.output, occupied_threshold, mode)?;

    Ok(())
}
