//! # semantic-cloud
//!
//! Lidar/camera semantic fusion feeding an incremental semantic voxel map.
//!
//! ## Overview
//!
//! Every lidar point is projected into the camera's semantic class image
//! (the output of a segmentation model), labeled with the class found
//! there, and accumulated into a shared [`semantic_map::SemanticVoxelMap`].
//! A top-k prediction can stand in for the class image, in which case each
//! point carries its class candidates and the map fuses their confidence.
//!
//! ```text
//!  lidar points ─┐
//!                ├─► SemanticFusion ─► labeled points ─► SemanticVoxelMap ─► snapshots
//!  class image ──┘    (calibration,                        (log-odds +
//!                      remap, checks)                       class histogram)
//! ```
//!
//! ## Modules
//!
//! - **calibration**: intrinsics, extrinsics, point projection
//! - **remap**: raw segmentation class → output class table
//! - **fusion**: per-point labeling with background, confidence and depth checks
//! - **pipeline**: frame channel, update loop, loop thread
//! - **config**: YAML configuration
//! - **sim**: synthetic frame producer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use semantic_cloud::config::SemanticCloudConfig;
//!
//! let config = SemanticCloudConfig::load_default()?;
//! let fusion = config.fusion()?;
//! let (points, stats) = fusion.fuse_collect(&frame)?;
//! map.insert_batch(&points);
//! ```
//!
//! ## Coordinate Frames
//!
//! - Lidar: the frame lidar points arrive in; labeled points and the map
//!   stay in this frame
//! - Camera: optical convention, z forward, x right, y down

#![warn(missing_docs)]

pub mod calibration;
pub mod config;
pub mod error;
pub mod frame;
pub mod fusion;
pub mod pipeline;
pub mod remap;
pub mod sim;

// Re-export commonly used types
pub use calibration::{CalibrationError, CalibrationModel, Extrinsics, Intrinsics, Projection};
pub use config::{ConfigLoadError, SemanticCloudConfig};
pub use error::{PipelineError, Result};
pub use frame::{ClassImage, ConfidenceImage, DepthImage, Frame, PredictionError, TopKPrediction};
pub use fusion::{
    DropReason, FusedPoints, FusionConfig, FusionError, FusionStats, PointType, Sampling,
    SemanticFusion,
};
pub use pipeline::{
    FrameReceiver, FrameSender, LoopEnd, PipelineConfig, PipelineOutputs, PipelineReport,
    PipelineThread, StepOutcome, UpdateLoop, frame_channel,
};
pub use remap::{ClassRemapTable, DEFAULT_BACKGROUND_CLASS, MAX_OUTPUT_CLASS, RemapError};
pub use sim::{SyntheticScene, spawn_producer};
