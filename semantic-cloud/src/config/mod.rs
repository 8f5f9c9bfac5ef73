//! Configuration loading for the semantic cloud node.
//!
//! Loads all configuration from a single YAML file with sensible defaults.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use semantic_cloud::config::SemanticCloudConfig;
//!
//! // Load from default path (configs/semantic_cloud.yaml)
//! let config = SemanticCloudConfig::load_default()?;
//! config.validate()?;
//!
//! // Convert to runtime configs
//! let fusion = config.fusion()?;
//! let map_config = config.map_config()?;
//! let pipeline_config = config.pipeline_config();
//! ```
//!
//! ## Configuration Sections
//!
//! | Section | Description |
//! |---------|-------------|
//! | [`CameraSection`] | Intrinsics, image size, lidar-to-camera extrinsics |
//! | [`SemanticSection`] | Point type, class remap, background policy, sampling, confidence |
//! | [`DepthCheckSection`] | Lidar vs registered depth cross-check |
//! | `map` | Voxel resolution and log-odds model ([`semantic_map::MapConfig`]) |
//! | [`PipelineSection`] | Queue, timeouts, snapshot and pruning cadence |
//!
//! ## Example YAML
//!
//! ```yaml
//! camera:
//!   width: 640
//!   height: 480
//!   fx: 525.0
//!   fy: 525.0
//!   cx: 319.5
//!   cy: 239.5
//!   extrinsics:              # lidar → camera
//!     - [0.0, -1.0,  0.0,  0.0]
//!     - [0.0,  0.0, -1.0,  0.0]
//!     - [1.0,  0.0,  0.0,  0.0]
//!     - [0.0,  0.0,  0.0,  1.0]
//!
//! semantic:
//!   point_type: semantics_max  # color | semantics_max | semantics_bayesian
//!   num_classes: 150
//!   include_background: false
//!   sampling: { strategy: nearest }
//!
//! map:
//!   resolution: 0.1
//! ```

mod camera;
mod defaults;
mod error;
mod pipeline;
mod semantic;
mod semantic_cloud;

// Re-export main types
pub use error::ConfigLoadError;
pub use semantic_cloud::{DEFAULT_CONFIG_PATH, SemanticCloudConfig};

// Re-export section types
pub use camera::CameraSection;
pub use pipeline::{PipelineSection, RegionSettings};
pub use semantic::{DepthCheckSection, SamplingSettings, SamplingStrategy, SemanticSection};
