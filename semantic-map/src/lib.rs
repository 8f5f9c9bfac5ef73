//! # semantic-map
//!
//! Incremental 3D semantic voxel map with occupancy and per-class evidence.
//!
//! ## Overview
//!
//! Labeled points (a 3D position plus a semantic class index) are
//! accumulated into a sparse voxel grid. Every voxel keeps:
//!
//! - **Occupancy** - fixed-point log-odds, clamped
//! - **Class histogram** - one count per observed class
//! - **Mean color** - if the points carried color
//!
//! The reported class of a voxel is the argmax of its histogram, so a
//! voxel's label converges to the majority class it has observed. Points
//! carrying top-k class candidates also accumulate per-class confidence,
//! and that evidence decides the class once present.
//!
//! ## Concurrency
//!
//! [`SemanticVoxelMap`] is shared as `Arc<SemanticVoxelMap>`. One writer
//! inserts batches while any number of readers query or snapshot the map.
//! A batch is applied atomically with respect to readers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use semantic_map::{Aabb, LabeledPoint, MapConfig, SemanticVoxelMap};
//! use nalgebra::Point3;
//!
//! let map = SemanticVoxelMap::new(MapConfig::with_resolution(0.1))?;
//! map.insert_batch(&[LabeledPoint::new(Point3::new(1.0, 0.0, 0.2), 3)]);
//!
//! for voxel in map.query(&Aabb::from_center(Point3::origin(), 2.0)) {
//!     println!("{} class={} p={:.2}", voxel.key, voxel.dominant_class, voxel.occupancy);
//! }
//! ```
//!
//! ## Coordinate System
//!
//! Points are expressed in the map frame. Voxel `(i, j, k)` covers
//! `[i*res, (i+1)*res)` on each axis.

#![warn(missing_docs)]

// Core types
pub mod core;

// Voxel storage and configuration
pub mod map;

// Export (PLY) and class palette
pub mod io;

// Re-export commonly used types
pub use crate::core::{
    Aabb, Candidates, ClassScore, LabeledCloud, LabeledPoint, MAX_CANDIDATES, VoxelKey,
};

pub use map::{
    InsertResult, LogOddsConfig, MAX_RAY_VOXELS, MapConfig, MapConfigError, MapSnapshot,
    MapStats, SemanticVoxelMap, Voxel, VoxelQuery, VoxelSample,
};

pub use io::{
    ColorMode, IoError, class_color, class_palette, save_snapshot_ply, write_cloud_ply,
    write_snapshot_ply,
};
