//! Map export.
//!
//! - **PLY export**: ASCII point clouds of occupied voxels or labeled points
//! - **Class palette**: PASCAL VOC colors for class indices
//!
//! ```rust,ignore
//! use semantic_map::io::{save_snapshot_ply, ColorMode};
//! use std::path::Path;
//!
//! save_snapshot_ply(&map.snapshot(), Path::new("map.ply"), 0.5, ColorMode::Semantic)?;
//! ```

pub mod palette;
pub mod ply;

pub use palette::{class_color, class_palette};
pub use ply::{ColorMode, IoError, save_snapshot_ply, write_cloud_ply, write_snapshot_ply};
