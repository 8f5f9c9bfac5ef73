//! Core types shared by the voxel map and its producers.
//!
//! ## Type Categories
//!
//! ### Coordinates
//! - [`VoxelKey`]: Integer voxel indices, `floor(p / resolution)` per axis
//! - [`Aabb`]: Axis-aligned region used for queries and pruning
//!
//! ### Observations
//! - [`LabeledPoint`]: One lidar return with its semantic class
//! - [`LabeledCloud`]: All labeled points produced from one frame
//!
//! Positions are `nalgebra::Point3<f32>` in whatever fixed frame the
//! producer agreed on (typically the lidar frame or a world frame).

mod key;
mod point;
mod region;

pub use key::VoxelKey;
pub use point::{Candidates, ClassScore, LabeledCloud, LabeledPoint, MAX_CANDIDATES};
pub use region::Aabb;
