//! Axis-aligned query and retention regions.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::VoxelKey;

/// Axis-aligned bounding box, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Point3<f32>,
    /// Maximum corner
    pub max: Point3<f32>,
}

impl Aabb {
    /// Create a box from two corners (in any order).
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Cube of half-width `half_extent` around `center`.
    pub fn from_center(center: Point3<f32>, half_extent: f32) -> Self {
        let h = Vector3::repeat(half_extent.abs());
        Self {
            min: center - h,
            max: center + h,
        }
    }

    /// A box containing every finite point.
    pub fn everything() -> Self {
        Self {
            min: Point3::new(f32::MIN, f32::MIN, f32::MIN),
            max: Point3::new(f32::MAX, f32::MAX, f32::MAX),
        }
    }

    /// True if `point` lies inside the box.
    #[inline]
    pub fn contains(&self, point: &Point3<f32>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// True if the voxel `key` at `resolution` overlaps the box.
    #[inline]
    pub fn intersects_voxel(&self, key: &VoxelKey, resolution: f32) -> bool {
        let lo = key.min_corner(resolution);
        let hi = Point3::new(lo.x + resolution, lo.y + resolution, lo.z + resolution);
        lo.x <= self.max.x
            && hi.x > self.min.x
            && lo.y <= self.max.y
            && hi.y > self.min.y
            && lo.z <= self.max.z
            && hi.z > self.min.z
    }

    /// Inclusive key range covering the box at `resolution`.
    pub fn key_range(&self, resolution: f32) -> (VoxelKey, VoxelKey) {
        (
            VoxelKey::from_point(&self.min, resolution),
            VoxelKey::from_point(&self.max, resolution),
        )
    }

    /// Number of voxels the box spans at `resolution` (saturating).
    pub fn voxel_volume(&self, resolution: f32) -> u64 {
        let (lo, hi) = self.key_range(resolution);
        let span = |a: i32, b: i32| (b as i64 - a as i64 + 1).max(0) as u64;
        span(lo.x, hi.x)
            .saturating_mul(span(lo.y, hi.y))
            .saturating_mul(span(lo.z, hi.z))
    }
}
