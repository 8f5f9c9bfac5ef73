//! Integer voxel coordinates.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Integer 3D voxel index.
///
/// Voxel `(x, y, z)` covers the half-open cube
/// `[x*res, (x+1)*res) × [y*res, (y+1)*res) × [z*res, (z+1)*res)`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VoxelKey {
    /// X index
    pub x: i32,
    /// Y index
    pub y: i32,
    /// Z index
    pub z: i32,
}

impl VoxelKey {
    /// Create a key from raw indices.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Key of the voxel containing `point` (floor division by `resolution`).
    ///
    /// The caller is responsible for rejecting non-finite points.
    #[inline]
    pub fn from_point(point: &Point3<f32>, resolution: f32) -> Self {
        Self::new(
            (point.x / resolution).floor() as i32,
            (point.y / resolution).floor() as i32,
            (point.z / resolution).floor() as i32,
        )
    }

    /// World coordinates of the voxel's minimum corner.
    #[inline]
    pub fn min_corner(&self, resolution: f32) -> Point3<f32> {
        Point3::new(
            self.x as f32 * resolution,
            self.y as f32 * resolution,
            self.z as f32 * resolution,
        )
    }

    /// World coordinates of the voxel's center.
    #[inline]
    pub fn center(&self, resolution: f32) -> Point3<f32> {
        Point3::new(
            (self.x as f32 + 0.5) * resolution,
            (self.y as f32 + 0.5) * resolution,
            (self.z as f32 + 0.5) * resolution,
        )
    }
}

impl std::fmt::Display for VoxelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_point_floors() {
        let key = VoxelKey::from_point(&Point3::new(0.25, 1.99, 0.0), 0.5);
        assert_eq!(key, VoxelKey::new(0, 3, 0));
    }

    #[test]
    fn test_from_point_negative() {
        // Floor, not truncation: -0.1 belongs to voxel -1
        let key = VoxelKey::from_point(&Point3::new(-0.1, -0.5, -1.2), 0.5);
        assert_eq!(key, VoxelKey::new(-1, -1, -3));
    }

    #[test]
    fn test_center_and_corner() {
        let key = VoxelKey::new(2, -1, 0);
        let center = key.center(0.1);
        assert_relative_eq!(center.x, 0.25, epsilon = 1e-6);
        assert_relative_eq!(center.y, -0.05, epsilon = 1e-6);
        assert_relative_eq!(center.z, 0.05, epsilon = 1e-6);

        let corner = key.min_corner(0.1);
        assert_relative_eq!(corner.x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(corner.y, -0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_center_maps_back_to_key() {
        let key = VoxelKey::new(-7, 13, 4);
        assert_eq!(VoxelKey::from_point(&key.center(0.2), 0.2), key);
    }
}
