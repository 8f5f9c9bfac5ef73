//! Bresenham ray casting through the voxel grid.
//!
//! Used for free-space updates: every voxel a sensor ray passes through
//! before reaching its endpoint receives a "miss" observation.
//!
//! ```text
//! From (0,0,0) to (5,2,1), driven along X:
//!
//!   x: 0 1 2 3 4 5
//!   y: 0 0 1 1 2 2
//!   z: 0 0 0 1 1 1
//! ```
//!
//! Integer-only, deterministic, no gaps between consecutive voxels.

use nalgebra::Point3;

use crate::core::VoxelKey;

/// 3D Bresenham line iterator over voxel keys, start and end inclusive.
///
/// Deltas and error terms are `i64`, so any pair of `i32` keys is valid.
pub struct BresenhamLine3 {
    current: [i32; 3],
    step: [i32; 3],
    delta: [i64; 3],
    error: [i64; 3],
    driver: usize,
    remaining: u64,
    done: bool,
}

impl BresenhamLine3 {
    /// Create a line iterator from `start` to `end`.
    pub fn new(start: VoxelKey, end: VoxelKey) -> Self {
        let s = [start.x, start.y, start.z];
        let e = [end.x, end.y, end.z];
        let mut delta = [0i64; 3];
        let mut step = [0i32; 3];
        for axis in 0..3 {
            let d = e[axis] as i64 - s[axis] as i64;
            delta[axis] = d.abs();
            step[axis] = d.signum() as i32;
        }

        let driver = (0..3).max_by_key(|&a| (delta[a], 2 - a)).unwrap_or(0);
        let mut error = [0i64; 3];
        for axis in 0..3 {
            if axis != driver {
                error[axis] = 2 * delta[axis] - delta[driver];
            }
        }

        Self {
            current: s,
            step,
            delta,
            error,
            driver,
            remaining: delta[driver] as u64,
            done: false,
        }
    }

    /// Voxels between two world points at `resolution`.
    pub fn from_points(start: &Point3<f32>, end: &Point3<f32>, resolution: f32) -> Self {
        Self::new(
            VoxelKey::from_point(start, resolution),
            VoxelKey::from_point(end, resolution),
        )
    }
}

impl Iterator for BresenhamLine3 {
    type Item = VoxelKey;

    fn next(&mut self) -> Option<VoxelKey> {
        if self.done {
            return None;
        }
        let out = VoxelKey::new(self.current[0], self.current[1], self.current[2]);
        if self.remaining == 0 {
            self.done = true;
            return Some(out);
        }
        self.remaining -= 1;

        let d = self.driver;
        for axis in 0..3 {
            if axis == d {
                continue;
            }
            if self.error[axis] >= 0 {
                self.current[axis] += self.step[axis];
                self.error[axis] -= 2 * self.delta[d];
            }
            self.error[axis] += 2 * self.delta[axis];
        }
        self.current[d] += self.step[d];

        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match usize::try_from(self.remaining).ok().and_then(|n| n.checked_add(1)) {
            Some(n) => (n, Some(n)),
            None => (usize::MAX, None),
        }
    }
}


/// Clip the segment `origin → end` to at most `max_length` meters.
pub fn clip_ray(origin: &Point3<f32>, end: &Point3<f32>, max_length: f32) -> Point3<f32> {
    let dir = end - origin;
    let length = dir.norm();
    if length <= max_length || length == 0.0 {
        *end
    } else {
        origin + dir * (max_length / length)
    }
}
