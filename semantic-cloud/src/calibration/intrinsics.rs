//! Pinhole camera intrinsics.

use serde::{Deserialize, Serialize};

use super::CalibrationError;

/// Pinhole intrinsics of the semantic camera.
///
/// ```text
/// u = fx * x / z + cx
/// v = fy * y / z + cy
/// ```
///
/// Lens distortion is assumed to be removed upstream (rectified images).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    /// Focal length in pixels (x)
    pub fx: f64,
    /// Focal length in pixels (y)
    pub fy: f64,
    /// Principal point (x)
    pub cx: f64,
    /// Principal point (y)
    pub cy: f64,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl Intrinsics {
    /// Create validated intrinsics.
    pub fn new(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, CalibrationError> {
        let intrinsics = Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        };
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    /// Build from a row-major 3x3 camera matrix, as published with camera info.
    ///
    /// ```text
    /// K = [fx  0 cx]
    ///     [ 0 fy cy]
    ///     [ 0  0  1]
    /// ```
    pub fn from_k_matrix(k: &[f64; 9], width: u32, height: u32) -> Result<Self, CalibrationError> {
        let structural = [k[1], k[3], k[6], k[7]];
        if structural.iter().any(|&v| v != 0.0) || k[8] != 1.0 {
            return Err(CalibrationError::InvalidCameraMatrix);
        }
        Self::new(k[0], k[4], k[2], k[5], width, height)
    }

    /// Check focal lengths and image size.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let finite = [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(CalibrationError::InvalidFocalLength {
                fx: self.fx,
                fy: self.fy,
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(CalibrationError::InvalidImageSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// True if `(u, v)` lies inside `[0, width) x [0, height)`.
    #[inline]
    pub fn contains(&self, u: f64, v: f64) -> bool {
        u >= 0.0 && v >= 0.0 && u < self.width as f64 && v < self.height as f64
    }
}
