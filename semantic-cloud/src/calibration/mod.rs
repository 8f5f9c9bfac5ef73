//! Camera/lidar calibration and point projection.
//!
//! ```text
//!  lidar point ──extrinsics──► camera frame ──intrinsics──► pixel (u, v)
//!                               (x, y, z)       z <= 0 → None
//!                                               outside image → None
//! ```
//!
//! Calibration is validated once at load time and is immutable afterwards.

mod extrinsics;
mod intrinsics;

pub use extrinsics::Extrinsics;
pub use intrinsics::Intrinsics;

use nalgebra::Point3;

/// Calibration errors. All are fatal at load time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    /// Focal lengths must be positive and finite
    #[error("invalid focal length: fx={fx}, fy={fy}")]
    InvalidFocalLength {
        /// Focal length x
        fx: f64,
        /// Focal length y
        fy: f64,
    },

    /// Image must have at least one pixel
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },

    /// Camera matrix is not an upper-triangular pinhole matrix
    #[error("camera matrix must have the form [fx 0 cx; 0 fy cy; 0 0 1]")]
    InvalidCameraMatrix,

    /// Extrinsics are not 4x4
    #[error("extrinsics must be 4x4, got {rows}x{cols}")]
    ExtrinsicsShape {
        /// Number of rows
        rows: usize,
        /// Widest row
        cols: usize,
    },

    /// Extrinsics contain NaN or infinity
    #[error("extrinsics contain non-finite values")]
    NonFiniteExtrinsics,

    /// Last row is not `[0, 0, 0, 1]`
    #[error("extrinsics last row must be [0, 0, 0, 1], got {0:?}")]
    NotHomogeneous([f64; 4]),

    /// Rotation block determinant is not 1
    #[error("extrinsics rotation determinant is {determinant}, expected 1")]
    NotARotation {
        /// Determinant of the 3x3 block
        determinant: f64,
    },

    /// Rotation block is not orthogonal
    #[error("extrinsics rotation is not orthogonal (max |RᵀR - I| = {error})")]
    NotOrthogonal {
        /// Largest deviation from identity
        error: f64,
    },
}

/// Pixel projection of a lidar point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Column (sub-pixel)
    pub u: f64,
    /// Row (sub-pixel)
    pub v: f64,
    /// Depth along the optical axis (meters, > 0)
    pub depth: f64,
}

impl Projection {
    /// Pixel containing the projection (floor of `u`, `v`).
    #[inline]
    pub fn pixel(&self) -> (u32, u32) {
        (self.u.floor() as u32, self.v.floor() as u32)
    }
}

/// Intrinsics plus extrinsics of one camera/lidar pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationModel {
    intrinsics: Intrinsics,
    extrinsics: Extrinsics,
}

impl CalibrationModel {
    /// Create a calibration model, validating intrinsics.
    pub fn new(intrinsics: Intrinsics, extrinsics: Extrinsics) -> Result<Self, CalibrationError> {
        intrinsics.validate()?;
        Ok(Self {
            intrinsics,
            extrinsics,
        })
    }

    /// Camera intrinsics.
    #[inline]
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Lidar-to-camera extrinsics.
    #[inline]
    pub fn extrinsics(&self) -> &Extrinsics {
        &self.extrinsics
    }

    /// Image size `(width, height)` the model expects.
    #[inline]
    pub fn image_size(&self) -> (u32, u32) {
        (self.intrinsics.width, self.intrinsics.height)
    }

    /// Lidar frame point expressed in the camera frame.
    #[inline]
    pub fn to_camera_frame(&self, point: &Point3<f32>) -> Point3<f64> {
        self.extrinsics.transform(&point.cast::<f64>())
    }

    /// Camera frame point expressed in the lidar frame.
    #[inline]
    pub fn from_camera_frame(&self, point: &Point3<f64>) -> Point3<f32> {
        self.extrinsics.inverse_transform(point).cast::<f32>()
    }

    /// Project a lidar point into the image.
    ///
    /// Returns `None` for non-finite points, points at or behind the image
    /// plane, and points landing outside `[0, width) x [0, height)`.
    pub fn project(&self, point: &Point3<f32>) -> Option<Projection> {
        if !point.iter().all(|v| v.is_finite()) {
            return None;
        }
        let pc = self.to_camera_frame(point);
        if pc.z <= 0.0 {
            return None;
        }
        let k = &self.intrinsics;
        let u = k.fx * pc.x / pc.z + k.cx;
        let v = k.fy * pc.y / pc.z + k.cy;
        if !k.contains(u, v) {
            return None;
        }
        Some(Projection { u, v, depth: pc.z })
    }
}
