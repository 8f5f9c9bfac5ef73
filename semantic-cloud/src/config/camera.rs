//! Camera calibration section.

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationError, CalibrationModel, Extrinsics, Intrinsics};

use super::defaults;

/// Camera configuration section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraSection {
    /// Image width (pixels)
    #[serde(default = "defaults::image_width")]
    pub width: u32,

    /// Image height (pixels)
    #[serde(default = "defaults::image_height")]
    pub height: u32,

    /// Focal length x (pixels)
    #[serde(default = "defaults::focal_length")]
    pub fx: f64,

    /// Focal length y (pixels)
    #[serde(default = "defaults::focal_length")]
    pub fy: f64,

    /// Principal point x (pixels)
    #[serde(default = "defaults::principal_x")]
    pub cx: f64,

    /// Principal point y (pixels)
    #[serde(default = "defaults::principal_y")]
    pub cy: f64,

    /// Row-major 3x3 camera matrix. Overrides fx/fy/cx/cy when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<[f64; 9]>,

    /// Lidar-to-camera transform, 4 rows of 4
    #[serde(default = "defaults::extrinsics")]
    pub extrinsics: Vec<Vec<f64>>,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            width: defaults::image_width(),
            height: defaults::image_height(),
            fx: defaults::focal_length(),
            fy: defaults::focal_length(),
            cx: defaults::principal_x(),
            cy: defaults::principal_y(),
            k: None,
            extrinsics: defaults::extrinsics(),
        }
    }
}

impl CameraSection {
    /// Validated intrinsics.
    pub fn intrinsics(&self) -> Result<Intrinsics, CalibrationError> {
        match &self.k {
            Some(k) => Intrinsics::from_k_matrix(k, self.width, self.height),
            None => Intrinsics::new(self.fx, self.fy, self.cx, self.cy, self.width, self.height),
        }
    }

    /// Validated calibration model.
    pub fn to_calibration(&self) -> Result<CalibrationModel, CalibrationError> {
        let extrinsics = Extrinsics::from_rows(&self.extrinsics)?;
        CalibrationModel::new(self.intrinsics()?, extrinsics)
    }
}
