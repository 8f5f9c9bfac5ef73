//! Configuration loading errors.

use semantic_map::MapConfigError;

use crate::calibration::CalibrationError;
use crate::remap::RemapError;

/// Config load error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigLoadError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid camera calibration
    #[error("Invalid calibration: {0}")]
    Calibration(#[from] CalibrationError),

    /// Invalid class remap table
    #[error("Invalid class remap: {0}")]
    Remap(#[from] RemapError),

    /// Invalid voxel map settings
    #[error("Invalid map config: {0}")]
    Map(#[from] MapConfigError),

    /// Any other invalid value
    #[error("Invalid config: {0}")]
    Invalid(String),
}
