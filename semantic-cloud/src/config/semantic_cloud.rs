//! Main SemanticCloudConfig and conversion methods.

use std::path::Path;

use semantic_map::MapConfig;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationModel;
use crate::fusion::{FusionConfig, SemanticFusion};
use crate::pipeline::PipelineConfig;
use crate::remap::ClassRemapTable;

use super::camera::CameraSection;
use super::error::ConfigLoadError;
use super::pipeline::PipelineSection;
use super::semantic::{DepthCheckSection, SemanticSection};

/// Default config file location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "configs/semantic_cloud.yaml";

/// Full configuration loaded from YAML
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SemanticCloudConfig {
    /// Camera calibration
    #[serde(default)]
    pub camera: CameraSection,

    /// Class remapping and sampling
    #[serde(default)]
    pub semantic: SemanticSection,

    /// Depth cross-check
    #[serde(default)]
    pub depth_check: DepthCheckSection,

    /// Voxel map
    #[serde(default)]
    pub map: MapConfig,

    /// Update loop
    #[serde(default)]
    pub pipeline: PipelineSection,
}

impl SemanticCloudConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Load from default config path (configs/semantic_cloud.yaml)
    pub fn load_default() -> Result<Self, ConfigLoadError> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigLoadError::Parse(e.to_string()))
    }

    /// Check every section, reporting the first problem.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.calibration()?;
        self.remap_table()?;
        self.map_config()?;
        if self.pipeline.queue_size == 0 {
            return Err(ConfigLoadError::Invalid(
                "pipeline.queue_size must be at least 1".to_string(),
            ));
        }
        if self.pipeline.frame_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid(
                "pipeline.frame_timeout_ms must be positive".to_string(),
            ));
        }
        if self.pipeline.prune_every_frames > 0 && self.pipeline.retention.is_none() {
            return Err(ConfigLoadError::Invalid(
                "pipeline.prune_every_frames requires pipeline.retention".to_string(),
            ));
        }
        let confidence = self.semantic.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigLoadError::Invalid(format!(
                "semantic.min_confidence must be in [0, 1], got {}",
                confidence
            )));
        }
        if !(self.depth_check.tolerance.is_finite() && self.depth_check.tolerance >= 0.0) {
            return Err(ConfigLoadError::Invalid(format!(
                "depth_check.tolerance must be non-negative, got {}",
                self.depth_check.tolerance
            )));
        }
        Ok(())
    }

    /// Validated calibration model
    pub fn calibration(&self) -> Result<CalibrationModel, ConfigLoadError> {
        Ok(self.camera.to_calibration()?)
    }

    /// Validated class remap table
    pub fn remap_table(&self) -> Result<ClassRemapTable, ConfigLoadError> {
        Ok(self.semantic.to_remap_table()?)
    }

    /// Fusion tuning
    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig {
            point_type: self.semantic.point_type,
            sampling: self.semantic.sampling.to_sampling(),
            min_confidence: self.semantic.min_confidence,
            depth_tolerance: self.depth_check.tolerance(),
        }
    }

    /// Fusion engine built from calibration, remap and tuning
    pub fn fusion(&self) -> Result<SemanticFusion, ConfigLoadError> {
        Ok(SemanticFusion::new(
            self.calibration()?,
            self.remap_table()?,
            self.fusion_config(),
        ))
    }

    /// Validated voxel map config
    pub fn map_config(&self) -> Result<MapConfig, ConfigLoadError> {
        self.map.validate()?;
        Ok(self.map.clone())
    }

    /// Update loop config
    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.to_pipeline_config(&self.semantic.frame_id)
    }
}
