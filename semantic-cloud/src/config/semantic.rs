//! Semantic labeling and depth check sections.

use serde::{Deserialize, Serialize};

use crate::fusion::{PointType, Sampling};
use crate::remap::{ClassRemapTable, RemapError};

use super::defaults;

/// Class image sampling strategy name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Pixel containing the projection
    #[default]
    Nearest,
    /// Window majority vote
    MajorityWindow,
}

/// Sampling settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SamplingSettings {
    /// Strategy
    #[serde(default)]
    pub strategy: SamplingStrategy,

    /// Window radius for `majority_window` (pixels)
    #[serde(default = "defaults::window_radius")]
    pub window_radius: u32,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::Nearest,
            window_radius: defaults::window_radius(),
        }
    }
}

impl SamplingSettings {
    /// Convert to Sampling
    pub fn to_sampling(&self) -> Sampling {
        match self.strategy {
            SamplingStrategy::Nearest => Sampling::Nearest,
            SamplingStrategy::MajorityWindow => Sampling::MajorityWindow {
                window_radius: self.window_radius,
            },
        }
    }
}

/// Semantic configuration section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticSection {
    /// What fused points carry: `color`, `semantics_max`, `semantics_bayesian`
    #[serde(default)]
    pub point_type: PointType,

    /// Raw classes predicted by the segmentation model
    #[serde(default = "defaults::num_classes")]
    pub num_classes: usize,

    /// Raw → output class table (identity when omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_remap: Option<Vec<u16>>,

    /// Keep unclassifiable points with the background class
    #[serde(default)]
    pub include_background: bool,

    /// Background class
    #[serde(default = "defaults::background_class")]
    pub background_class: u16,

    /// Minimum class confidence (0 disables)
    #[serde(default)]
    pub min_confidence: f32,

    /// Class image sampling
    #[serde(default)]
    pub sampling: SamplingSettings,

    /// Frame id of published clouds
    #[serde(default = "defaults::frame_id")]
    pub frame_id: String,

    /// Inference device of the upstream segmentation model. Informational.
    #[serde(default = "defaults::device")]
    pub device: String,
}

impl Default for SemanticSection {
    fn default() -> Self {
        Self {
            point_type: PointType::default(),
            num_classes: defaults::num_classes(),
            class_remap: None,
            include_background: false,
            background_class: defaults::background_class(),
            min_confidence: 0.0,
            sampling: SamplingSettings::default(),
            frame_id: defaults::frame_id(),
            device: defaults::device(),
        }
    }
}

impl SemanticSection {
    /// Convert to ClassRemapTable
    pub fn to_remap_table(&self) -> Result<ClassRemapTable, RemapError> {
        match &self.class_remap {
            Some(remap) => ClassRemapTable::new(
                self.num_classes,
                remap.clone(),
                self.include_background,
                self.background_class,
            ),
            None => ClassRemapTable::identity(
                self.num_classes,
                self.include_background,
                self.background_class,
            ),
        }
    }
}

/// Lidar vs registered depth cross-check
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepthCheckSection {
    /// Reject points whose depth disagrees with the depth image
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Allowed disagreement (meters)
    #[serde(default = "defaults::depth_tolerance")]
    pub tolerance: f64,
}

impl Default for DepthCheckSection {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: defaults::depth_tolerance(),
        }
    }
}

impl DepthCheckSection {
    /// Tolerance if enabled
    pub fn tolerance(&self) -> Option<f64> {
        self.enabled.then_some(self.tolerance)
    }
}
