//! Update loop section.

use std::time::Duration;

use nalgebra::Point3;
use semantic_map::Aabb;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineConfig;

use super::defaults;

/// Axis-aligned region as two corners
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSettings {
    /// Minimum corner [x, y, z] (meters)
    pub min: [f32; 3],
    /// Maximum corner [x, y, z] (meters)
    pub max: [f32; 3],
}

impl RegionSettings {
    /// Convert to Aabb
    pub fn to_aabb(&self) -> Aabb {
        Aabb::new(Point3::from(self.min), Point3::from(self.max))
    }
}

/// Pipeline configuration section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Frame channel capacity
    #[serde(default = "defaults::queue_size")]
    pub queue_size: usize,

    /// Longest wait for one frame (ms)
    #[serde(default = "defaults::frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Consecutive timeouts before giving up (0 waits forever)
    #[serde(default = "defaults::max_missed_frames")]
    pub max_missed_frames: u32,

    /// Snapshot publish interval (ms, 0 disables)
    #[serde(default = "defaults::snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,

    /// Prune outside `retention` every N frames (0 disables)
    #[serde(default)]
    pub prune_every_frames: u64,

    /// Region kept when pruning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<RegionSettings>,

    /// Apply free-space misses along lidar rays
    #[serde(default)]
    pub carve_free_space: bool,

    /// Statistics log interval (s)
    #[serde(default = "defaults::stats_interval_s")]
    pub stats_interval_s: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            queue_size: defaults::queue_size(),
            frame_timeout_ms: defaults::frame_timeout_ms(),
            max_missed_frames: defaults::max_missed_frames(),
            snapshot_interval_ms: defaults::snapshot_interval_ms(),
            prune_every_frames: 0,
            retention: None,
            carve_free_space: false,
            stats_interval_s: defaults::stats_interval_s(),
        }
    }
}

impl PipelineSection {
    /// Convert to PipelineConfig
    pub fn to_pipeline_config(&self, frame_id: &str) -> PipelineConfig {
        PipelineConfig {
            frame_timeout: Duration::from_millis(self.frame_timeout_ms),
            max_missed_frames: self.max_missed_frames,
            snapshot_interval: (self.snapshot_interval_ms > 0)
                .then(|| Duration::from_millis(self.snapshot_interval_ms)),
            prune_every_frames: self.prune_every_frames,
            retention: self.retention.as_ref().map(RegionSettings::to_aabb),
            carve_free_space: self.carve_free_space,
            frame_id: frame_id.to_string(),
            stats_interval: Duration::from_secs(self.stats_interval_s),
        }
    }
}
