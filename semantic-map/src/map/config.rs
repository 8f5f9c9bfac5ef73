//! Configuration types for the semantic voxel map.

use serde::{Deserialize, Serialize};

/// Configuration for log-odds occupancy updates.
///
/// OctoMap-style probability model stored as fixed-point `i16`:
/// - Log-odds: L(x) = log(P(x) / (1 - P(x)))
/// - Bayesian update: L_new = clamp(L_old + L_observation, l_min, l_max)
/// - Stored scaled by 100: actual = value / 100
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogOddsConfig {
    /// Log-odds increment for a labeled point landing in a voxel.
    /// OctoMap default: 85 (hit probability 0.7)
    #[serde(default = "default_l_hit")]
    pub l_hit: i16,

    /// Log-odds decrement for a ray passing through a voxel (free space).
    /// OctoMap default: -41 (miss probability 0.4)
    #[serde(default = "default_l_miss")]
    pub l_miss: i16,

    /// Threshold for considering a voxel occupied. P > 0.62 → L > 50
    #[serde(default = "default_l_occupied")]
    pub l_occupied_threshold: i16,

    /// Minimum log-odds value (clamping). P ≈ 0.12
    #[serde(default = "default_l_min")]
    pub l_min: i16,

    /// Maximum log-odds value (clamping). P ≈ 0.97
    #[serde(default = "default_l_max")]
    pub l_max: i16,
}

fn default_l_hit() -> i16 {
    85
}
fn default_l_miss() -> i16 {
    -41
}
fn default_l_occupied() -> i16 {
    50
}
fn default_l_min() -> i16 {
    -200
}
fn default_l_max() -> i16 {
    350
}

impl Default for LogOddsConfig {
    fn default() -> Self {
        Self {
            l_hit: default_l_hit(),
            l_miss: default_l_miss(),
            l_occupied_threshold: default_l_occupied(),
            l_min: default_l_min(),
            l_max: default_l_max(),
        }
    }
}

impl LogOddsConfig {
    /// Build hit/miss increments from probabilities.
    /// Formula: L = 100 * log(p / (1 - p))
    pub fn from_probability(hit_prob: f32, miss_prob: f32) -> Self {
        Self {
            l_hit: Self::probability_to_log_odds(hit_prob),
            l_miss: Self::probability_to_log_odds(miss_prob),
            ..Default::default()
        }
    }

    /// Convert fixed-point log-odds to probability.
    /// Formula: P = exp(L/100) / (1 + exp(L/100))
    pub fn log_odds_to_probability(log_odds: i16) -> f32 {
        let l = log_odds as f32 / 100.0;
        let exp_l = l.exp();
        exp_l / (1.0 + exp_l)
    }

    /// Convert probability to fixed-point log-odds (saturating at i16 range).
    pub fn probability_to_log_odds(p: f32) -> i16 {
        let p = p.clamp(1e-6, 1.0 - 1e-6);
        (100.0 * (p / (1.0 - p)).ln())
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }

    /// Apply one increment with clamping.
    #[inline]
    pub fn apply(&self, log_odds: i16, delta: i16) -> i16 {
        log_odds.saturating_add(delta).clamp(self.l_min, self.l_max)
    }
}

/// Map configuration errors, detected when the map is constructed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapConfigError {
    /// Resolution must be positive and finite.
    #[error("voxel resolution must be positive and finite, got {0}")]
    InvalidResolution(f32),

    /// Clamping bounds must straddle zero.
    #[error("log-odds bounds must satisfy l_min < 0 < l_max, got [{min}, {max}]")]
    InvalidBounds {
        /// Configured minimum
        min: i16,
        /// Configured maximum
        max: i16,
    },

    /// Hit increment must add evidence.
    #[error("l_hit must be positive, got {0}")]
    InvalidHit(i16),

    /// Miss increment must remove evidence.
    #[error("l_miss must be negative or zero, got {0}")]
    InvalidMiss(i16),

    /// Histogram ceiling must allow at least one observation.
    #[error("max_class_count must be at least 1")]
    InvalidClassCeiling,

    /// Ray length must be positive and finite with a bounded voxel span.
    #[error("max_ray_length must be positive and at most {max} voxels long, got {0}", max = MAX_RAY_VOXELS)]
    InvalidRayLength(f32),
}

/// Longest free-space ray, in voxels.
pub const MAX_RAY_VOXELS: u32 = 65_536;

/// Full voxel map configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Voxel edge length in meters.
    #[serde(default = "default_resolution")]
    pub resolution: f32,

    /// Log-odds occupancy configuration.
    #[serde(default)]
    pub log_odds: LogOddsConfig,

    /// Per-class histogram counts saturate at this value.
    #[serde(default = "default_max_class_count")]
    pub max_class_count: u32,

    /// Longest ray traced for free-space updates (meters).
    #[serde(default = "default_max_ray_length")]
    pub max_ray_length: f32,
}

fn default_resolution() -> f32 {
    0.1
}
fn default_max_class_count() -> u32 {
    u32::MAX
}
fn default_max_ray_length() -> f32 {
    30.0
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            log_odds: LogOddsConfig::default(),
            max_class_count: default_max_class_count(),
            max_ray_length: default_max_ray_length(),
        }
    }
}

impl MapConfig {
    /// Default configuration at a given resolution.
    pub fn with_resolution(resolution: f32) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    /// Check invariants the map relies on.
    pub fn validate(&self) -> Result<(), MapConfigError> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(MapConfigError::InvalidResolution(self.resolution));
        }
        let lo = &self.log_odds;
        if !(lo.l_min < 0 && lo.l_max > 0) {
            return Err(MapConfigError::InvalidBounds {
                min: lo.l_min,
                max: lo.l_max,
            });
        }
        if lo.l_hit <= 0 {
            return Err(MapConfigError::InvalidHit(lo.l_hit));
        }
        if lo.l_miss > 0 {
            return Err(MapConfigError::InvalidMiss(lo.l_miss));
        }
        if self.max_class_count == 0 {
            return Err(MapConfigError::InvalidClassCeiling);
        }
        let span = self.max_ray_length / self.resolution;
        if !(self.max_ray_length.is_finite()
            && self.max_ray_length > 0.0
            && span <= MAX_RAY_VOXELS as f32)
        {
            return Err(MapConfigError::InvalidRayLength(self.max_ray_length));
        }
        Ok(())
    }
}
