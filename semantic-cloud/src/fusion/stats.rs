//! Per-frame and cumulative fusion counters.

use serde::{Deserialize, Serialize};

/// Why a lidar point produced no labeled point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Non-finite coordinates
    Invalid,
    /// Behind the camera or outside the image, without background
    OutOfView,
    /// Confidence below threshold, without background
    LowConfidence,
    /// Raw class outside the remap table, without background
    UnknownClass,
    /// Lidar depth disagrees with registered depth
    DepthMismatch,
}

/// Fusion counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionStats {
    /// Lidar points consumed
    pub input: usize,
    /// Labeled points produced
    pub emitted: usize,
    /// Emitted points labeled with the background class
    pub background: usize,
    /// Dropped: non-finite
    pub dropped_invalid: usize,
    /// Dropped: not projectable
    pub dropped_out_of_view: usize,
    /// Dropped: low confidence
    pub dropped_low_confidence: usize,
    /// Dropped: raw class unknown
    pub dropped_unknown_class: usize,
    /// Dropped: depth cross-check failed
    pub dropped_depth_mismatch: usize,
}

impl FusionStats {
    /// Count one dropped point.
    pub fn record_drop(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::Invalid => &mut self.dropped_invalid,
            DropReason::OutOfView => &mut self.dropped_out_of_view,
            DropReason::LowConfidence => &mut self.dropped_low_confidence,
            DropReason::UnknownClass => &mut self.dropped_unknown_class,
            DropReason::DepthMismatch => &mut self.dropped_depth_mismatch,
        };
        *counter += 1;
    }

    /// Total dropped points.
    pub fn dropped(&self) -> usize {
        self.dropped_invalid
            + self.dropped_out_of_view
            + self.dropped_low_confidence
            + self.dropped_unknown_class
            + self.dropped_depth_mismatch
    }

    /// Merge another frame's counters into this one.
    pub fn merge(&mut self, other: &FusionStats) {
        self.input += other.input;
        self.emitted += other.emitted;
        self.background += other.background;
        self.dropped_invalid += other.dropped_invalid;
        self.dropped_out_of_view += other.dropped_out_of_view;
        self.dropped_low_confidence += other.dropped_low_confidence;
        self.dropped_unknown_class += other.dropped_unknown_class;
        self.dropped_depth_mismatch += other.dropped_depth_mismatch;
    }
}
