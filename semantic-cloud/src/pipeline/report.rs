//! Update loop counters.

use serde::{Deserialize, Serialize};

use crate::fusion::FusionStats;

/// Why the update loop stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopEnd {
    /// Shutdown flag cleared
    Shutdown,
    /// Producer closed the frame channel
    SourceClosed,
}

/// Counters accumulated by one update loop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Frames fused and inserted
    pub frames_processed: u64,
    /// Malformed frames skipped
    pub frames_skipped: u64,
    /// Waits that ended without a frame
    pub timeouts: u64,
    /// Labeled points inserted into the map
    pub points_inserted: u64,
    /// Snapshots handed to the snapshot consumer
    pub snapshots_published: u64,
    /// Snapshots dropped because the consumer was busy
    pub snapshots_dropped: u64,
    /// Labeled clouds handed to the cloud consumer
    pub clouds_published: u64,
    /// Labeled clouds dropped because the consumer was busy
    pub clouds_dropped: u64,
    /// Voxels removed by pruning
    pub voxels_pruned: u64,
    /// Cumulative fusion counters
    pub fusion: FusionStats,
    /// Voxels in the map when the report was taken
    pub voxels: usize,
    /// How the loop ended (None while running)
    pub end: Option<LoopEnd>,
}
