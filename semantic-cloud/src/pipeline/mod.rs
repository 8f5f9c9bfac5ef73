//! Update/publish loop.
//!
//! ```text
//!  producer ──frame_channel──► UpdateLoop (own thread) ──► Arc<SemanticVoxelMap> ◄── readers
//!                                 │  fuse → insert_batch
//!                                 ├──► labeled cloud  (try_send, dropped when full)
//!                                 └──► map snapshot   (every snapshot_interval)
//! ```
//!
//! Frames are processed strictly in arrival order. The only blocking wait is
//! for the next frame, bounded by `frame_timeout`. The shutdown flag is
//! checked between iterations, so a frame in flight is always fully applied.

mod channel;
mod report;
mod thread;
mod update_loop;

pub use channel::{FrameReceiver, FrameSender, frame_channel};
pub use report::{LoopEnd, PipelineReport};
pub use thread::PipelineThread;
pub use update_loop::{PipelineOutputs, StepOutcome, UpdateLoop};

use std::time::Duration;

use semantic_map::Aabb;

/// Update loop configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Longest wait for one frame
    pub frame_timeout: Duration,
    /// Consecutive timeouts before the producer is considered gone (0 = never)
    pub max_missed_frames: u32,
    /// Snapshot publish interval (None disables)
    pub snapshot_interval: Option<Duration>,
    /// Prune outside `retention` every N processed frames (0 disables)
    pub prune_every_frames: u64,
    /// Region kept when pruning
    pub retention: Option<Aabb>,
    /// Trace lidar rays and apply free-space misses
    pub carve_free_space: bool,
    /// Frame id stamped on published clouds
    pub frame_id: String,
    /// Statistics log interval
    pub stats_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_timeout: Duration::from_millis(500),
            max_missed_frames: 20,
            snapshot_interval: Some(Duration::from_secs(1)),
            prune_every_frames: 0,
            retention: None,
            carve_free_space: false,
            frame_id: "lidar".to_string(),
            stats_interval: Duration::from_secs(10),
        }
    }
}
