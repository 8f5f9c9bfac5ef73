//! Frame-by-frame fusion and map update.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info, trace, warn};
use nalgebra::Point3;
use semantic_map::{InsertResult, LabeledCloud, LabeledPoint, MapSnapshot, SemanticVoxelMap};

use crate::error::{PipelineError, Result};
use crate::frame::Frame;
use crate::fusion::SemanticFusion;

use super::{FrameReceiver, LoopEnd, PipelineConfig, PipelineReport};

/// Optional consumers of the loop's output.
#[derive(Clone, Debug, Default)]
pub struct PipelineOutputs {
    /// Receives every labeled cloud (dropped when full)
    pub cloud_tx: Option<Sender<LabeledCloud>>,
    /// Receives a map snapshot every snapshot interval (dropped when full)
    pub snapshot_tx: Option<Sender<MapSnapshot>>,
}

/// Result of one loop iteration.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// A frame was fused and inserted
    Processed(InsertResult),
    /// A malformed frame was skipped
    Skipped,
    /// No frame arrived within the timeout
    Timeout,
}

/// Consumes frames, fuses them, and updates the shared map.
pub struct UpdateLoop {
    fusion: SemanticFusion,
    map: Arc<SemanticVoxelMap>,
    config: PipelineConfig,
    outputs: PipelineOutputs,
    report: PipelineReport,
    missed: u32,
    last_snapshot: Instant,
    last_stats: Instant,
}

impl UpdateLoop {
    /// Create an update loop writing into `map`.
    pub fn new(
        fusion: SemanticFusion,
        map: Arc<SemanticVoxelMap>,
        config: PipelineConfig,
        outputs: PipelineOutputs,
    ) -> Self {
        let now = Instant::now();
        Self {
            fusion,
            map,
            config,
            outputs,
            report: PipelineReport::default(),
            missed: 0,
            last_snapshot: now,
            last_stats: now,
        }
    }

    /// Shared map.
    pub fn map(&self) -> &Arc<SemanticVoxelMap> {
        &self.map
    }

    /// Counters so far.
    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    /// Wait for one frame and apply it.
    ///
    /// Snapshot and statistics cadences are checked on every call, including
    /// timeouts, so a stalled producer does not stall publishing.
    pub fn step(&mut self, frames: &FrameReceiver) -> Result<StepOutcome> {
        let outcome = match frames.recv_timeout(self.config.frame_timeout) {
            Ok(frame) => {
                self.missed = 0;
                self.process(frame)?
            }
            Err(RecvTimeoutError::Timeout) => {
                self.missed += 1;
                self.report.timeouts += 1;
                debug!(
                    "No frame within {:?} ({} missed)",
                    self.config.frame_timeout, self.missed
                );
                let limit = self.config.max_missed_frames;
                if limit > 0 && self.missed >= limit {
                    return Err(PipelineError::ProducerExhausted {
                        missed: self.missed,
                    });
                }
                StepOutcome::Timeout
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(PipelineError::ProducerDisconnected);
            }
        };

        self.maybe_publish_snapshot();
        self.maybe_log_stats();
        Ok(outcome)
    }

    /// Run until the shutdown flag clears or the producer closes the channel.
    pub fn run(
        mut self,
        frames: FrameReceiver,
        running: Arc<AtomicBool>,
    ) -> Result<PipelineReport> {
        info!("Update loop starting");

        let end = loop {
            if !running.load(Ordering::Relaxed) {
                break LoopEnd::Shutdown;
            }
            match self.step(&frames) {
                Ok(_) => {}
                Err(PipelineError::ProducerDisconnected) => break LoopEnd::SourceClosed,
                Err(e) => {
                    error!("Update loop stopped: {}", e);
                    return Err(e);
                }
            }
        };

        // Final snapshot so consumers see every applied frame
        if self.config.snapshot_interval.is_some() {
            self.publish_snapshot();
        }

        self.report.voxels = self.map.len();
        self.report.end = Some(end);
        info!("Update loop finished ({:?})", end);
        self.log_stats();
        Ok(self.report)
    }

    fn process(&mut self, frame: Frame) -> Result<StepOutcome> {
        let mut fused = match self.fusion.fuse(&frame) {
            Ok(fused) => fused,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("Skipping frame {}: {}", frame.timestamp_us, e);
                self.report.frames_skipped += 1;
                return Ok(StepOutcome::Skipped);
            }
        };
        let points: Vec<LabeledPoint> = fused.by_ref().collect();
        let stats = fused.into_stats();

        let result = if self.config.carve_free_space {
            // Map frame is the lidar frame, so rays start at its origin
            self.map.insert_scan(&points, &Point3::origin())
        } else {
            self.map.insert_batch(&points)
        };
        trace!(
            "Frame {}: {} of {} points labeled, {} voxels created",
            frame.timestamp_us, stats.emitted, stats.input, result.voxels_created
        );

        self.report.frames_processed += 1;
        self.report.points_inserted += result.points_inserted as u64;
        self.report.fusion.merge(&stats);

        self.publish_cloud(frame.timestamp_us, points);
        self.maybe_prune();

        Ok(StepOutcome::Processed(result))
    }

    fn publish_cloud(&mut self, timestamp_us: u64, points: Vec<LabeledPoint>) {
        let Some(tx) = &self.outputs.cloud_tx else {
            return;
        };
        let cloud = LabeledCloud {
            timestamp_us,
            frame_id: self.config.frame_id.clone(),
            points,
        };
        match tx.try_send(cloud) {
            Ok(()) => self.report.clouds_published += 1,
            Err(TrySendError::Full(_)) => {
                trace!("Cloud consumer busy, dropping cloud {}", timestamp_us);
                self.report.clouds_dropped += 1;
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Cloud consumer gone, no longer publishing clouds");
                self.outputs.cloud_tx = None;
            }
        }
    }

    fn maybe_prune(&mut self) {
        let every = self.config.prune_every_frames;
        if every == 0 || self.report.frames_processed % every != 0 {
            return;
        }
        if let Some(retention) = &self.config.retention {
            let removed = self.map.prune(retention);
            self.report.voxels_pruned += removed as u64;
        }
    }

    fn maybe_publish_snapshot(&mut self) {
        let Some(interval) = self.config.snapshot_interval else {
            return;
        };
        if self.last_snapshot.elapsed() >= interval {
            self.publish_snapshot();
        }
    }

    fn publish_snapshot(&mut self) {
        self.last_snapshot = Instant::now();
        let Some(tx) = &self.outputs.snapshot_tx else {
            return;
        };
        match tx.try_send(self.map.snapshot()) {
            Ok(()) => self.report.snapshots_published += 1,
            Err(TrySendError::Full(_)) => {
                trace!("Snapshot consumer busy, dropping snapshot");
                self.report.snapshots_dropped += 1;
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Snapshot consumer gone, no longer publishing snapshots");
                self.outputs.snapshot_tx = None;
            }
        }
    }

    fn maybe_log_stats(&mut self) {
        if self.last_stats.elapsed() >= self.config.stats_interval {
            self.log_stats();
            self.last_stats = Instant::now();
        }
    }

    fn log_stats(&self) {
        let fusion = &self.report.fusion;
        info!(
            "Frames: {} processed, {} skipped, {} timeouts | Points: {} in, {} labeled ({} background), {} dropped | Voxels: {}",
            self.report.frames_processed,
            self.report.frames_skipped,
            self.report.timeouts,
            fusion.input,
            fusion.emitted,
            fusion.background,
            fusion.dropped(),
            self.map.len()
        );
    }
}
