//! Update loop thread.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::{self, JoinHandle};

use crate::error::{PipelineError, Result};

use super::{FrameReceiver, PipelineReport, UpdateLoop};

/// Handle of a running update loop.
pub struct PipelineThread {
    handle: JoinHandle<Result<PipelineReport>>,
}

impl PipelineThread {
    /// Spawn the update loop on a named thread.
    pub fn spawn(
        update_loop: UpdateLoop,
        frames: FrameReceiver,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("semantic-fusion".into())
            .spawn(move || update_loop.run(frames, running))?;
        Ok(Self { handle })
    }

    /// Wait for the loop to finish.
    pub fn join(self) -> Result<PipelineReport> {
        self.handle
            .join()
            .map_err(|_| PipelineError::ThreadPanicked)?
    }
}
