//! Error types for the fusion pipeline

use crate::fusion::FusionError;

/// Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Terminal pipeline errors.
///
/// Per-frame problems (malformed frames) are logged and skipped by the
/// update loop and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No frame arrived for too many consecutive waits
    #[error("producer exhausted: no frame for {missed} consecutive waits")]
    ProducerExhausted {
        /// Consecutive timeouts observed
        missed: u32,
    },

    /// Frame channel closed by the producer
    #[error("producer disconnected")]
    ProducerDisconnected,

    /// Fatal fusion configuration error
    #[error("fusion error: {0}")]
    Fusion(#[from] FusionError),

    /// Failed to spawn a worker thread
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Worker thread panicked
    #[error("pipeline thread panicked")]
    ThreadPanicked,
}
