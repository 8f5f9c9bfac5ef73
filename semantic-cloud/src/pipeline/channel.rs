//! Bounded frame channel between the producer and the update loop.

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::frame::Frame;

/// Producer side of the frame channel
pub type FrameSender = Sender<Frame>;

/// Update loop side of the frame channel
pub type FrameReceiver = Receiver<Frame>;

/// Create a bounded frame channel.
///
/// A capacity of 0 is raised to 1 so the producer never rendezvous-blocks
/// on the consumer.
pub fn frame_channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    bounded(capacity.max(1))
}
