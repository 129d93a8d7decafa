use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::types::LayerId;

/// Notification that the host should repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawRequest {
    /// A layer's oscillation advanced to `offset`.
    Tick { layer: LayerId, offset: u32 },
    /// Paint state changed outside the animation (colours, layer set).
    Invalidate,
}

pub type RedrawSender = Sender<RedrawRequest>;
pub type RedrawReceiver = Receiver<RedrawRequest>;

/// Unbounded so notifying never blocks the render thread.
pub fn redraw_channel() -> (RedrawSender, RedrawReceiver) {
    crossbeam_channel::unbounded()
}

/// Empties the receiver, returning how many requests were queued.
pub fn drain_pending(receiver: &RedrawReceiver) -> usize {
    let mut count = 0;
    loop {
        match receiver.try_recv() {
            Ok(_) => count += 1,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return count,
        }
    }
}
