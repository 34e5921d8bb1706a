//! Live per-worker status feed
//!
//! Workers publish a [`CpuStatus`] on every phase transition. The feed is a
//! broadcast channel: every subscriber gets its own cursor, and a subscriber
//! that falls behind loses the oldest events instead of slowing the workers.

use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;

/// Number of events buffered per subscriber before the oldest are dropped
pub const STATUS_CHANNEL_CAPACITY: usize = 1024;

/// Snapshot of what one worker is doing
#[derive(Debug, Clone, PartialEq)]
pub struct CpuStatus {
    /// Worker index within its queue
    pub id: usize,
    /// Human-readable phase label
    pub msg: String,
    /// Progress of the current phase, 0..=100
    pub progress: u8,
    /// Whether the worker is executing a task
    pub is_working: bool,
}

impl CpuStatus {
    /// Progress as a fraction in 0.0..=1.0
    pub fn progress_percent(&self) -> f32 {
        self.progress as f32 / 100.0
    }
}

/// Receiving end of the status feed
pub type StatusReceiver = broadcast::Receiver<CpuStatus>;

/// Cloneable handle used by tasks to publish status from inside a worker
///
/// The worker id is taken from the calling thread, so a reporter moved into a
/// task always reports on behalf of whichever worker runs it. Calls made from
/// threads that do not belong to the owning queue are ignored.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    queue_id: usize,
    sender: broadcast::Sender<CpuStatus>,
}

impl StatusReporter {
    pub(crate) fn new(queue_id: usize, sender: broadcast::Sender<CpuStatus>) -> Self {
        Self { queue_id, sender }
    }

    /// Publish a busy status for the current worker
    pub fn report(&self, msg: impl Into<String>, progress: u8) {
        if let Some(id) = super::work_queue::current_worker(self.queue_id) {
            self.publish(id, msg.into(), progress, true);
        }
    }

    pub(crate) fn subscribe(&self) -> StatusReceiver {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, id: usize, msg: String, progress: u8, is_working: bool) {
        // An error only means nobody is subscribed right now
        let _ = self.sender.send(CpuStatus {
            id,
            msg,
            progress: progress.min(100),
            is_working,
        });
    }
}
