//! Parallel work scheduling
//!
//! A fixed pool of worker threads drains one shared task queue. Indexing and
//! the compilation stack both fan out through [`WorkQueue::parallel_map`],
//! which keeps results in input order and confines a failing task to its own
//! result slot.

pub mod error;
pub mod status;
pub mod work_queue;

pub use error::{QueueError, TaskError};
pub use status::{CpuStatus, RecvError, StatusReceiver, StatusReporter};
pub use work_queue::{TaskHandle, WorkQueue, default_thread_count};

#[cfg(test)]
mod tests;
