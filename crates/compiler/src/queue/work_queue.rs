//! Fixed-size worker pool draining a single shared task queue

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{QueueError, TaskError};
use super::status::{STATUS_CHANNEL_CAPACITY, StatusReceiver, StatusReporter};

type Job = Box<dyn FnOnce() + Send + 'static>;

static NEXT_QUEUE_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    /// (queue id, worker index) of the pool owning the current thread
    static CURRENT_WORKER: Cell<Option<(usize, usize)>> = const { Cell::new(None) };
}

/// Worker index of the current thread if it belongs to queue `queue_id`
pub(crate) fn current_worker(queue_id: usize) -> Option<usize> {
    CURRENT_WORKER.with(|current| match current.get() {
        Some((queue, index)) if queue == queue_id => Some(index),
        _ => None,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_task<R>(task: impl FnOnce() -> R) -> Result<R, TaskError> {
    panic::catch_unwind(AssertUnwindSafe(task)).map_err(TaskError::from_panic)
}

/// Number of workers used when the caller asks for `0`
pub fn default_thread_count() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Handle to the result of a task queued with [`WorkQueue::spawn`]
#[derive(Debug)]
pub struct TaskHandle<R> {
    result: Receiver<Result<R, TaskError>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task has run
    ///
    /// Returns [`TaskError::Cancelled`] if the queue was cancelled before the
    /// task started.
    pub fn join(self) -> Result<R, TaskError> {
        self.result.recv().unwrap_or(Err(TaskError::Cancelled))
    }
}

/// Fixed pool of OS worker threads sharing one task queue
///
/// Ordering between unrelated tasks is not guaranteed. [`parallel_map`]
/// preserves input order in its output.
///
/// Calls to [`spawn`] and [`parallel_map`] made from one of this queue's own
/// workers run inline on that worker, so a task may fan out without
/// deadlocking a small pool.
///
/// [`parallel_map`]: WorkQueue::parallel_map
/// [`spawn`]: WorkQueue::spawn
pub struct WorkQueue {
    id: usize,
    jobs: Mutex<Option<Sender<Job>>>,
    /// Kept so abandoned jobs can be drained on shutdown
    backlog: Receiver<Job>,
    /// Dropped on cancellation to wake every worker blocked on the queue
    wake: Mutex<Option<Sender<()>>>,
    cancel: CancellationToken,
    reporter: StatusReporter,
    threads: Mutex<Vec<JoinHandle<()>>>,
    thread_count: usize,
}

impl WorkQueue {
    /// Start a pool with `thread_count` workers, or one per CPU when `0`
    pub fn new(thread_count: usize) -> Result<Self, QueueError> {
        let thread_count = if thread_count == 0 {
            default_thread_count()
        } else {
            thread_count
        };

        let id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
        let (job_tx, job_rx) = unbounded::<Job>();
        let (wake_tx, wake_rx) = bounded::<()>(0);
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let reporter = StatusReporter::new(id, status_tx);
        let cancel = CancellationToken::new();

        let mut threads = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let worker = Worker {
                queue_id: id,
                index,
                jobs: job_rx.clone(),
                wake: wake_rx.clone(),
                cancel: cancel.clone(),
                reporter: reporter.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("compiler-worker-{}", index))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => threads.push(handle),
                Err(source) => {
                    cancel.cancel();
                    drop(wake_tx);
                    for handle in threads {
                        let _ = handle.join();
                    }
                    return Err(QueueError::SpawnFailed { index, source });
                }
            }
        }

        debug!("Started work queue {} with {} workers", id, thread_count);

        Ok(Self {
            id,
            jobs: Mutex::new(Some(job_tx)),
            backlog: job_rx,
            wake: Mutex::new(Some(wake_tx)),
            cancel,
            reporter,
            threads: Mutex::new(threads),
            thread_count,
        })
    }

    /// Number of worker threads in the pool
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Subscribe to the live status feed
    pub fn subscribe(&self) -> StatusReceiver {
        self.reporter.subscribe()
    }

    /// Handle that tasks can move in to publish their own phase labels
    pub fn reporter(&self) -> StatusReporter {
        self.reporter.clone()
    }

    /// Token that is cancelled once [`cancel`](WorkQueue::cancel) or
    /// [`shutdown`](WorkQueue::shutdown) is called
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the calling thread is one of this queue's workers
    pub fn is_worker_thread(&self) -> bool {
        current_worker(self.id).is_some()
    }

    /// Enqueue a fire-and-forget task
    ///
    /// A panic inside `task` is logged and swallowed by the worker.
    pub fn submit<F>(&self, task: F) -> Result<(), QueueError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(task))
    }

    /// Enqueue a task and get a handle to its result
    pub fn spawn<R, F>(&self, task: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let job = move || {
            let _ = tx.send(run_task(task));
        };

        if self.is_worker_thread() {
            job();
        } else if let Err(e) = self.enqueue(Box::new(job)) {
            debug!("Task not queued: {}", e);
        }

        TaskHandle { result: rx }
    }

    /// Run `f` over every item on the pool and return the results in input order
    ///
    /// Each item gets its own result slot; a panic in `f` or cancellation of
    /// the queue before the item started only affects that slot. Blocks until
    /// every slot is filled.
    pub fn parallel_map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<Result<R, TaskError>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        if items.is_empty() {
            return Vec::new();
        }

        if self.is_worker_thread() {
            return items.into_iter().map(|item| run_task(|| f(item))).collect();
        }

        let count = items.len();
        let f = Arc::new(f);
        let (tx, rx) = bounded::<(usize, Result<R, TaskError>)>(count);

        for (index, item) in items.into_iter().enumerate() {
            let f = Arc::clone(&f);
            let tx = tx.clone();
            let job = move || {
                let _ = tx.send((index, run_task(|| f(item))));
            };
            if self.enqueue(Box::new(job)).is_err() {
                break;
            }
        }
        drop(tx);

        let mut slots: Vec<Option<Result<R, TaskError>>> = (0..count).map(|_| None).collect();
        // Ends once every job has either reported or been dropped unexecuted
        for (index, result) in rx.iter() {
            slots[index] = Some(result);
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(TaskError::Cancelled)))
            .collect()
    }

    /// Raise the cancellation signal without waiting for the workers
    ///
    /// Tasks already running finish; queued tasks are never started.
    ///
    /// Queued tasks are dropped here, so their handles and
    /// [`parallel_map`](WorkQueue::parallel_map) slots resolve to
    /// [`TaskError::Cancelled`] instead of waiting on a worker.
    pub fn cancel(&self) {
        self.cancel.cancel();
        lock(&self.wake).take();
        self.drain_backlog();
    }

    /// Cancel, join every worker except the calling thread, then drop
    /// whatever is still queued
    pub fn shutdown(&self) {
        self.cancel();

        let current = thread::current().id();
        let handles: Vec<JoinHandle<()>> = lock(&self.threads).drain(..).collect();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("Worker thread of queue {} exited abnormally", self.id);
            }
        }

        lock(&self.jobs).take();
        self.drain_backlog();
    }

    fn drain_backlog(&self) {
        let abandoned = self.backlog.try_iter().count();
        if abandoned > 0 {
            debug!("Abandoned {} queued tasks on queue {}", abandoned, self.id);
        }
    }

    fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        if self.cancel.is_cancelled() {
            return Err(QueueError::ShutDown);
        }
        match lock(&self.jobs).as_ref() {
            Some(tx) => tx.send(job).map_err(|_| QueueError::ShutDown)?,
            None => return Err(QueueError::ShutDown),
        }
        // cancel() may have drained between the check above and the send
        if self.cancel.is_cancelled() {
            self.drain_backlog();
        }
        Ok(())
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("id", &self.id)
            .field("thread_count", &self.thread_count)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

struct Worker {
    queue_id: usize,
    index: usize,
    jobs: Receiver<Job>,
    wake: Receiver<()>,
    cancel: CancellationToken,
    reporter: StatusReporter,
}

impl Worker {
    fn run(self) {
        CURRENT_WORKER.with(|current| current.set(Some((self.queue_id, self.index))));

        loop {
            self.reporter.publish(self.index, "Waiting".to_string(), 0, false);
            if self.cancel.is_cancelled() {
                break;
            }

            let job = select! {
                recv(self.jobs) -> job => match job {
                    Ok(job) => job,
                    Err(_) => break,
                },
                recv(self.wake) -> _ => break,
            };

            // Both channels can be ready at once; a job picked after
            // cancellation is abandoned, never started
            if self.cancel.is_cancelled() {
                drop(job);
                break;
            }

            self.reporter.publish(self.index, "Working".to_string(), 0, true);
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                warn!(
                    "Worker {} recovered from a failed task: {}",
                    self.index,
                    TaskError::from_panic(payload)
                );
            }
        }

        CURRENT_WORKER.with(|current| current.set(None));
        debug!("Worker {} of queue {} stopped", self.index, self.queue_id);
    }
}
