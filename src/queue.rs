//! Serial dispatch queues.
//!
//! Each [`SerialQueue`] owns one worker thread that runs jobs one at a time in
//! the order they were dispatched. The session manager confines every session
//! mutation to its own queue, frames are delivered on a second queue, and the
//! published state is written from a third ("main") queue supplied by the
//! application.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling class a queue was created for.
///
/// Threads created by the standard library have no portable priority knob, so
/// this is carried as a label on the worker thread and in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityOfService {
    UserInteractive,
    UserInitiated,
    Default,
    Utility,
    Background,
}

impl QualityOfService {
    pub fn name(&self) -> &'static str {
        match self {
            QualityOfService::UserInteractive => "user-interactive",
            QualityOfService::UserInitiated => "user-initiated",
            QualityOfService::Default => "default",
            QualityOfService::Utility => "utility",
            QualityOfService::Background => "background",
        }
    }
}

struct QueueInner {
    label: String,
    qos: QualityOfService,
    tx: Sender<Job>,
    worker: ThreadId,
}

/// Handle to a serial queue. Cloning shares the same worker thread; the
/// worker exits once every handle has been dropped and its backlog drained.
#[derive(Clone)]
pub struct SerialQueue {
    inner: Arc<QueueInner>,
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.inner.label)
            .field("qos", &self.inner.qos)
            .finish()
    }
}

impl SerialQueue {
    /// Spawn a new queue with its own worker thread.
    ///
    /// # Errors
    /// Returns the I/O error from the OS if the thread cannot be spawned.
    pub fn new(label: impl Into<String>, qos: QualityOfService) -> std::io::Result<Self> {
        let label = label.into();
        let (tx, rx) = mpsc::channel::<Job>();

        let thread_label = label.clone();
        let handle = thread::Builder::new()
            .name(format!("{} ({})", label, qos.name()))
            .spawn(move || {
                for job in rx {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("Job on queue '{}' panicked", thread_label);
                    }
                }
                log::debug!("Queue '{}' drained and closed", thread_label);
            })?;

        log::debug!("Created queue '{}' ({})", label, qos.name());

        Ok(Self {
            inner: Arc::new(QueueInner {
                label,
                qos,
                tx,
                worker: handle.thread().id(),
            }),
        })
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn qos(&self) -> QualityOfService {
        self.inner.qos
    }

    /// True when called from this queue's worker thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.worker
    }

    /// Enqueue a job and return immediately.
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.tx.send(Box::new(job)).is_err() {
            log::warn!("Queue '{}' is closed, job dropped", self.inner.label);
        }
    }

    /// Run a job on the queue and wait for its result.
    ///
    /// Jobs dispatched earlier run first, so `sync(|| ())` acts as a barrier.
    /// Called from the queue's own thread, the job runs inline instead of
    /// deadlocking.
    pub fn sync<F, R>(&self, job: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return job();
        }

        let (result_tx, result_rx) = mpsc::channel();
        self.dispatch(move || {
            let _ = result_tx.send(job());
        });

        // The worker holds the sender until the job returns; a closed channel
        // means the job panicked on the queue.
        match result_rx.recv() {
            Ok(result) => result,
            Err(_) => panic::resume_unwind(Box::new(format!(
                "sync job on queue '{}' panicked",
                self.inner.label
            ))),
        }
    }

    /// Stop the queue from starting new jobs until the returned guard is
    /// resumed or dropped. Jobs dispatched after this call wait behind it.
    pub fn suspend(&self) -> Suspension {
        let (tx, rx) = mpsc::channel::<()>();
        let label = self.inner.label.clone();
        self.dispatch(move || {
            log::debug!("Queue '{}' suspended", label);
            // Returns on resume() or when the guard is dropped.
            let _ = rx.recv();
            log::debug!("Queue '{}' resumed", label);
        });
        Suspension { tx: Some(tx) }
    }
}

/// Guard returned by [`SerialQueue::suspend`].
#[derive(Debug)]
pub struct Suspension {
    tx: Option<Sender<()>>,
}

impl Suspension {
    pub fn resume(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Suspension {
    fn drop(&mut self) {
        self.release();
    }
}
