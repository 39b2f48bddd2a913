use std::thread::{self, ThreadId};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::models::error::CaptureError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single background thread running jobs one at a time, in submission order.
///
/// All pipeline mutations go through one of these, so concurrent
/// reconfiguration requests are totally ordered and never interleave.
pub struct SerialQueue {
    sender: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl SerialQueue {
    pub fn new(label: &str) -> Result<Self, CaptureError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let handle = thread::Builder::new()
            .name(label.to_string())
            .spawn(move || run(receiver))
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn {}: {}", label, e)))?;
        let thread_id = handle.thread().id();

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    /// Whether the caller is running on this queue.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Enqueue `job` without waiting for it.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> Result<(), CaptureError> {
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(CaptureError::QueueClosed)?;
        sender.send(Box::new(job)).map_err(|_| CaptureError::QueueClosed)
    }

    /// Run `job` on the queue and wait for its result.
    ///
    /// Jobs already queued run first. Called from the queue itself, `job`
    /// runs inline instead of deadlocking.
    pub fn execute_sync<R, F>(&self, job: F) -> Result<R, CaptureError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Ok(job());
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        self.execute(move || {
            let _ = tx.send(job());
        })?;
        rx.recv().map_err(|_| CaptureError::QueueClosed)
    }

    /// Stop accepting jobs, let queued ones finish, and join the thread.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if self.is_current() {
            // Dropped from one of our own jobs; the thread exits once the job returns.
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                log::error!("Session queue thread panicked");
            }
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(receiver: Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        job();
    }
    log::debug!("Session queue drained, exiting");
}
