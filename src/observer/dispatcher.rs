//! Pluggable event dispatchers (spec §4.7 point 5, §9): a dispatcher
//! receives a zero-argument callable and must eventually invoke it exactly
//! once; callables from a single subscription are invoked in submission
//! order.
//!
//! Grounded on the `spawn(...) -> JoinHandle<()>` consuming-self task
//! idiom the teacher uses for its connection-handling tasks.

use std::sync::Arc;

use async_channel::Sender;
use tokio::task::JoinHandle;

/// A callable a dispatcher must invoke exactly once.
pub type Job = Box<dyn FnOnce() + Send>;

/// Accepts jobs and guarantees each runs exactly once, in submission order
/// per caller.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// Invokes the job directly on the caller's thread before returning.
#[derive(Debug, Default)]
pub struct CallerThreadDispatcher;

impl Dispatcher for CallerThreadDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Enqueues jobs onto a dedicated worker task, which drains them in
/// submission order. One worker per subscription preserves per-source
/// ordering without serializing unrelated subscriptions against each
/// other.
pub struct WorkerDispatcher {
    sender: Sender<Job>,
    _worker: JoinHandle<()>,
}

impl WorkerDispatcher {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = async_channel::unbounded::<Job>();
        let worker = Worker { receiver };
        Arc::new(Self { sender, _worker: worker.spawn() })
    }
}

impl Dispatcher for WorkerDispatcher {
    fn dispatch(&self, job: Job) {
        if self.sender.try_send(job).is_err() {
            tracing::warn!(backend = "worker_dispatcher", "dispatch after worker shutdown");
        }
    }
}

struct Worker {
    receiver: async_channel::Receiver<Job>,
}

impl Worker {
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        while let Ok(job) = self.receiver.recv().await {
            job();
        }
    }
}
