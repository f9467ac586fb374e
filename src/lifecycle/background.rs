//! Bounded pool for fire-and-forget work.
//!
//! Jobs wait in a bounded queue and run with bounded concurrency. Each job
//! gets its own task, so a panic is contained to that job and only shows up
//! as a `panicked` outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::WorkerConfig;
use crate::observability::metrics;

pub type JobError = Box<dyn std::error::Error + Send + Sync>;
type Job = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send>>;

struct Task {
    name: &'static str,
    job: Job,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("task queue is full")]
    QueueFull,
    #[error("task pool is shut down")]
    Closed,
}

/// Submission side of the pool. Cheap to clone.
#[derive(Clone)]
pub struct TaskPool {
    tx: mpsc::Sender<Task>,
}

/// Owner side of the pool, used to wait for it to drain.
pub struct TaskPoolHandle {
    dispatcher: JoinHandle<()>,
}

impl TaskPool {
    /// Start the dispatcher. It stops taking new work when `shutdown` fires
    /// and then finishes everything already queued.
    pub fn start(config: &WorkerConfig, shutdown: broadcast::Receiver<()>) -> (Self, TaskPoolHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let permits = Arc::new(Semaphore::new(config.size.max(1)));
        let dispatcher = tokio::spawn(dispatch(rx, permits, shutdown));
        (Self { tx }, TaskPoolHandle { dispatcher })
    }

    /// Queue `job` without waiting. Fails if the queue is full or closed.
    pub fn submit<F>(&self, name: &'static str, job: F) -> Result<(), SubmitError>
    where
        F: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.tx
            .try_send(Task {
                name,
                job: Box::pin(job),
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
            })
    }
}

impl TaskPoolHandle {
    /// Wait up to `timeout` for queued and running jobs. `true` if they all finished.
    pub async fn drain(self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.dispatcher).await {
            Ok(_) => {
                tracing::info!("Task pool drained");
                true
            }
            Err(_) => {
                tracing::warn!(?timeout, "Task pool drain timed out; abandoning remaining jobs");
                false
            }
        }
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<Task>,
    permits: Arc<Semaphore>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            Some(_) = running.join_next(), if !running.is_empty() => {}
            task = rx.recv() => match task {
                Some(task) => run(&mut running, &permits, task).await,
                None => break,
            },
        }
    }

    rx.close();
    while let Some(task) = rx.recv().await {
        run(&mut running, &permits, task).await;
    }
    while running.join_next().await.is_some() {}
}

async fn run(running: &mut JoinSet<()>, permits: &Arc<Semaphore>, task: Task) {
    let Ok(permit) = permits.clone().acquire_owned().await else {
        return;
    };
    let Task { name, job } = task;

    running.spawn(async move {
        let _permit = permit;
        let outcome = match tokio::spawn(job).await {
            Ok(Ok(())) => "ok",
            Ok(Err(e)) => {
                tracing::warn!(task = name, error = %e, "Background task failed");
                "failed"
            }
            Err(e) if e.is_panic() => {
                tracing::error!(task = name, "Background task panicked");
                "panicked"
            }
            Err(_) => "cancelled",
        };
        metrics::record_task_outcome(name, outcome);
    });
}
