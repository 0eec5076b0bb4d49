//! Bounded worker pool with completion tracking
//!
//! Every submitted unit of work runs as its own tokio task, at most
//! `workers` at a time. [`WorkerPool::wait`] resolves once no work is in
//! flight, including work submitted by other work, and hands back the
//! failures collected so far.

use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Semaphore};

/// A unit of work that returned an error or panicked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub task: String,
    pub error: String,
}

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    in_flight: Arc<watch::Sender<usize>>,
    failures: Arc<Mutex<Vec<TaskFailure>>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            in_flight: Arc::new(in_flight),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Schedule `work`; failures are recorded, never propagated to siblings
    pub fn submit<F>(&self, task: impl Into<String>, work: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let task = task.into();
        let permits = self.permits.clone();
        let in_flight = self.in_flight.clone();
        let failures = self.failures.clone();

        in_flight.send_modify(|n| *n += 1);
        tracing::trace!("submitted {}", task);

        tokio::spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => {
                    let outcome = AssertUnwindSafe(work).catch_unwind().await;
                    drop(permit);
                    outcome
                }
                Err(_) => Ok(Err(anyhow::anyhow!("worker pool closed"))),
            };

            let error = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{:#}", e)),
                Err(_) => Some("task panicked".to_string()),
            };

            if let Some(error) = error {
                tracing::warn!("task {} failed: {}", task, error);
                failures.lock().await.push(TaskFailure { task, error });
            }

            in_flight.send_modify(|n| *n -= 1);
        });
    }

    /// Number of submitted units not yet finished
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until all submitted work is done; drains the recorded failures
    pub async fn wait(&self) -> Vec<TaskFailure> {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in self, so this only returns once the count hits zero
        let _ = rx.wait_for(|n| *n == 0).await;
        std::mem::take(&mut *self.failures.lock().await)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(16)
    }
}
