//! Bounded-concurrency fetch runner
//!
//! A [`Job`] pairs an ordered list of inputs (usually prepared HTTP requests)
//! with a task that turns one input into a decoded value. [`execute`] runs every
//! input with at most `workers` tasks in flight and returns one outcome per
//! input, in input order, so failures can be attributed to their source.
//!
//! Individual failures never abort the batch. Only a job that cannot be
//! dispatched at all (no inputs, zero workers) fails the whole call.

mod decode;

pub use decode::{decode_json_task, decode_xml_task};

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default number of fetches in flight per job
pub const DEFAULT_WORKERS: usize = 30;

/// A batch of independent fetches
pub struct Job<I, F> {
    items: Vec<I>,
    task: F,
    workers: usize,
}

impl<I, F> Job<I, F> {
    /// Create a job running `task` once per item with the default worker count
    pub fn new(task: F, items: Vec<I>) -> Self {
        Self {
            items,
            task,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Set the maximum number of tasks in flight
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Number of inputs in this job
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the job has no inputs
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Run every item of `job`, at most `job.workers` at a time.
///
/// The returned vector has exactly one slot per input item, in input order.
/// Each task runs on its own tokio task; a panicking task fills its slot with
/// [`Error::TaskFailed`] instead of tearing down the batch.
///
/// # Errors
///
/// Returns [`Error::EmptyJob`] when there is nothing to dispatch and
/// [`Error::Config`] when the worker count is zero.
pub async fn execute<I, T, F, Fut>(job: Job<I, F>) -> Result<Vec<Result<T>>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let Job {
        items,
        task,
        workers,
    } = job;

    if items.is_empty() {
        return Err(Error::EmptyJob);
    }

    if workers == 0 {
        return Err(Error::Config {
            message: "fetch job needs at least one worker".to_string(),
            key: Some("workers".to_string()),
        });
    }

    let total = items.len();
    let permits = Arc::new(Semaphore::new(workers.min(total)));
    let task = Arc::new(task);

    tracing::debug!(total, workers, "Dispatching fetch job");

    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let permits = Arc::clone(&permits);
            let task = Arc::clone(&task);

            tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::TaskFailed(format!("worker pool closed: {}", e)))?;
                task(item).await
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(total);
    for (index, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(index, error = %e, "Fetch task did not complete");
                Err(Error::TaskFailed(e.to_string()))
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}
