// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded background task submission.
//!
//! Submitting never blocks: a task either gets one of `queue_capacity`
//! backlog slots or is rejected on the spot. Accepted tasks run on the
//! tokio runtime with at most `max_concurrency` attempts executing at once,
//! and are tracked so shutdown can wait for them.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use courier_config::model::DispatchConfig;
use courier_core::CourierError;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;

/// Why a submission was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("dispatcher is shutting down")]
    ShuttingDown,
    #[error("dispatch backlog is full ({capacity} tasks pending)")]
    QueueFull { capacity: usize },
}

struct Inner {
    permits: Arc<Semaphore>,
    pending: AtomicUsize,
    capacity: usize,
    retry: RetryPolicy,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// Cloneable handle to the shared task pool.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(config: &DispatchConfig) -> Self {
        Self::with_policy(
            config.max_concurrency,
            config.queue_capacity,
            RetryPolicy::from_config(config),
        )
    }

    pub fn with_policy(max_concurrency: usize, queue_capacity: usize, retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
                pending: AtomicUsize::new(0),
                capacity: queue_capacity.max(1),
                retry,
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Tasks accepted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.tracker.is_closed()
    }

    /// Accepts `op` for background execution.
    ///
    /// `op` is called once per attempt. Failures are logged and counted under
    /// `task`; they never reach the submitter.
    pub fn submit<F, Fut>(&self, task: &'static str, op: F) -> Result<(), SubmitError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CourierError>> + Send + 'static,
    {
        let inner = &self.inner;
        if inner.tracker.is_closed() {
            courier_prometheus::record_dispatch_task(task, "rejected");
            warn!(task, "dispatcher closed, task rejected");
            return Err(SubmitError::ShuttingDown);
        }

        let reserved = inner
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < inner.capacity).then_some(n + 1)
            });
        let pending = match reserved {
            Ok(previous) => previous + 1,
            Err(_) => {
                courier_prometheus::record_dispatch_task(task, "rejected");
                warn!(task, capacity = inner.capacity, "dispatch backlog full, task rejected");
                return Err(SubmitError::QueueFull {
                    capacity: inner.capacity,
                });
            }
        };
        courier_prometheus::set_dispatch_in_flight(pending as f64);

        let shared = Arc::clone(inner);
        inner.tracker.spawn(async move {
            let started = Instant::now();
            let outcome = shared.run(task, op).await;

            let remaining = shared.pending.fetch_sub(1, Ordering::AcqRel) - 1;
            courier_prometheus::set_dispatch_in_flight(remaining as f64);
            courier_prometheus::record_dispatch_latency(task, started.elapsed().as_secs_f64());

            match outcome {
                Ok(()) => {
                    courier_prometheus::record_dispatch_task(task, "succeeded");
                    debug!(task, "dispatch task completed");
                }
                Err(e) => {
                    courier_prometheus::record_dispatch_task(task, "failed");
                    warn!(task, error = %e, "dispatch task failed");
                }
            }
        });
        Ok(())
    }

    /// Stops accepting tasks and waits up to `timeout` for accepted ones.
    ///
    /// Returns `true` when everything finished in time. On timeout, pending
    /// backoffs are cancelled so retries stop early.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let tracker = &self.inner.tracker;
        tracker.close();
        let pending = self.in_flight();
        if pending == 0 {
            info!("no dispatch tasks to drain");
            return true;
        }
        info!(count = pending, "waiting for dispatch tasks to complete");

        match tokio::time::timeout(timeout, tracker.wait()).await {
            Ok(()) => {
                info!("all dispatch tasks drained");
                true
            }
            Err(_) => {
                self.inner.cancel.cancel();
                warn!(
                    remaining = self.in_flight(),
                    "drain timeout reached, abandoning dispatch tasks"
                );
                false
            }
        }
    }
}

impl Inner {
    async fn run<F, Fut>(&self, task: &'static str, mut op: F) -> Result<(), CourierError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), CourierError>>,
    {
        let permits = Arc::clone(&self.permits);
        // A permit is held per attempt, not across backoff sleeps.
        let attempt = move || {
            let permits = Arc::clone(&permits);
            let fut = op();
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| CourierError::Internal("dispatcher permits closed".into()))?;
                fut.await
            }
        };
        self.retry.run(task, &self.cancel, attempt).await
    }
}
