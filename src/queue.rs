//! Concurrency-bounded task queue with backpressure.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// A concurrency-limited task runner with a bounded FIFO wait list.
///
/// At most `max_concurrent` submitted tasks execute at once. Excess
/// submissions wait in arrival order, up to `max_queue_size` of them; beyond
/// that, submission fails immediately with [`Error::QueueFull`] rather than
/// buffering without bound.
///
/// There is no way to cancel a submission once accepted; callers wait until
/// their task has run.
pub struct BoundedQueue {
    max_concurrent: usize,
    max_queue_size: usize,
    state: Mutex<QueueState>,
}

struct QueueState {
    /// Tasks currently holding a running slot
    running: usize,
    /// Wakers for submissions waiting on a slot, arrival order
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl BoundedQueue {
    /// Create a queue running at most `max_concurrent` tasks with at most
    /// `max_queue_size` submissions waiting.
    pub fn new(max_concurrent: usize, max_queue_size: usize) -> Self {
        Self {
            max_concurrent,
            max_queue_size,
            state: Mutex::new(QueueState {
                running: 0,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Submit a task for execution.
    ///
    /// The task starts immediately if a running slot is free, waits FIFO if
    /// the wait list has room, and is rejected with [`Error::QueueFull`]
    /// otherwise. The task's own output (success or failure) flows back to
    /// the caller unchanged; a failing task frees its slot like any other
    /// and never affects sibling tasks.
    pub async fn submit<T, F, Fut>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let admission = {
            let mut state = self.state.lock();
            if state.running < self.max_concurrent {
                state.running += 1;
                None
            } else if state.waiters.len() < self.max_queue_size {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                trace!(waiting = state.waiters.len(), "Task queued for a running slot");
                Some(rx)
            } else {
                debug!(
                    waiting = state.waiters.len(),
                    "Wait list saturated, rejecting submission"
                );
                return Err(Error::QueueFull {
                    waiting: state.waiters.len(),
                });
            }
        };

        if let Some(rx) = admission {
            // The releasing task transfers its running slot to us before
            // signalling, so the slot is already ours when this resolves.
            rx.await.expect("queue dropped while tasks were waiting");
        }

        let _slot = SlotGuard { queue: self };
        Ok(task().await)
    }

    /// Number of tasks currently executing.
    pub fn running(&self) -> usize {
        self.state.lock().running
    }

    /// Number of submissions waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn release_slot(&self) {
        let mut state = self.state.lock();

        // Hand the freed slot straight to the head waiter, preserving
        // arrival order; skip waiters whose submission was dropped while
        // queued.
        while let Some(tx) = state.waiters.pop_front() {
            if tx.send(()).is_ok() {
                trace!(waiting = state.waiters.len(), "Slot handed to head waiter");
                return;
            }
        }

        state.running -= 1;
    }
}

/// Releases the running slot when the task settles, however it settles.
struct SlotGuard<'a> {
    queue: &'a BoundedQueue,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.queue.release_slot();
    }
}
