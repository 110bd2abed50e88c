//! Fixed-size pool of expensive, reusable handles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::Result;

/// Asynchronous allocator for pooled handles.
///
/// Implementations produce the expensive resource a [`ResourcePool`]
/// manages, e.g. launching a headless browser process. Teardown is out of
/// scope: the pool never destroys a handle it has created.
#[async_trait]
pub trait HandleFactory: Send + Sync {
    /// The pooled resource type.
    type Handle: Send;

    /// Allocate a new handle.
    async fn create(&self) -> Result<Self::Handle>;
}

/// A fixed-size pool of reusable handles with FIFO waiter fairness.
///
/// Invariants: the number of handles ever created equals idle plus
/// checked-out handles and never exceeds the configured size; a handle is
/// owned either by the pool or by exactly one caller, never both.
pub struct ResourcePool<F: HandleFactory> {
    size: usize,
    factory: F,
    state: Mutex<PoolState<F::Handle>>,
}

struct PoolState<H> {
    /// Handles currently owned by the pool
    idle: Vec<H>,
    /// Handles ever created (idle + checked out)
    created: usize,
    /// Callers waiting for a handle, arrival order
    waiters: VecDeque<oneshot::Sender<H>>,
}

impl<F: HandleFactory> ResourcePool<F> {
    /// Create a pool holding at most `size` handles allocated by `factory`.
    pub fn new(size: usize, factory: F) -> Self {
        Self {
            size,
            factory,
            state: Mutex::new(PoolState {
                idle: Vec::with_capacity(size),
                created: 0,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Acquire a handle, waiting if the pool is exhausted.
    ///
    /// Hands out an idle handle when one exists, allocates a new one while
    /// fewer than `size` handles have been created, and otherwise waits FIFO
    /// for the next release. Every acquired handle must be passed back
    /// through [`release`](Self::release) exactly once, on every exit path;
    /// a handle that is dropped instead permanently reduces the pool's
    /// capacity.
    pub async fn acquire(&self) -> Result<F::Handle> {
        let waiter = {
            let mut state = self.state.lock();

            if let Some(handle) = state.idle.pop() {
                trace!(idle = state.idle.len(), "Handing out idle handle");
                return Ok(handle);
            }

            if state.created < self.size {
                // Reserve the creation slot before the factory runs, so
                // concurrent acquirers cannot oversubscribe the pool.
                state.created += 1;
                debug!(
                    created = state.created,
                    size = self.size,
                    "Allocating new pool handle"
                );
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                trace!(
                    waiting = state.waiters.len(),
                    "Pool exhausted, waiting for a release"
                );
                Some(rx)
            }
        };

        match waiter {
            Some(rx) => Ok(rx.await.expect("pool dropped while callers were waiting")),
            None => match self.factory.create().await {
                Ok(handle) => Ok(handle),
                Err(e) => {
                    // A failed creation does not count against the pool
                    self.state.lock().created -= 1;
                    debug!(error = %e, "Pool handle allocation failed");
                    Err(e)
                }
            },
        }
    }

    /// Return a handle to the pool.
    ///
    /// If callers are waiting, the handle goes straight to the head waiter
    /// instead of passing through the idle list.
    pub fn release(&self, handle: F::Handle) {
        let mut state = self.state.lock();

        let mut handle = handle;
        while let Some(tx) = state.waiters.pop_front() {
            match tx.send(handle) {
                Ok(()) => {
                    trace!(waiting = state.waiters.len(), "Handle handed to head waiter");
                    return;
                }
                // Waiter gave up; offer the handle to the next one
                Err(returned) => handle = returned,
            }
        }

        state.idle.push(handle);
        trace!(idle = state.idle.len(), "Handle returned to idle list");
    }

    /// Number of idle handles currently owned by the pool.
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Number of handles created so far.
    pub fn created_count(&self) -> usize {
        self.state.lock().created
    }

    /// Number of callers waiting for a handle.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    #[derive(Debug, PartialEq, Eq)]
    struct TestHandle(u32);

    /// Hands out sequentially numbered handles.
    struct CountingFactory {
        next_id: AtomicU32,
    }

    impl CountingFactory {
        fn new() -> Self {
            Self {
                next_id: AtomicU32::new(1),
            }
        }
    }

    #[async_trait]
    impl HandleFactory for CountingFactory {
        type Handle = TestHandle;

        async fn create(&self) -> Result<TestHandle> {
            Ok(TestHandle(self.next_id.fetch_add(1, Ordering::SeqCst)))
        }
    }

    /// Fails the first `failures` allocations, then behaves like
    /// [`CountingFactory`].
    struct FlakyFactory {
        failures: AtomicU32,
        inner: CountingFactory,
    }

    #[async_trait]
    impl HandleFactory for FlakyFactory {
        type Handle = TestHandle;

        async fn create(&self) -> Result<TestHandle> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Allocation("browser failed to launch".into()));
            }
            self.inner.create().await
        }
    }

    #[tokio::test]
    async fn test_creates_up_to_size() {
        let pool = ResourcePool::new(2, CountingFactory::new());

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        assert_eq!(a, TestHandle(1));
        assert_eq!(b, TestHandle(2));
        assert_eq!(pool.created_count(), 2);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_idle_handle_is_reused() {
        let pool = ResourcePool::new(2, CountingFactory::new());

        let a = pool.acquire().await.unwrap();
        pool.release(a);
        assert_eq!(pool.idle_count(), 1);

        // No new handle is created while an idle one exists
        let again = pool.acquire().await.unwrap();
        assert_eq!(again, TestHandle(1));
        assert_eq!(pool.created_count(), 1);
    }

    #[tokio::test]
    async fn test_capacity_and_handle_identity() {
        let pool = ResourcePool::new(2, CountingFactory::new());

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        // A third acquire suspends until a release occurs...
        let mut third = task::spawn(pool.acquire());
        assert_pending!(third.poll());
        assert_eq!(pool.waiting(), 1);
        assert_eq!(pool.created_count(), 2);

        // ...and receives the exact handle that was released
        pool.release(a);
        assert!(third.is_woken());
        let handed = assert_ready!(third.poll()).unwrap();
        assert_eq!(handed, TestHandle(1));

        // The released handle bypassed the idle list entirely
        assert_eq!(pool.idle_count(), 0);
        pool.release(b);
        pool.release(handed);
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_waiters_served_fifo() {
        let pool = ResourcePool::new(1, CountingFactory::new());
        let held = pool.acquire().await.unwrap();

        let mut first = task::spawn(pool.acquire());
        let mut second = task::spawn(pool.acquire());
        assert_pending!(first.poll());
        assert_pending!(second.poll());
        assert_eq!(pool.waiting(), 2);

        pool.release(held);
        let handle = assert_ready!(first.poll()).unwrap();
        assert_pending!(second.poll());

        pool.release(handle);
        assert_ready!(second.poll()).unwrap();
    }

    #[tokio::test]
    async fn test_allocation_failure_restores_count() {
        let pool = ResourcePool::new(2, FlakyFactory {
            failures: AtomicU32::new(1),
            inner: CountingFactory::new(),
        });

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, Error::Allocation(_)));
        assert_eq!(pool.created_count(), 0);

        // The failed creation left the slot free for a retrying caller
        let handle = pool.acquire().await.unwrap();
        assert_eq!(handle, TestHandle(1));
        assert_eq!(pool.created_count(), 1);
    }
}
