//! Request dispatch composing the queue, the rate limiter, and retry.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::GovernorConfig;
use crate::error::Result;
use crate::limit::RateLimiter;
use crate::queue::BoundedQueue;
use crate::retry::RetryPolicy;

/// How often an admitted task re-checks its source's rate limit.
const ADMISSION_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Entry point for governed outbound requests.
///
/// One dispatcher instance is shared by all callers: the queue bounds total
/// in-flight work across every source, the rate limiter bounds per-source
/// throughput, and the retry policy smooths over transient transport
/// failures within one admitted attempt.
///
/// A request moves through: queued, waiting for rate admission, in flight,
/// then settled. Saturation of the wait list rejects the request at
/// submission instead, with [`Error::QueueFull`](crate::error::Error);
/// callers can tell that capacity rejection apart from a transport failure
/// by the error variant.
pub struct RequestDispatcher {
    queue: BoundedQueue,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl RequestDispatcher {
    /// Build a dispatcher from configuration.
    pub fn new(config: &GovernorConfig) -> Self {
        Self::with_parts(
            BoundedQueue::new(config.queue.max_concurrent, config.queue.max_queue_size),
            RateLimiter::new(config.limits.clone()),
            RetryPolicy::new(config.retry.max_attempts, config.retry.base_delay()),
        )
    }

    /// Build a dispatcher from prebuilt components.
    pub fn with_parts(queue: BoundedQueue, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            queue,
            limiter,
            retry,
        }
    }

    /// Perform a request against `source` under the governance stack.
    ///
    /// The request waits for a concurrency slot, then for the source's rate
    /// limit to admit it, then runs `request` under the retry policy. Fails
    /// with [`Error::QueueFull`](crate::error::Error) if the wait list is
    /// saturated at submission; otherwise the transport's own result comes
    /// back, the final error untouched once retries are exhausted.
    pub async fn perform<T, F, Fut>(&self, source: &str, request: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.queue
            .submit(|| async move {
                while !self.limiter.can_admit(source) {
                    trace!(source = %source, "Waiting for rate admission");
                    tokio::time::sleep(ADMISSION_POLL_INTERVAL).await;
                }

                debug!(source = %source, "Admitted, executing transport");
                self.retry.run(request).await
            })
            .await?
    }

    /// The rate limiter registry backing this dispatcher.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The shared task queue backing this dispatcher.
    pub fn queue(&self) -> &BoundedQueue {
        &self.queue
    }
}
