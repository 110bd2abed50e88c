//! Per-source admission registry.

use dashmap::DashMap;
use std::time::Instant;
use tracing::{debug, trace};

use super::rules::LimitRules;
use super::window::SlidingWindow;

/// Per-source rate limiter backed by lazily created sliding windows.
///
/// One window bucket exists per distinct source id, created on first use and
/// kept for the process lifetime (source ids are a small, bounded set; there
/// is no eviction). This struct is thread-safe and can be shared across
/// tasks; checks against the same source are serialized for the whole
/// prune-check-append step.
pub struct RateLimiter {
    /// Window state per source id
    buckets: DashMap<String, SlidingWindow>,
    /// Rules used when creating buckets
    rules: LimitRules,
}

impl RateLimiter {
    /// Create a rate limiter from a set of limit rules.
    pub fn new(rules: LimitRules) -> Self {
        Self {
            buckets: DashMap::new(),
            rules,
        }
    }

    /// Non-blocking admission check for `source`.
    ///
    /// Returns `true` and records the admission if the source's trailing
    /// window has capacity; returns `false` without changing state
    /// otherwise. Callers that want to wait for admission re-check later.
    pub fn can_admit(&self, source: &str) -> bool {
        let mut bucket = self
            .buckets
            .entry(source.to_string())
            .or_insert_with(|| {
                let rule = self.rules.rule_for(source);
                debug!(
                    source = %source,
                    max_requests = rule.max_requests,
                    window_ms = rule.window_ms,
                    "Creating rate limit bucket"
                );
                SlidingWindow::new(rule.max_requests, rule.window())
            });

        let admitted = bucket.try_admit(Instant::now());

        trace!(source = %source, admitted, "Admission check");
        if !admitted {
            debug!(source = %source, "Rate limit reached");
        }

        admitted
    }

    /// Get the number of admissions currently inside `source`'s window.
    ///
    /// Returns `None` if the source has never been checked.
    pub fn current_count(&self, source: &str) -> Option<usize> {
        self.buckets
            .get_mut(source)
            .map(|mut bucket| bucket.current_count(Instant::now()))
    }

    /// Clear all buckets.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.buckets.clear();
    }

    /// Get the number of active buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimitRules::default())
    }
}
