//! Sliding-window admission log.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Admission history for a single source over a trailing time window.
///
/// The window keeps the exact log of admission times rather than a
/// fixed-bucket count, so "at most N requests in any trailing window" holds
/// exactly, with no burst at window boundaries. Cost is O(window size) per
/// check; limits here are small enough that this never matters.
#[derive(Debug)]
pub struct SlidingWindow {
    /// Maximum admissions allowed within the window
    max_requests: u32,
    /// Trailing window length
    window: Duration,
    /// Admission times, oldest first
    admissions: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Create a new window allowing `max_requests` admissions per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            admissions: VecDeque::with_capacity(max_requests as usize),
        }
    }

    /// Check whether a request may be admitted at `now`.
    ///
    /// Returns `true` and records the admission time if the trailing window
    /// holds fewer than `max_requests` admissions; returns `false` without
    /// changing any state otherwise. This is a non-blocking check, not a
    /// wait primitive.
    pub fn try_admit(&mut self, now: Instant) -> bool {
        self.prune(now);

        if (self.admissions.len() as u32) < self.max_requests {
            self.admissions.push_back(now);
            true
        } else {
            false
        }
    }

    /// Number of admissions recorded inside the trailing window.
    pub fn current_count(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.admissions.len()
    }

    /// Remaining admission quota for the trailing window.
    pub fn remaining(&mut self, now: Instant) -> u32 {
        self.prune(now);
        self.max_requests.saturating_sub(self.admissions.len() as u32)
    }

    /// Get the admission ceiling for this window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Get the trailing window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Drop admissions that have aged out of the trailing window.
    fn prune(&mut self, now: Instant) {
        // Early in the process `now - window` can underflow Instant's epoch;
        // nothing can have aged out in that case.
        let Some(cutoff) = now.checked_sub(self.window) else {
            return;
        };

        while matches!(self.admissions.front(), Some(&t) if t <= cutoff) {
            self.admissions.pop_front();
        }
    }
}
