//! Gatehouse - Outbound Request Governance
//!
//! This crate governs how an application makes outbound requests to
//! rate-limited and resource-expensive external content sources. It bounds
//! per-source request rates with sliding-window admission, bounds
//! system-wide concurrency with a backpressured task queue, retries
//! transient transport failures with a fixed delay, and manages a
//! fixed-size pool of expensive reusable handles (such as headless browser
//! processes) with FIFO fairness.
//!
//! The crate is a library boundary: transports and resource allocators are
//! supplied by the caller, and nothing here inspects what they return.
//! There is no cancellation or timeout surface; a caller that stops
//! waiting does not revoke work it has already submitted.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod limit;
pub mod pool;
pub mod queue;
pub mod retry;
