//! Per-source rate limiting logic and state management.

mod registry;
mod rules;
mod window;

pub use registry::RateLimiter;
pub use rules::{LimitRule, LimitRules};
pub use window::SlidingWindow;
