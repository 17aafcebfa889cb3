//! Utility modules for ktn-sync

pub mod rate_limiter;

pub use rate_limiter::RateLimiter;
