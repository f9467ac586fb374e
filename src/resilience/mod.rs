//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Server side, call into the store:
//!     → timeouts.rs (every store call has a deadline)
//!
//! Client side (quotable-cli), 503 Unavailable response:
//!     → backoff.rs (jittered exponential delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - The server never retries; only Unavailable is retryable, by the caller

pub mod backoff;
pub mod timeouts;
