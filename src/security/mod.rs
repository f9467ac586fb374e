//! Admission control.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, keyed by peer IP)
//!     → authentication and handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: a limiter configured with a non-positive rate or burst rejects everything
//! - The registry is an owned value handed to the middleware, never a global

pub mod rate_limit;

pub use rate_limit::ClientRegistry;
