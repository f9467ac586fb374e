//! HTTP protocol handling.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, tracing, panic recovery, timeout)
//!     → rate limiter (security::rate_limit)
//!     → authentication (auth::middleware)
//!     → handler (quotes.rs, reactions.rs, users.rs, tokens.rs, health.rs)
//!     → response.rs (JSON envelope)
//! ```

pub mod health;
pub mod json;
pub mod params;
pub mod quotes;
pub mod reactions;
pub mod response;
pub mod server;
pub mod tokens;
pub mod users;

pub use server::{AppState, HttpServer};
