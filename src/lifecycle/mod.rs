//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Open store → Start sweeper, task pool, watcher → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Server stops accepting and drains → Task pool drains → Sweeper joined
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod background;
pub mod shutdown;
pub mod signals;

pub use background::{SubmitError, TaskPool, TaskPoolHandle};
pub use shutdown::Shutdown;
