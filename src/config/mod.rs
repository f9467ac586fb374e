//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + command line overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → [limiter] section swapped into the ClientRegistry
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Only limiter settings are reloadable; everything else needs a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AppConfig;
pub use schema::AuthConfig;
pub use schema::DatabaseConfig;
pub use schema::LimiterConfig;
pub use schema::ObservabilityConfig;
pub use schema::ServerConfig;
pub use schema::WorkerConfig;
