//! Quotable API Library

pub mod auth;
pub mod config;
pub mod consistency;
pub mod data;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod query;
pub mod resilience;
pub mod security;
pub mod validator;

pub use config::schema::AppConfig;
pub use error::ApiError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
