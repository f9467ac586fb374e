//! SQLite-backed record, credential and permission stores.
//!
//! Every call runs under the configured query deadline; a call that runs
//! past it fails with [`StoreError::Timeout`].

mod db;
pub mod models;
pub mod permissions;
mod quotes;
mod reactions;
mod tokens;
mod users;

#[cfg(test)]
mod tests;

pub use db::{unix_timestamp, Database, StoreError};
pub use models::{NewQuote, Permissions, Quote, Reaction, ReactionCounts, Source, User};
