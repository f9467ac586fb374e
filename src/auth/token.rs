//! Opaque bearer tokens. Only the SHA-256 digest is ever stored.

use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const SCOPE_AUTHENTICATION: &str = "authentication";
pub const TOKEN_LENGTH: usize = 26;

#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: String,
    #[serde(skip)]
    pub user_id: i64,
    /// Unix seconds.
    pub expiry: i64,
    #[serde(skip)]
    pub scope: &'static str,
}

impl Token {
    pub fn generate(user_id: i64, ttl: Duration, scope: &'static str, now: i64) -> Self {
        let plaintext: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let hash = digest(&plaintext);
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        Self {
            plaintext,
            hash,
            user_id,
            expiry: now.saturating_add(ttl_secs),
            scope,
        }
    }
}

/// Hex SHA-256 of a plaintext token.
pub fn digest(plaintext: &str) -> String {
    format!("{:x}", Sha256::digest(plaintext.as_bytes()))
}

pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_LENGTH && plaintext.bytes().all(|b| b.is_ascii_alphanumeric())
}
