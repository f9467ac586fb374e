//! Resolves bearer credentials to identities.

use std::time::Duration;

use serde::Serialize;

use super::token::{self, Token, SCOPE_AUTHENTICATION};
use crate::data::{unix_timestamp, Database, Permissions};
use crate::error::ApiError;
use crate::observability::metrics;

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub permissions: Permissions,
}

/// Who is making a request.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(AuthenticatedUser),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.user().is_some_and(|u| u.permissions.include(code))
    }
}

/// Issues, resolves and revokes authentication tokens.
///
/// The token table is the only source of truth; nothing is cached between
/// requests, so a revoked or expired token stops working immediately.
#[derive(Clone)]
pub struct AuthGate {
    db: Database,
    token_ttl: Duration,
}

impl AuthGate {
    pub fn new(db: Database, token_ttl: Duration) -> Self {
        Self { db, token_ttl }
    }

    /// Map a credential to an identity.
    ///
    /// An empty credential is anonymous. A malformed, unknown or expired one
    /// is `InvalidToken`. A store failure is `Unavailable`.
    pub async fn resolve(&self, credential: &str) -> Result<Identity, ApiError> {
        if credential.is_empty() {
            return Ok(Identity::Anonymous);
        }
        if !token::is_well_formed(credential) {
            metrics::record_auth_failure("malformed");
            return Err(ApiError::InvalidToken);
        }

        let hash = token::digest(credential);
        let Some(user) = self
            .db
            .user_for_token(&hash, SCOPE_AUTHENTICATION, unix_timestamp())
            .await?
        else {
            metrics::record_auth_failure("unknown_or_expired");
            return Err(ApiError::InvalidToken);
        };

        let permissions = self.db.permissions_for_user(user.id).await?;
        Ok(Identity::User(AuthenticatedUser {
            id: user.id,
            name: user.name,
            email: user.email,
            permissions,
        }))
    }

    /// Create and store a fresh authentication token for `user_id`.
    pub async fn issue(&self, user_id: i64) -> Result<Token, ApiError> {
        let token = Token::generate(user_id, self.token_ttl, SCOPE_AUTHENTICATION, unix_timestamp());
        self.db
            .insert_token(&token.hash, token.user_id, token.expiry, token.scope)
            .await?;
        tracing::debug!(user_id, expiry = token.expiry, "Issued authentication token");
        Ok(token)
    }

    /// Revoke every authentication token `user_id` holds.
    pub async fn revoke_all(&self, user_id: i64) -> Result<u64, ApiError> {
        let removed = self
            .db
            .delete_tokens_for_user(user_id, SCOPE_AUTHENTICATION)
            .await?;
        tracing::info!(user_id, removed, "Revoked authentication tokens");
        Ok(removed)
    }
}
