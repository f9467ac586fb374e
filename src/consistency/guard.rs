//! Optimistic concurrency for versioned quote records.

use crate::data::{unix_timestamp, Database, NewQuote, Quote, StoreError};
use crate::observability::metrics;

/// Compare-and-swap writes against the quote store.
///
/// There is no retry loop here. On [`StoreError::EditConflict`] the caller
/// decides whether to re-read and re-apply or to report the conflict.
#[derive(Clone)]
pub struct ConcurrencyGuard {
    db: Database,
}

impl ConcurrencyGuard {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a new quote. Creation cannot conflict and always yields version 1.
    pub async fn create(&self, new: &NewQuote) -> Result<Quote, StoreError> {
        self.db.insert_quote(new).await
    }

    /// Write `quote` if the stored version still equals `expected_version`.
    ///
    /// On success `quote` carries the new version and modification time and
    /// the new version is returned. A version mismatch on an existing quote
    /// is `EditConflict`; a quote that no longer exists is `NotFound`. On
    /// failure `quote` is left untouched.
    pub async fn apply(&self, quote: &mut Quote, expected_version: i64) -> Result<i64, StoreError> {
        let modified_at = unix_timestamp();
        if let Some(version) = self
            .db
            .update_quote_if_version(quote, expected_version, modified_at)
            .await?
        {
            quote.version = version;
            quote.modified_at = modified_at;
            return Ok(version);
        }

        if self.db.quote_exists(quote.id).await? {
            tracing::info!(
                quote_id = quote.id,
                expected_version,
                "Edit conflict on quote update"
            );
            metrics::record_edit_conflict();
            Err(StoreError::EditConflict)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Source;

    async fn setup() -> (ConcurrencyGuard, Quote) {
        let db = Database::open_in_memory().await.unwrap();
        let user = db.insert_user("Alice", "alice@example.com", "hash").await.unwrap();
        let guard = ConcurrencyGuard::new(db);
        let quote = guard
            .create(&NewQuote {
                user_id: user.id,
                content: "original".into(),
                author: "Anon".into(),
                source: Source::default(),
                tags: vec!["x".into()],
            })
            .await
            .unwrap();
        (guard, quote)
    }

    #[tokio::test]
    async fn test_create_starts_at_version_one() {
        let (_, quote) = setup().await;
        assert_eq!(quote.version, 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let (guard, mut quote) = setup().await;
        quote.content = "edited".into();

        assert_eq!(guard.apply(&mut quote, 1).await.unwrap(), 2);
        assert_eq!(quote.version, 2);
        assert!(matches!(guard.apply(&mut quote, 1).await, Err(StoreError::EditConflict)));
        assert_eq!(quote.version, 2);
        assert_eq!(guard.apply(&mut quote, 2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_quote_is_not_found() {
        let (guard, mut quote) = setup().await;
        quote.id += 1;
        assert!(matches!(guard.apply(&mut quote, 1).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_concurrent_applies_have_one_winner() {
        let (guard, quote) = setup().await;

        let mut tasks = Vec::new();
        for i in 0..4 {
            let guard = guard.clone();
            let mut quote = quote.clone();
            quote.content = format!("writer {i}");
            tasks.push(tokio::spawn(async move { guard.apply(&mut quote, 1).await }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(version) => {
                    assert_eq!(version, 2);
                    wins += 1;
                }
                Err(StoreError::EditConflict) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 3);
    }
}
