use super::db::{Database, StoreError, BEGIN_WRITE};
use super::models::{Reaction, ReactionCounts};

impl Database {
    /// Apply `reaction` from `user_id` to `quote_id` and return the user's
    /// reaction afterwards.
    ///
    /// No prior reaction stores it; the same reaction again removes it; the
    /// opposite one replaces it. Read and write share one transaction.
    pub async fn toggle_reaction(
        &self,
        user_id: i64,
        quote_id: i64,
        reaction: Reaction,
    ) -> Result<Option<Reaction>, StoreError> {
        self.bounded("toggle_reaction", async {
            let mut tx = self.pool().begin_with(BEGIN_WRITE).await?;

            let exists: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM quotes WHERE id = ?)")
                .bind(quote_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                return Err(StoreError::NotFound);
            }

            let current: Option<i64> =
                sqlx::query_scalar("SELECT val FROM reactions WHERE user_id = ? AND quote_id = ?")
                    .bind(user_id)
                    .bind(quote_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let outcome = match current.map(Reaction::try_from).transpose()? {
                Some(existing) if existing == reaction => {
                    sqlx::query("DELETE FROM reactions WHERE user_id = ? AND quote_id = ?")
                        .bind(user_id)
                        .bind(quote_id)
                        .execute(&mut *tx)
                        .await?;
                    None
                }
                Some(_) => {
                    sqlx::query("UPDATE reactions SET val = ? WHERE user_id = ? AND quote_id = ?")
                        .bind(reaction.code())
                        .bind(user_id)
                        .bind(quote_id)
                        .execute(&mut *tx)
                        .await?;
                    Some(reaction)
                }
                None => {
                    sqlx::query("INSERT INTO reactions (user_id, quote_id, val) VALUES (?, ?, ?)")
                        .bind(user_id)
                        .bind(quote_id)
                        .bind(reaction.code())
                        .execute(&mut *tx)
                        .await?;
                    Some(reaction)
                }
            };

            tx.commit().await?;
            Ok(outcome)
        })
        .await
    }

    pub async fn reaction_counts(&self, quote_id: i64) -> Result<ReactionCounts, StoreError> {
        self.bounded("reaction_counts", async {
            let (likes, dislikes): (i64, i64) = sqlx::query_as(
                "SELECT COALESCE(SUM(val = 1), 0), COALESCE(SUM(val = 0), 0)
                 FROM reactions WHERE quote_id = ?",
            )
            .bind(quote_id)
            .fetch_one(self.pool())
            .await?;
            Ok(ReactionCounts { likes, dislikes })
        })
        .await
    }

    pub async fn reaction_of(&self, user_id: i64, quote_id: i64) -> Result<Option<Reaction>, StoreError> {
        self.bounded("reaction_of", async {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT val FROM reactions WHERE user_id = ? AND quote_id = ?")
                    .bind(user_id)
                    .bind(quote_id)
                    .fetch_optional(self.pool())
                    .await?;
            current.map(Reaction::try_from).transpose()
        })
        .await
    }
}
