use super::db::{Database, StoreError};
use super::models::User;

impl Database {
    pub async fn insert_token(
        &self,
        hash: &str,
        user_id: i64,
        expiry: i64,
        scope: &str,
    ) -> Result<(), StoreError> {
        self.bounded("insert_token", async {
            sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES (?, ?, ?, ?)")
                .bind(hash)
                .bind(user_id)
                .bind(expiry)
                .bind(scope)
                .execute(self.pool())
                .await?;
            Ok(())
        })
        .await
    }

    /// The owner of an unexpired token with digest `hash` and the given scope.
    pub async fn user_for_token(
        &self,
        hash: &str,
        scope: &str,
        now: i64,
    ) -> Result<Option<User>, StoreError> {
        self.bounded("user_for_token", async {
            let user = sqlx::query_as::<_, User>(
                "SELECT u.id, u.created_at, u.name, u.email, u.password_hash, u.version
                 FROM users u
                 INNER JOIN tokens t ON t.user_id = u.id
                 WHERE t.hash = ? AND t.scope = ? AND t.expiry > ?",
            )
            .bind(hash)
            .bind(scope)
            .bind(now)
            .fetch_optional(self.pool())
            .await?;
            Ok(user)
        })
        .await
    }

    /// Delete every token the user holds in `scope`. Returns how many went.
    pub async fn delete_tokens_for_user(&self, user_id: i64, scope: &str) -> Result<u64, StoreError> {
        self.bounded("delete_tokens_for_user", async {
            let result = sqlx::query("DELETE FROM tokens WHERE user_id = ? AND scope = ?")
                .bind(user_id)
                .bind(scope)
                .execute(self.pool())
                .await?;
            Ok(result.rows_affected())
        })
        .await
    }
}
