use sqlx::SqliteConnection;

use super::db::{is_unique_violation, unix_timestamp, Database, StoreError, BEGIN_WRITE};
use super::models::User;
use super::permissions::grant_in;

impl Database {
    /// Insert a new user. A taken email is reported as `Duplicate("email")`.
    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        self.bounded("insert_user", async {
            let mut conn = self.pool().acquire().await?;
            create_user(&mut conn, name, email, password_hash).await
        })
        .await
    }

    /// Insert a new user holding `codes`. Either both land or neither does.
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        codes: &[&str],
    ) -> Result<User, StoreError> {
        self.bounded("register_user", async {
            let mut tx = self.pool().begin_with(BEGIN_WRITE).await?;
            let user = create_user(&mut tx, name, email, password_hash).await?;
            grant_in(&mut tx, user.id, codes).await?;
            tx.commit().await?;
            Ok(user)
        })
        .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.bounded("get_user_by_email", async {
            sqlx::query_as::<_, User>(
                "SELECT id, created_at, name, email, password_hash, version
                 FROM users WHERE email = ?",
            )
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .ok_or(StoreError::NotFound)
        })
        .await
    }

    pub async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        self.bounded("get_user", async {
            sqlx::query_as::<_, User>(
                "SELECT id, created_at, name, email, password_hash, version
                 FROM users WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(StoreError::NotFound)
        })
        .await
    }
}

async fn create_user(
    conn: &mut SqliteConnection,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, StoreError> {
    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (created_at, name, email, password_hash)
         VALUES (?, ?, ?, ?)
         RETURNING id, created_at, name, email, password_hash, version",
    )
    .bind(unix_timestamp())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut *conn)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate("email")),
        Err(e) => Err(e.into()),
    }
}
