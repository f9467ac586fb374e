use sqlx::SqliteConnection;

use super::db::{Database, StoreError, BEGIN_WRITE};
use super::models::Permissions;

pub const QUOTES_READ: &str = "quotes:read";
pub const QUOTES_WRITE: &str = "quotes:write";

impl Database {
    pub async fn permissions_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        self.bounded("permissions_for_user", async {
            let codes: Vec<String> = sqlx::query_scalar(
                "SELECT p.code
                 FROM permissions p
                 INNER JOIN users_permissions up ON up.permission_id = p.id
                 WHERE up.user_id = ?",
            )
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
            Ok(Permissions::new(codes))
        })
        .await
    }

    /// Grant each known code in `codes`. Unknown codes and existing grants are skipped.
    pub async fn grant_permissions(&self, user_id: i64, codes: &[&str]) -> Result<(), StoreError> {
        self.bounded("grant_permissions", async {
            let mut tx = self.pool().begin_with(BEGIN_WRITE).await?;
            grant_in(&mut tx, user_id, codes).await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }
}

pub(super) async fn grant_in(
    conn: &mut SqliteConnection,
    user_id: i64,
    codes: &[&str],
) -> Result<(), StoreError> {
    for code in codes {
        sqlx::query(
            "INSERT OR IGNORE INTO users_permissions (user_id, permission_id)
             SELECT ?, id FROM permissions WHERE code = ?",
        )
        .bind(user_id)
        .bind(*code)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
