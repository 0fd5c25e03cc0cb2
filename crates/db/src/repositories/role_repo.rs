//! Repository for the `roles` table and role membership lookups.

use beacon_core::types::DbId;
use sqlx::PgPool;

use crate::models::role::Role;
use crate::retry::{retry_on_conflict, DEFAULT_MAX_ATTEMPTS};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides role membership lookups and creation.
pub struct RoleRepo;

impl RoleRepo {
    /// IDs of active users holding the role, ascending.
    pub async fn member_user_ids(pool: &PgPool, role_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM users WHERE role_id = $1 AND is_active = true ORDER BY id ASC",
        )
        .bind(role_id)
        .fetch_all(pool)
        .await
    }

    /// Create a role unless one with the same name exists.
    ///
    /// The existence check and insert share a SERIALIZABLE transaction which
    /// is replayed on serialization conflicts. Returns `None` when the name is
    /// already taken.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Role>, sqlx::Error> {
        retry_on_conflict(DEFAULT_MAX_ATTEMPTS, move || async move {
            let mut tx = pool.begin().await?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                .execute(&mut *tx)
                .await?;

            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM roles WHERE name = $1)")
                    .bind(name)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists {
                tx.rollback().await?;
                return Ok(None);
            }

            let query = format!(
                "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING {COLUMNS}"
            );
            let role = sqlx::query_as::<_, Role>(&query)
                .bind(name)
                .bind(description)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(Some(role))
        })
        .await
    }
}
