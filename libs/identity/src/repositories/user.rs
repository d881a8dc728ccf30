//! User store trait and Postgres implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::models::User;

/// Storage for user records. Lookups see only live (non-soft-deleted)
/// users; `save` upserts by uuid and enforces username uniqueness among
/// live users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_uuid(&self, uuid: Uuid) -> IdentityResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> IdentityResult<Option<User>>;
    async fn find_by_api_key(&self, api_key: &str) -> IdentityResult<Option<User>>;
    async fn list(&self) -> IdentityResult<Vec<User>>;
    async fn save(&self, user: &User) -> IdentityResult<()>;
    async fn soft_delete(&self, uuid: Uuid) -> IdentityResult<()>;
}

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_uuid(&self, uuid: Uuid) -> IdentityResult<Option<User>> {
        debug!("finding user by uuid: {}", uuid);

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT uuid, username, password_digest, role, api_key,
                   verification_token, reset_token, verified,
                   deleted_at, created_at, updated_at
            FROM identity_users
            WHERE uuid = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> IdentityResult<Option<User>> {
        debug!("finding user by username: {}", username);

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT uuid, username, password_digest, role, api_key,
                   verification_token, reset_token, verified,
                   deleted_at, created_at, updated_at
            FROM identity_users
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_api_key(&self, api_key: &str) -> IdentityResult<Option<User>> {
        debug!("finding user by api key");

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT uuid, username, password_digest, role, api_key,
                   verification_token, reset_token, verified,
                   deleted_at, created_at, updated_at
            FROM identity_users
            WHERE api_key = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list(&self) -> IdentityResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT uuid, username, password_digest, role, api_key,
                   verification_token, reset_token, verified,
                   deleted_at, created_at, updated_at
            FROM identity_users
            WHERE deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn save(&self, user: &User) -> IdentityResult<()> {
        info!("saving user: {}", user.uuid);

        // Deterministic uniqueness check; the partial unique index backs
        // this up against concurrent writers.
        let taken = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT uuid FROM identity_users
            WHERE username = $1 AND deleted_at IS NULL AND uuid <> $2
            "#,
        )
        .bind(&user.username)
        .bind(user.uuid)
        .fetch_optional(&self.pool)
        .await?;

        if taken.is_some() {
            return Err(IdentityError::validation("Username has already been taken"));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO identity_users
                (uuid, username, password_digest, role, api_key,
                 verification_token, reset_token, verified,
                 deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (uuid) DO UPDATE SET
                username = EXCLUDED.username,
                password_digest = EXCLUDED.password_digest,
                role = EXCLUDED.role,
                api_key = EXCLUDED.api_key,
                verification_token = EXCLUDED.verification_token,
                reset_token = EXCLUDED.reset_token,
                verified = EXCLUDED.verified,
                deleted_at = EXCLUDED.deleted_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.uuid)
        .bind(&user.username)
        .bind(&user.password_digest)
        .bind(user.role)
        .bind(&user.api_key)
        .bind(&user.verification_token)
        .bind(&user.reset_token)
        .bind(user.verified)
        .bind(user.deleted_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db))
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                Err(IdentityError::validation("Username has already been taken"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn soft_delete(&self, uuid: Uuid) -> IdentityResult<()> {
        info!("soft-deleting user: {}", uuid);

        let result = sqlx::query(
            r#"
            UPDATE identity_users SET deleted_at = $1, updated_at = $1
            WHERE uuid = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::not_found("User", uuid));
        }

        Ok(())
    }
}
