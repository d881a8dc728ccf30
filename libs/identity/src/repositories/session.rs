//! Session store trait and Postgres implementation

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::models::Session;

/// Storage for session records. Sessions are hard-deleted; expiry is
/// enforced by readers, not by the store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_by_uuid(&self, uuid: Uuid) -> IdentityResult<Option<Session>>;
    async fn find_by_user(&self, user_uuid: Uuid) -> IdentityResult<Vec<Session>>;
    async fn save(&self, session: &Session) -> IdentityResult<()>;
    async fn delete(&self, uuid: Uuid) -> IdentityResult<()>;
    /// Deletes every listed session, returning how many rows went away.
    /// Unknown uuids are skipped silently.
    async fn delete_batch(&self, uuids: &[Uuid]) -> IdentityResult<u64>;
}

/// Postgres-backed session store.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find_by_uuid(&self, uuid: Uuid) -> IdentityResult<Option<Session>> {
        debug!("finding session by uuid: {}", uuid);

        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT uuid, user_uuid, token, secret, created_at, updated_at
            FROM identity_sessions
            WHERE uuid = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_by_user(&self, user_uuid: Uuid) -> IdentityResult<Vec<Session>> {
        debug!("finding sessions for user: {}", user_uuid);

        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT uuid, user_uuid, token, secret, created_at, updated_at
            FROM identity_sessions
            WHERE user_uuid = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_uuid)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn save(&self, session: &Session) -> IdentityResult<()> {
        info!("saving session: {}", session.uuid);

        sqlx::query(
            r#"
            INSERT INTO identity_sessions
                (uuid, user_uuid, token, secret, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (uuid) DO UPDATE SET
                token = EXCLUDED.token,
                secret = EXCLUDED.secret,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(session.uuid)
        .bind(session.user_uuid)
        .bind(&session.token)
        .bind(&session.secret)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, uuid: Uuid) -> IdentityResult<()> {
        info!("deleting session: {}", uuid);

        let result = sqlx::query("DELETE FROM identity_sessions WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::not_found("Session", uuid));
        }

        Ok(())
    }

    async fn delete_batch(&self, uuids: &[Uuid]) -> IdentityResult<u64> {
        if uuids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM identity_sessions WHERE uuid = ANY($1)")
            .bind(uuids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
