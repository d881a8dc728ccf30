//! Session model and token minting

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::crypto;
use crate::jwt::{self, TokenError, TokenPayload};
use crate::models::User;

/// Session entity.
///
/// Each session carries its own signing `secret`; a token is only ever
/// verifiable against the secret of the session it names. The secret is
/// skipped on serialization so a session rendered to JSON (or cached) never
/// exposes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub token: String,
    #[serde(skip_serializing, default)]
    pub secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Mints a session for `user` lasting `lifetime` from now: a fresh
    /// uuid, a fresh random secret, and a signed token binding the pair to
    /// the user and their current role.
    pub fn issue(user: &User, lifetime: Duration) -> Result<Self, TokenError> {
        let now = Utc::now();
        let uuid = Uuid::now_v7();
        let secret = crypto::generate_session_secret();
        let payload = TokenPayload {
            user_uuid: user.uuid,
            session_uuid: uuid,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };
        let token = jwt::encode(&payload, &secret)?;
        Ok(Session {
            uuid,
            user_uuid: user.uuid,
            token,
            secret,
            created_at: now,
            updated_at: now,
        })
    }

    /// Expiry embedded in the token, or `None` when the token no longer
    /// decodes at all.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        jwt::decode_unverified(&self.token)
            .ok()
            .map(|payload| payload.expires_at())
    }

    /// Whether the embedded expiry has passed. A token that cannot be
    /// decoded counts as expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(at) => at <= Utc::now(),
            None => true,
        }
    }
}
