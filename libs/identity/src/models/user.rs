//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Role;

/// User entity.
///
/// `password_digest` never leaves the process: it is skipped on
/// serialization and defaulted to empty on deserialization, so a user
/// rendered to JSON (or round-tripped through the session cache) carries no
/// secret material. `api_key` and the one-time tokens are intentionally
/// visible; they are how a user reads back their own credentials.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub uuid: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_digest: String,
    pub role: Role,
    pub api_key: String,
    pub verification_token: Option<String>,
    pub reset_token: Option<String>,
    pub verified: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user creation payload.
///
/// `role` is honored only when the creating caller is an admin; everyone
/// else gets [`Role::USER`] regardless of what they ask for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
    pub role: Option<Role>,
}

/// User update payload. Password changes go through
/// [`crate::lifecycle::LifecycleManager::change_password`] instead, which
/// demands proof of the old password or a reset token.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            uuid: Uuid::now_v7(),
            username: "someone@example.com".to_string(),
            password_digest: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            role: Role::USER,
            api_key: "0123456789abcdef".to_string(),
            verification_token: None,
            reset_token: None,
            verified: true,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_digest_never_serializes() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_digest"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("api_key"));
    }

    #[test]
    fn test_deserializes_without_password_digest() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back.password_digest, "");
        assert_eq!(back.username, "someone@example.com");
    }
}
