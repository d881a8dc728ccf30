//! Error taxonomy for the identity engine.
//!
//! Credential failures and authorization failures are deliberately kept
//! apart: the first means the caller never proved who they are, the second
//! means a proven caller asked for something outside their reach. Callers
//! surface the message of each variant as-is; anything wrapped by
//! [`IdentityError::Database`] or [`IdentityError::Internal`] is logged in
//! detail but surfaced generically.

use thiserror::Error;
use uuid::Uuid;

/// Failures produced by identity operations.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The presented credential is malformed, unverifiable, expired, or
    /// carries a role below what the operation requires.
    #[error("Invalid token")]
    InvalidToken,

    /// The credential is fine but the caller is not allowed to perform the
    /// operation, or a password/one-time proof did not match.
    #[error("Unauthorized request")]
    Unauthorized,

    /// A referenced entity does not exist (or is soft-deleted).
    #[error("{0}")]
    NotFound(String),

    /// One or more field-level rules were violated; every violation is
    /// carried, not just the first.
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// A storage-level failure. Details stay in the logs.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other unexpected failure. Details stay in the logs.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IdentityError {
    /// Builds the canonical not-found error for an entity kind and uuid,
    /// e.g. `User 0190… cannot be found`.
    pub fn not_found(kind: &str, uuid: Uuid) -> Self {
        IdentityError::NotFound(format!("{kind} {uuid} cannot be found"))
    }

    /// Builds a single-rule validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        IdentityError::Validation(vec![message.into()])
    }
}

/// Convenience alias used across the engine.
pub type IdentityResult<T> = Result<T, IdentityError>;
