//! Role ranks.
//!
//! Roles are plain integer ranks compared with `>=`, so a new rank can be
//! slotted between two existing ones without touching comparison sites.

use serde::{Deserialize, Serialize};

/// An authorization rank. Higher ranks may do everything lower ranks may.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Role(pub i32);

impl Role {
    /// Unauthenticated callers.
    pub const PUBLIC: Role = Role(0);
    /// Ordinary signed-up users.
    pub const USER: Role = Role(10);
    /// Operators who may act on any resource.
    pub const ADMIN: Role = Role(100);
    /// The service owner.
    pub const OWNER: Role = Role(1000);
}

impl Default for Role {
    fn default() -> Self {
        Role::USER
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
