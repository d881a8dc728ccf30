//! Resolved caller identity

use serde::{Deserialize, Serialize};

use crate::models::{Role, Session, User};

/// The outcome of successfully resolving a credential: who is calling and
/// with what effective role.
///
/// `session` is `None` for api-key callers, who authenticate without one.
/// For token callers `role` is the rank snapshot embedded in the verified
/// token, which may lag behind `user.role` if the account was re-ranked
/// after the token was issued.
///
/// Principals serialize cleanly (the user's password digest and the
/// session's secret are skipped by their models), so they can be cached
/// as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user: User,
    pub session: Option<Session>,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role >= Role::ADMIN
    }
}
