//! Resource-level authorization
//!
//! Runs after credential resolution: given who is calling and what they
//! are touching, may they? The rule is ownership with an admin override.
//! Insufficient *rank* for an operation is the resolver's business; this
//! check is about reaching into someone else's records.

use uuid::Uuid;

use crate::models::{Principal, Role, Session, User};

/// Something a caller may try to act on. Every protected resource reduces
/// to one of these; api keys are fields of their user, so acting on one is
/// acting on the user.
#[derive(Debug, Clone, Copy)]
pub enum AuthTarget<'a> {
    User(&'a User),
    Session(&'a Session),
}

impl AuthTarget<'_> {
    /// The user who owns this resource. A user record owns itself.
    pub fn owner_uuid(&self) -> Uuid {
        match self {
            AuthTarget::User(user) => user.uuid,
            AuthTarget::Session(session) => session.user_uuid,
        }
    }
}

/// Whether `principal` may act on `target`: admins may act on anything,
/// everyone else only on what they own, anonymous callers on nothing.
///
/// The admin check uses the principal's *effective* role. For token callers
/// that is the rank snapshot frozen into the token at issue time, so
/// demoting an admin only takes full effect as their tokens age out.
pub fn authorized(principal: Option<&Principal>, target: AuthTarget<'_>) -> bool {
    let Some(principal) = principal else {
        return false;
    };
    if principal.role >= Role::ADMIN {
        return true;
    }
    target.owner_uuid() == principal.user.uuid
}
