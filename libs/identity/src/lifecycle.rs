//! Account and session lifecycle
//!
//! Everything that creates or mutates identity state lives here: signup,
//! login and logout, one-time verification and reset tokens, password and
//! profile changes, and deletion. Reads that have side effects (expired
//! sessions are deleted when touched) live here too. Credential checking
//! is [`crate::resolver`]'s job; callers resolve first, then invoke these
//! operations with whatever context the operation needs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::SessionCache;
use crate::config::IdentityConfig;
use crate::crypto;
use crate::error::{IdentityError, IdentityResult};
use crate::jobs::SessionReaper;
use crate::jwt;
use crate::models::{NewUser, Principal, Role, Session, UpdateUser, User};
use crate::notify::NotificationSender;
use crate::repositories::{SessionStore, UserStore};
use crate::validation;

/// Which one-time credential to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneTimeTokenKind {
    Verification,
    Reset,
}

/// Proof a caller must supply to change a password.
#[derive(Debug, Clone, Copy)]
pub enum PasswordProof<'a> {
    /// The current password.
    OldPassword(&'a str),
    /// The bearer token previously recorded as the user's reset token.
    ResetToken(&'a str),
}

/// Coordinates stores, cache, notifications, and the session reaper.
#[derive(Clone)]
pub struct LifecycleManager {
    config: IdentityConfig,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn SessionCache>,
    notifier: Arc<dyn NotificationSender>,
    reaper: Arc<dyn SessionReaper>,
}

impl LifecycleManager {
    pub fn new(
        config: IdentityConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<dyn SessionCache>,
        notifier: Arc<dyn NotificationSender>,
        reaper: Arc<dyn SessionReaper>,
    ) -> Self {
        Self {
            config,
            users,
            sessions,
            cache,
            notifier,
            reaper,
        }
    }

    /// Creates a user account.
    ///
    /// All field violations are collected into one `Validation` error. A
    /// requested role is honored only when `actor` is an admin; everyone
    /// else gets [`Role::USER`]. The account starts unverified, with a
    /// fresh api key and a one-time verification token already issued and
    /// handed to the notifier.
    pub async fn create_user(
        &self,
        new_user: NewUser,
        actor: Option<&Principal>,
    ) -> IdentityResult<User> {
        let role = match new_user.role {
            Some(requested) if actor.map(|p| p.is_admin()).unwrap_or(false) => requested,
            _ => Role::USER,
        };

        let mut violations = Vec::new();
        if let Err(v) = validation::validate_username(&new_user.username) {
            violations.push(v);
        }
        if let Err(v) = validation::validate_password(&new_user.password) {
            violations.push(v);
        }
        if let Err(v) = validation::validate_password_confirmation(
            &new_user.password,
            &new_user.password_confirmation,
        ) {
            violations.push(v);
        }
        if let Err(v) = validation::validate_role(role) {
            violations.push(v);
        }
        if !violations.is_empty() {
            return Err(IdentityError::Validation(violations));
        }

        let now = Utc::now();
        let mut user = User {
            uuid: Uuid::now_v7(),
            username: new_user.username,
            password_digest: crypto::hash_password(&new_user.password)?,
            role,
            api_key: crypto::generate_api_key(),
            verification_token: None,
            reset_token: None,
            verified: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.save(&user).await?;
        info!("created user {}", user.uuid);

        self.issue_onetime(&mut user, OneTimeTokenKind::Verification)
            .await?;
        if let Err(e) = self.notifier.send_verification(&user).await {
            error!("failed to queue verification notification: {}", e);
        }

        Ok(user)
    }

    /// Authenticates a username/password pair and mints a login session.
    ///
    /// Unknown username, wrong password, and an unverified account all
    /// answer the same way, so a caller cannot tell which usernames
    /// exist.
    pub async fn login(&self, username: &str, password: &str) -> IdentityResult<Session> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Err(IdentityError::Unauthorized);
        };
        if !crypto::verify_password(password, &user.password_digest)? {
            return Err(IdentityError::Unauthorized);
        }
        if !user.verified {
            return Err(IdentityError::Unauthorized);
        }

        let session = Session::issue(&user, self.config.session_lifetime())
            .map_err(|e| IdentityError::Internal(e.into()))?;
        self.sessions.save(&session).await?;
        info!("created session {} for user {}", session.uuid, user.uuid);

        Ok(session)
    }

    /// Fetches a session. An expired session is deleted on the spot and
    /// reported as not found.
    pub async fn get_session(&self, session_uuid: Uuid) -> IdentityResult<Session> {
        let session = self
            .sessions
            .find_by_uuid(session_uuid)
            .await?
            .ok_or_else(|| IdentityError::not_found("Session", session_uuid))?;

        if session.is_expired() {
            info!("session {} expired; deleting it on read", session.uuid);
            self.evict_token(&session.token).await;
            self.sessions.delete(session.uuid).await?;
            return Err(IdentityError::not_found("Session", session_uuid));
        }

        Ok(session)
    }

    /// Deletes a session (logout) and evicts its token from the cache.
    pub async fn delete_session(&self, session_uuid: Uuid) -> IdentityResult<()> {
        let session = self.get_session(session_uuid).await?;

        self.evict_token(&session.token).await;
        self.sessions.delete(session.uuid).await?;
        info!(
            "deleted session {} for user {}",
            session.uuid, session.user_uuid
        );
        Ok(())
    }

    /// Lists a user's live sessions. Expired ones are not returned; their
    /// deletion is queued as one batch on the reaper.
    pub async fn list_sessions(&self, user_uuid: Uuid) -> IdentityResult<Vec<Session>> {
        let sessions = self.sessions.find_by_user(user_uuid).await?;
        let (live, expired): (Vec<Session>, Vec<Session>) =
            sessions.into_iter().partition(|s| !s.is_expired());

        if !expired.is_empty() {
            info!(
                count = expired.len(),
                "scheduling expired sessions of user {} for deletion", user_uuid
            );
            self.reaper
                .schedule_deletion(expired.iter().map(|s| s.uuid).collect());
        }

        Ok(live)
    }

    pub async fn get_user(&self, user_uuid: Uuid) -> IdentityResult<User> {
        self.users
            .find_by_uuid(user_uuid)
            .await?
            .ok_or_else(|| IdentityError::not_found("User", user_uuid))
    }

    pub async fn list_users(&self) -> IdentityResult<Vec<User>> {
        self.users.list().await
    }

    /// Issues a one-time token for the named user and records it on their
    /// record, replacing any previous one of the same kind. The matching
    /// notification is queued; its failure does not fail the operation.
    pub async fn issue_token(
        &self,
        username: &str,
        kind: OneTimeTokenKind,
    ) -> IdentityResult<User> {
        let mut user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| IdentityError::NotFound(format!("User {username} cannot be found")))?;

        self.issue_onetime(&mut user, kind).await?;

        let delivery = match kind {
            OneTimeTokenKind::Verification => self.notifier.send_verification(&user).await,
            OneTimeTokenKind::Reset => self.notifier.send_password_reset(&user).await,
        };
        if let Err(e) = delivery {
            error!("failed to queue {:?} notification: {}", kind, e);
        }

        Ok(user)
    }

    /// Applies profile changes. A role change is honored only when `actor`
    /// is an admin and is dropped silently otherwise.
    pub async fn update_user(
        &self,
        user_uuid: Uuid,
        changes: UpdateUser,
        actor: Option<&Principal>,
    ) -> IdentityResult<User> {
        let mut user = self.get_user(user_uuid).await?;
        let admin_actor = actor.map(|p| p.is_admin()).unwrap_or(false);

        let mut violations = Vec::new();
        if let Some(ref username) = changes.username {
            if let Err(v) = validation::validate_username(username) {
                violations.push(v);
            }
        }
        if let Some(role) = changes.role {
            if admin_actor {
                if let Err(v) = validation::validate_role(role) {
                    violations.push(v);
                }
            }
        }
        if !violations.is_empty() {
            return Err(IdentityError::Validation(violations));
        }

        if let Some(username) = changes.username {
            user.username = username;
        }
        if admin_actor {
            if let Some(role) = changes.role {
                user.role = role;
            }
        }
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        info!("updated user {}", user.uuid);

        Ok(user)
    }

    /// Changes a password given acceptable proof: the current password, or
    /// an unexpired token matching the user's recorded reset token.
    ///
    /// The reset token is not revoked here; it ages out with its one-hour
    /// session.
    pub async fn change_password(
        &self,
        user_uuid: Uuid,
        proof: PasswordProof<'_>,
        password: &str,
        confirmation: &str,
    ) -> IdentityResult<User> {
        let mut user = self.get_user(user_uuid).await?;

        match proof {
            PasswordProof::OldPassword(old) => {
                if !crypto::verify_password(old, &user.password_digest)? {
                    return Err(IdentityError::Unauthorized);
                }
            }
            PasswordProof::ResetToken(token) => {
                let matches_record = user.reset_token.as_deref() == Some(token);
                let unexpired = jwt::decode_unverified(token)
                    .map(|p| !p.is_expired())
                    .unwrap_or(false);
                if !matches_record || !unexpired {
                    return Err(IdentityError::Unauthorized);
                }
            }
        }

        let mut violations = Vec::new();
        if let Err(v) = validation::validate_password(password) {
            violations.push(v);
        }
        if let Err(v) = validation::validate_password_confirmation(password, confirmation) {
            violations.push(v);
        }
        if !violations.is_empty() {
            return Err(IdentityError::Validation(violations));
        }

        user.password_digest = crypto::hash_password(password)?;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        info!("changed password for user {}", user.uuid);

        Ok(user)
    }

    /// Marks an account verified. Callers gate this on the user having
    /// presented their verification token as a live bearer credential.
    pub async fn mark_verified(&self, user_uuid: Uuid) -> IdentityResult<User> {
        let mut user = self.get_user(user_uuid).await?;
        user.verified = true;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        info!("marked user {} as verified", user.uuid);

        Ok(user)
    }

    /// Soft-deletes a user and evicts their cached tokens, so resolution
    /// stops immediately instead of when cache entries age out. Session
    /// rows stay behind; they can never resolve again and age out through
    /// the reaper.
    pub async fn delete_user(&self, user_uuid: Uuid) -> IdentityResult<()> {
        let user = self.get_user(user_uuid).await?;

        for session in self.sessions.find_by_user(user.uuid).await? {
            self.evict_token(&session.token).await;
        }
        self.users.soft_delete(user.uuid).await?;
        info!("soft-deleted user {}", user.uuid);

        Ok(())
    }

    async fn issue_onetime(
        &self,
        user: &mut User,
        kind: OneTimeTokenKind,
    ) -> IdentityResult<()> {
        let session = Session::issue(user, self.config.onetime_lifetime())
            .map_err(|e| IdentityError::Internal(e.into()))?;
        self.sessions.save(&session).await?;

        match kind {
            OneTimeTokenKind::Verification => user.verification_token = Some(session.token),
            OneTimeTokenKind::Reset => user.reset_token = Some(session.token),
        }
        user.updated_at = Utc::now();
        self.users.save(user).await?;
        info!("issued {:?} token for user {}", kind, user.uuid);

        Ok(())
    }

    async fn evict_token(&self, token: &str) {
        if let Err(e) = self.cache.delete(token).await {
            warn!("failed to evict cached session token: {}", e);
        }
    }
}
