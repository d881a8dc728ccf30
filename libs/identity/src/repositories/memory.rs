//! In-memory stores
//!
//! Suitable for tests, development, and single-instance embedding. State is
//! lost when the process exits. Semantics match the Postgres stores:
//! lookups skip soft-deleted users, `save` upserts by uuid, and username
//! uniqueness is enforced among live users.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::models::{Session, User};

use super::session::SessionStore;
use super::user::UserStore;

fn poisoned(which: &str) -> IdentityError {
    IdentityError::Internal(anyhow::anyhow!("{which} store lock poisoned"))
}

/// In-memory user store.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<Vec<User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live user count.
    pub fn len(&self) -> usize {
        self.users
            .read()
            .map(|guard| guard.iter().filter(|u| u.deleted_at.is_none()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_uuid(&self, uuid: Uuid) -> IdentityResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned("user"))?;
        Ok(users
            .iter()
            .find(|u| u.uuid == uuid && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> IdentityResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned("user"))?;
        Ok(users
            .iter()
            .find(|u| u.username == username && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_api_key(&self, api_key: &str) -> IdentityResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned("user"))?;
        Ok(users
            .iter()
            .find(|u| u.api_key == api_key && u.deleted_at.is_none())
            .cloned())
    }

    async fn list(&self) -> IdentityResult<Vec<User>> {
        let users = self.users.read().map_err(|_| poisoned("user"))?;
        let mut live: Vec<User> = users
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect();
        live.sort_by_key(|u| u.created_at);
        Ok(live)
    }

    async fn save(&self, user: &User) -> IdentityResult<()> {
        let mut users = self.users.write().map_err(|_| poisoned("user"))?;

        let taken = users
            .iter()
            .any(|u| u.username == user.username && u.deleted_at.is_none() && u.uuid != user.uuid);
        if taken {
            return Err(IdentityError::validation("Username has already been taken"));
        }

        match users.iter_mut().find(|u| u.uuid == user.uuid) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        Ok(())
    }

    async fn soft_delete(&self, uuid: Uuid) -> IdentityResult<()> {
        let mut users = self.users.write().map_err(|_| poisoned("user"))?;
        match users
            .iter_mut()
            .find(|u| u.uuid == uuid && u.deleted_at.is_none())
        {
            Some(user) => {
                let now = Utc::now();
                user.deleted_at = Some(now);
                user.updated_at = now;
                Ok(())
            }
            None => Err(IdentityError::not_found("User", uuid)),
        }
    }
}

/// In-memory session store.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<Vec<Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_by_uuid(&self, uuid: Uuid) -> IdentityResult<Option<Session>> {
        let sessions = self.sessions.read().map_err(|_| poisoned("session"))?;
        Ok(sessions.iter().find(|s| s.uuid == uuid).cloned())
    }

    async fn find_by_user(&self, user_uuid: Uuid) -> IdentityResult<Vec<Session>> {
        let sessions = self.sessions.read().map_err(|_| poisoned("session"))?;
        let mut owned: Vec<Session> = sessions
            .iter()
            .filter(|s| s.user_uuid == user_uuid)
            .cloned()
            .collect();
        owned.sort_by_key(|s| s.created_at);
        Ok(owned)
    }

    async fn save(&self, session: &Session) -> IdentityResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned("session"))?;
        match sessions.iter_mut().find(|s| s.uuid == session.uuid) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        Ok(())
    }

    async fn delete(&self, uuid: Uuid) -> IdentityResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned("session"))?;
        let before = sessions.len();
        sessions.retain(|s| s.uuid != uuid);
        if sessions.len() == before {
            return Err(IdentityError::not_found("Session", uuid));
        }
        Ok(())
    }

    async fn delete_batch(&self, uuids: &[Uuid]) -> IdentityResult<u64> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned("session"))?;
        let before = sessions.len();
        sessions.retain(|s| !uuids.contains(&s.uuid));
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;

    fn sample_user(username: &str) -> User {
        let now = Utc::now();
        User {
            uuid: Uuid::now_v7(),
            username: username.to_string(),
            password_digest: "digest".to_string(),
            role: Role::USER,
            api_key: Uuid::new_v4().to_string(),
            verification_token: None,
            reset_token: None,
            verified: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_and_find_user() {
        let store = MemoryUserStore::new();
        let user = sample_user("a@example.com");
        store.save(&user).await.unwrap();
        assert_eq!(store.len(), 1);

        let by_uuid = store.find_by_uuid(user.uuid).await.unwrap().unwrap();
        assert_eq!(by_uuid.username, "a@example.com");

        let by_name = store
            .find_by_username("a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.uuid, user.uuid);

        let by_key = store.find_by_api_key(&user.api_key).await.unwrap().unwrap();
        assert_eq!(by_key.uuid, user.uuid);
    }

    #[tokio::test]
    async fn test_username_uniqueness_among_live_users() {
        let store = MemoryUserStore::new();
        let first = sample_user("dup@example.com");
        store.save(&first).await.unwrap();

        let second = sample_user("dup@example.com");
        let err = store.save(&second).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));

        // Re-saving the same user is not a collision with itself.
        store.save(&first).await.unwrap();

        // A soft-deleted user frees the name.
        store.soft_delete(first.uuid).await.unwrap();
        store.save(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_soft_deleted_users_disappear_from_lookups() {
        let store = MemoryUserStore::new();
        let user = sample_user("gone@example.com");
        store.save(&user).await.unwrap();

        store.soft_delete(user.uuid).await.unwrap();
        assert!(store.is_empty());
        assert!(store.find_by_uuid(user.uuid).await.unwrap().is_none());
        assert!(
            store
                .find_by_username("gone@example.com")
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.find_by_api_key(&user.api_key).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());

        // Double delete reports not-found.
        let err = store.soft_delete(user.uuid).await.unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_session_delete_and_batch_delete() {
        let store = MemorySessionStore::new();
        let user = sample_user("s@example.com");
        let a = Session::issue(&user, Duration::hours(1)).unwrap();
        let b = Session::issue(&user, Duration::hours(1)).unwrap();
        let c = Session::issue(&user, Duration::hours(1)).unwrap();
        for s in [&a, &b, &c] {
            store.save(s).await.unwrap();
        }

        store.delete(a.uuid).await.unwrap();
        assert!(store.find_by_uuid(a.uuid).await.unwrap().is_none());
        assert!(matches!(
            store.delete(a.uuid).await.unwrap_err(),
            IdentityError::NotFound(_)
        ));

        // Batch delete skips unknown uuids.
        let removed = store
            .delete_batch(&[b.uuid, c.uuid, Uuid::now_v7()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_user_returns_only_that_users_sessions() {
        let store = MemorySessionStore::new();
        let alice = sample_user("alice@example.com");
        let bob = sample_user("bob@example.com");
        let a1 = Session::issue(&alice, Duration::hours(1)).unwrap();
        let a2 = Session::issue(&alice, Duration::hours(1)).unwrap();
        let b1 = Session::issue(&bob, Duration::hours(1)).unwrap();
        for s in [&a1, &a2, &b1] {
            store.save(s).await.unwrap();
        }

        let owned = store.find_by_user(alice.uuid).await.unwrap();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|s| s.user_uuid == alice.uuid));
    }
}
