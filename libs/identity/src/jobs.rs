//! Background session reaping
//!
//! Listing a user's sessions filters out expired ones; their deletion is
//! handed to a reaper so the listing request never pays for the writes.
//! One batch is queued per listing, however many sessions expired.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::repositories::SessionStore;

/// Accepts batches of expired session uuids for deletion off the request
/// path. Scheduling must be cheap and non-blocking.
pub trait SessionReaper: Send + Sync {
    fn schedule_deletion(&self, session_uuids: Vec<Uuid>);
}

/// Reaper backed by a spawned worker task draining a queue. Dropping the
/// last handle closes the queue and lets the worker wind down after the
/// batches already in flight.
#[derive(Clone)]
pub struct TokioSessionReaper {
    tx: mpsc::UnboundedSender<Vec<Uuid>>,
}

impl TokioSessionReaper {
    pub fn spawn(store: Arc<dyn SessionStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Uuid>>();

        tokio::spawn(async move {
            info!("session reaper started");
            while let Some(batch) = rx.recv().await {
                match store.delete_batch(&batch).await {
                    Ok(deleted) => {
                        info!(scheduled = batch.len(), deleted, "swept expired sessions");
                    }
                    Err(e) => {
                        // The sessions stay behind and get picked up by a
                        // later listing.
                        error!("failed to sweep expired sessions: {}", e);
                    }
                }
            }
            info!("session reaper stopped");
        });

        Self { tx }
    }
}

impl SessionReaper for TokioSessionReaper {
    fn schedule_deletion(&self, session_uuids: Vec<Uuid>) {
        if session_uuids.is_empty() {
            return;
        }
        if self.tx.send(session_uuids).is_err() {
            warn!("session reaper worker is gone; batch dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Session, User};
    use crate::repositories::MemorySessionStore;
    use chrono::{Duration, Utc};
    use std::time::Duration as StdDuration;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            uuid: Uuid::now_v7(),
            username: "reaped@example.com".to_string(),
            password_digest: String::new(),
            role: Role::USER,
            api_key: "key".to_string(),
            verification_token: None,
            reset_token: None,
            verified: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn wait_until<F: Fn() -> bool>(check: F) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_scheduled_batch_is_deleted() {
        let store = MemorySessionStore::new();
        let user = sample_user();
        let expired_a = Session::issue(&user, Duration::seconds(-60)).unwrap();
        let expired_b = Session::issue(&user, Duration::seconds(-60)).unwrap();
        let live = Session::issue(&user, Duration::hours(1)).unwrap();
        for s in [&expired_a, &expired_b, &live] {
            store.save(s).await.unwrap();
        }

        let reaper = TokioSessionReaper::spawn(Arc::new(store.clone()));
        reaper.schedule_deletion(vec![expired_a.uuid, expired_b.uuid]);

        wait_until(|| store.len() == 1).await;
        assert!(store.find_by_uuid(live.uuid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_batches_are_not_queued() {
        let store = MemorySessionStore::new();
        let reaper = TokioSessionReaper::spawn(Arc::new(store));
        // Nothing to assert beyond "does not panic or deadlock".
        reaper.schedule_deletion(vec![]);
    }
}
