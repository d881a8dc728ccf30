//! Out-of-band notifications
//!
//! Delivery is an embedding concern; this crate only defines the seam. A
//! failed notification never fails the operation that triggered it.

use async_trait::async_trait;
use tracing::info;

use crate::models::User;

/// Delivers account notifications to the user out of band.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Tell the user how to verify their account. The user record carries
    /// the freshly issued `verification_token`.
    async fn send_verification(&self, user: &User) -> anyhow::Result<()>;

    /// Tell the user how to reset their password. The user record carries
    /// the freshly issued `reset_token`.
    async fn send_password_reset(&self, user: &User) -> anyhow::Result<()>;
}

/// Log-only sender for development and tests.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send_verification(&self, user: &User) -> anyhow::Result<()> {
        info!(user = %user.uuid, "queueing verification notification");
        Ok(())
    }

    async fn send_password_reset(&self, user: &User) -> anyhow::Result<()> {
        info!(user = %user.uuid, "queueing password reset notification");
        Ok(())
    }
}
