//! Identity engine: signed session tokens, two-tier verification, and
//! role-ranked authorization.
//!
//! Each session carries its own signing secret, so verifying a token means
//! an unverified decode to learn which session it names, then a lookup for
//! that session's secret and a real signature check. A verified-token cache
//! keyed by the raw token string sits in front, so the expensive path runs
//! once per token per TTL. On top of that sit role ranks compared with `>=`
//! and an ownership-or-admin authorization rule.
//!
//! The crate is storage-agnostic at the seams: users, sessions, the cache,
//! notifications, and expired-session reaping are traits, with Postgres,
//! Redis, and in-memory implementations provided.

pub mod authorize;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod jobs;
pub mod jwt;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod repositories;
pub mod resolver;
pub mod telemetry;
pub mod validation;

// Re-export for convenience
pub use authorize::{AuthTarget, authorized};
pub use cache::{MemorySessionCache, RedisSessionCache, SessionCache};
pub use config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use jobs::{SessionReaper, TokioSessionReaper};
pub use lifecycle::{LifecycleManager, OneTimeTokenKind, PasswordProof};
pub use models::{NewUser, Principal, Role, Session, UpdateUser, User};
pub use notify::{LogNotifier, NotificationSender};
pub use repositories::{
    MemorySessionStore, MemoryUserStore, PgSessionStore, PgUserStore, SessionStore, UserStore,
};
pub use resolver::{AuthResolver, Credential};
