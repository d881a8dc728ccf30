//! Storage for users and sessions
//!
//! Each store is a trait with a Postgres implementation for production and
//! an in-memory implementation for tests and development. The Postgres
//! stores expect this shape (schema migrations live with the embedding
//! service):
//!
//! ```sql
//! CREATE TABLE identity_users (
//!     uuid UUID PRIMARY KEY,
//!     username TEXT NOT NULL,
//!     password_digest TEXT NOT NULL,
//!     role INTEGER NOT NULL,
//!     api_key TEXT NOT NULL,
//!     verification_token TEXT,
//!     reset_token TEXT,
//!     verified BOOLEAN NOT NULL,
//!     deleted_at TIMESTAMPTZ,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX identity_users_live_username
//!     ON identity_users (username) WHERE deleted_at IS NULL;
//! CREATE INDEX identity_users_api_key ON identity_users (api_key);
//!
//! CREATE TABLE identity_sessions (
//!     uuid UUID PRIMARY KEY,
//!     user_uuid UUID NOT NULL REFERENCES identity_users (uuid),
//!     token TEXT NOT NULL,
//!     secret TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX identity_sessions_user_uuid ON identity_sessions (user_uuid);
//! ```

pub mod memory;
pub mod session;
pub mod user;

// Re-export for convenience
pub use memory::{MemorySessionStore, MemoryUserStore};
pub use session::{PgSessionStore, SessionStore};
pub use user::{PgUserStore, UserStore};
