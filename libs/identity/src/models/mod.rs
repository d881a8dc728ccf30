//! Identity engine models

pub mod principal;
pub mod role;
pub mod session;
pub mod user;

// Re-export for convenience
pub use principal::Principal;
pub use role::Role;
pub use session::Session;
pub use user::{NewUser, UpdateUser, User};
