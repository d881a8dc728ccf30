//! Shared infrastructure for the identity platform.
//!
//! This crate provides the plumbing the identity engine (and any sibling
//! service) builds on: PostgreSQL connection pooling, a Redis handle used
//! for short-lived caching, and the infrastructure error types.

pub mod cache;
pub mod database;
pub mod error;
