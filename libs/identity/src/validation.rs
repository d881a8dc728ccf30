//! Input validation utilities
//!
//! Each rule reports a single human-readable message; callers collect every
//! failed rule into one [`crate::error::IdentityError::Validation`] so a
//! caller sees all problems at once.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::Role;

/// Validate a username. Usernames are email addresses.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username can't be blank".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^[^@\s]+@(?:[-a-z0-9]+\.)+[a-z]{2,}$")
            .expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err("Username is not a valid email address".to_string());
    }

    Ok(())
}

/// Validate a password.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password can't be blank".to_string());
    }

    Ok(())
}

/// Validate that a password confirmation matches the password.
pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), String> {
    if password != confirmation {
        return Err("Password confirmation doesn't match password".to_string());
    }

    Ok(())
}

/// Validate a role rank.
pub fn validate_role(role: Role) -> Result<(), String> {
    if role < Role::PUBLIC {
        return Err("Role must be at least the public rank".to_string());
    }

    Ok(())
}
