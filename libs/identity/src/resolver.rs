//! Credential resolution
//!
//! Turns a raw bearer token or api key into a [`Principal`]. Token
//! resolution is two-tier: a cheap unverified decode names the user and
//! session the token claims to belong to, then either the verified-token
//! cache vouches for it or the session's secret is fetched and the
//! signature checked for real. Only fully verified outcomes are written to
//! the cache, and the cache is keyed by the raw token string; a fabricated
//! token can never hit the cache because it has never passed verification.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::SessionCache;
use crate::error::{IdentityError, IdentityResult};
use crate::jwt;
use crate::models::{Principal, Role};
use crate::repositories::{SessionStore, UserStore};

/// A caller-supplied credential.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// Signed session token.
    Token(&'a str),
    /// Long-lived per-user api key.
    ApiKey(&'a str),
}

/// Resolves credentials against the stores and the verified-token cache.
#[derive(Clone)]
pub struct AuthResolver {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn SessionCache>,
}

impl AuthResolver {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            users,
            sessions,
            cache,
        }
    }

    /// Resolves a credential, requiring at least `required_role`.
    ///
    /// Every way a token can be bad (malformed, unknown user or session,
    /// wrong signature, expired, role below `required_role`) collapses
    /// into [`IdentityError::InvalidToken`]; callers learn nothing about
    /// which check failed.
    pub async fn resolve(
        &self,
        credential: Credential<'_>,
        required_role: Role,
    ) -> IdentityResult<Principal> {
        match credential {
            Credential::Token(raw) => self.resolve_token(raw, required_role).await,
            Credential::ApiKey(key) => self.resolve_api_key(key, required_role).await,
        }
    }

    /// Like [`resolve`](Self::resolve), but for operations that merely
    /// *welcome* a caller identity without requiring one: no credential or
    /// a rejected credential yields `None` instead of an error.
    /// Infrastructure failures still propagate.
    pub async fn accept(
        &self,
        credential: Option<Credential<'_>>,
        required_role: Role,
    ) -> IdentityResult<Option<Principal>> {
        let Some(credential) = credential else {
            return Ok(None);
        };
        match self.resolve(credential, required_role).await {
            Ok(principal) => Ok(Some(principal)),
            Err(IdentityError::InvalidToken) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn resolve_token(
        &self,
        raw: &str,
        required_role: Role,
    ) -> IdentityResult<Principal> {
        let payload = jwt::decode_unverified(raw).map_err(|e| {
            debug!("token failed structural decode: {}", e);
            IdentityError::InvalidToken
        })?;

        // Expiry is checked before the cache, so a warm entry can never
        // outserve the token's embedded lifetime.
        if payload.is_expired() {
            debug!(exp = payload.exp, "token already expired");
            return Err(IdentityError::InvalidToken);
        }

        // A hit means this exact token string passed full verification
        // earlier; only the role gate needs re-checking.
        match self.cache.get(raw).await {
            Ok(Some(principal)) => {
                if principal.role < required_role {
                    return Err(IdentityError::InvalidToken);
                }
                debug!(user = %principal.user.uuid, "verified-token cache hit");
                return Ok(principal);
            }
            Ok(None) => {}
            Err(e) => warn!("session cache read failed: {}", e),
        }

        let user = self
            .users
            .find_by_uuid(payload.user_uuid)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        if user.role < required_role {
            return Err(IdentityError::InvalidToken);
        }

        let session = self
            .sessions
            .find_by_uuid(payload.session_uuid)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        if session.user_uuid != user.uuid {
            return Err(IdentityError::InvalidToken);
        }

        let claims = jwt::decode_verified(raw, &session.secret).map_err(|e| {
            debug!("token failed verification: {}", e);
            IdentityError::InvalidToken
        })?;

        let principal = Principal {
            role: claims.role,
            session: Some(session),
            user,
        };

        if let Err(e) = self.cache.set(raw, &principal).await {
            warn!("session cache write failed: {}", e);
        }

        Ok(principal)
    }

    async fn resolve_api_key(
        &self,
        api_key: &str,
        required_role: Role,
    ) -> IdentityResult<Principal> {
        let user = self
            .users
            .find_by_api_key(api_key)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        if user.role < required_role {
            return Err(IdentityError::InvalidToken);
        }

        Ok(Principal {
            role: user.role,
            session: None,
            user,
        })
    }
}
