//! Session token encoding and two-tier decoding
//!
//! Tokens are HS256 JWTs signed with the owning session's private secret,
//! so decoding happens in two tiers: [`decode_unverified`] reads the claims
//! without checking the signature (enough to learn *which* session's secret
//! to fetch), and [`decode_verified`] checks signature and expiry against
//! that secret. Nothing here touches storage; callers supply the secret.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

/// Claims carried by every session token. All five fields are required;
/// a token missing any of them fails to decode at either tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub user_uuid: Uuid,
    pub session_uuid: Uuid,
    /// Rank snapshot taken at issue time.
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl TokenPayload {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Expiry is exact: a token is dead the second `exp` passes.
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

/// Token decode failures.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Signature checked out but the embedded expiry has passed.
    #[error("token expired")]
    Expired,
    /// Anything else: malformed compact form, bad claims, wrong signature.
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Signs `payload` into a compact token with the given session secret.
pub fn encode(payload: &TokenPayload, secret: &str) -> Result<String, TokenError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Invalid)
}

/// Decodes the claims without verifying the signature or expiry.
///
/// The result must never be trusted on its own: it only tells the caller
/// which user and session the token *claims* to belong to, so the real
/// secret can be looked up for [`decode_verified`].
pub fn decode_unverified(token: &str) -> Result<TokenPayload, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<TokenPayload>(
        token,
        &DecodingKey::from_secret(&[]),
        &validation,
    )
    .map_err(TokenError::Invalid)?;
    Ok(data.claims)
}

/// Decodes and fully verifies a token against a session secret, with no
/// expiry leeway.
pub fn decode_verified(token: &str, secret: &str) -> Result<TokenPayload, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let data = jsonwebtoken::decode::<TokenPayload>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e),
    })?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload(exp_offset_secs: i64) -> TokenPayload {
        let now = Utc::now().timestamp();
        TokenPayload {
            user_uuid: Uuid::now_v7(),
            session_uuid: Uuid::now_v7(),
            role: Role::USER,
            iat: now,
            exp: now + exp_offset_secs,
        }
    }

    #[test]
    fn test_encode_then_decode_verified_roundtrip() {
        let payload = sample_payload(3600);
        let token = encode(&payload, "secret-a").unwrap();
        let claims = decode_verified(&token, "secret-a").unwrap();
        assert_eq!(claims, payload);
    }

    #[test]
    fn test_decode_verified_rejects_wrong_secret() {
        let token = encode(&sample_payload(3600), "secret-a").unwrap();
        let err = decode_verified(&token, "secret-b").unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_decode_verified_rejects_expired_token() {
        let token = encode(&sample_payload(-60), "secret-a").unwrap();
        let err = decode_verified(&token, "secret-a").unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn test_decode_unverified_ignores_signature_and_expiry() {
        let payload = sample_payload(-60);
        let token = encode(&payload, "secret-a").unwrap();
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims, payload);
    }

    #[test]
    fn test_spliced_signature_passes_unverified_but_fails_verified() {
        let payload = sample_payload(3600);
        let token_a = encode(&payload, "secret-a").unwrap();
        let token_b = encode(&payload, "secret-b").unwrap();

        let head_a = token_a.rsplit_once('.').unwrap().0;
        let sig_b = token_b.rsplit_once('.').unwrap().1;
        let spliced = format!("{head_a}.{sig_b}");

        assert!(decode_unverified(&spliced).is_ok());
        assert!(matches!(
            decode_verified(&spliced, "secret-a"),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_tokens_fail_both_tiers() {
        for garbage in ["", "fake", "a.b", "a.b.c.d", "!!!.###.$$$"] {
            assert!(decode_unverified(garbage).is_err(), "unverified: {garbage:?}");
            assert!(decode_verified(garbage, "secret").is_err(), "verified: {garbage:?}");
        }
    }

    #[test]
    fn test_payload_missing_claims_fails_decode() {
        // Hand-build a token whose payload lacks session_uuid.
        #[derive(Serialize)]
        struct Partial {
            user_uuid: Uuid,
            role: Role,
            iat: i64,
            exp: i64,
        }
        let partial = Partial {
            user_uuid: Uuid::now_v7(),
            role: Role::USER,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &partial,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(decode_unverified(&token).is_err());
        assert!(decode_verified(&token, "secret").is_err());
    }
}
