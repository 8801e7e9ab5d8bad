//! Unverified JWT claim inspection
//!
//! The client never holds the signing secret, so claims are read with signature
//! validation disabled. Results are housekeeping hints (storage lifetime, logs),
//! never authorization decisions: the server's rejection of a token is the only
//! authoritative signal.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifetime assumed for a refresh token whose `exp` claim cannot be read (7 days)
pub const DEFAULT_REFRESH_LIFETIME_SECS: i64 = 604_800;

/// Claims commonly present in the platform's tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiration time (Unix timestamp)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
    /// `access` or `refresh`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token identifier
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
}

impl TokenClaims {
    /// Expiry as a timestamp, if the claim is present and in range
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// Whether the `exp` claim lies in the past relative to `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// Decode a token's payload without checking its signature
///
/// Returns `None` for anything that is not a structurally valid JWT.
#[must_use]
pub fn peek_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

/// When a stored refresh token should be considered stale
///
/// Uses the `exp` claim when readable, otherwise `now + 7 days`.
#[must_use]
pub fn refresh_expiry_hint(token: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    peek_claims(token)
        .and_then(|claims| claims.expires_at())
        .unwrap_or_else(|| now + Duration::seconds(DEFAULT_REFRESH_LIFETIME_SECS))
}
