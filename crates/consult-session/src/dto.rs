//! Wire DTOs for the auth endpoints
//!
//! Field names are part of the API contract and must not change.

use serde::{Deserialize, Serialize};

// ============================================================================
// Requests
// ============================================================================

/// Login request
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Token refresh request: `{ "refresh": <token> }`
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

// ============================================================================
// Responses
// ============================================================================

/// Tokens issued by login or refresh
///
/// The refresh token is only present when the server rotates it.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("rotated", &self.refresh.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_request_shape() {
        let body = serde_json::to_value(RefreshRequest { refresh: "r1" }).unwrap();
        assert_eq!(body, serde_json::json!({ "refresh": "r1" }));
    }

    #[test]
    fn test_token_response_without_rotation() {
        let resp: TokenResponse = serde_json::from_str(r#"{"access":"a2"}"#).unwrap();
        assert_eq!(resp.access, "a2");
        assert!(resp.refresh.is_none());
    }

    #[test]
    fn test_token_response_with_rotation() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access":"a2","refresh":"r2","extra":1}"#).unwrap();
        assert_eq!(resp.refresh.as_deref(), Some("r2"));
    }

    #[test]
    fn test_token_response_requires_access() {
        assert!(serde_json::from_str::<TokenResponse>(r#"{"refresh":"r2"}"#).is_err());
    }

    #[test]
    fn test_login_debug_hides_password() {
        let req = LoginRequest::new("a@b.c", "hunter22");
        let debug = format!("{req:?}");
        assert!(debug.contains("a@b.c"));
        assert!(!debug.contains("hunter22"));
    }
}
