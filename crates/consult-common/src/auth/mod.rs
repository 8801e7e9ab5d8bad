//! Token utilities shared by the session and realtime crates

mod jwt;
mod source;

pub use jwt::{peek_claims, refresh_expiry_hint, TokenClaims, DEFAULT_REFRESH_LIFETIME_SECS};
pub use source::AccessTokenSource;
