//! Access and refresh token holder
//!
//! The access token lives in memory only. The refresh token goes through a
//! [`RefreshTokenStore`] so it can survive restarts.

use super::refresh_token::{MemoryRefreshTokenStore, RefreshTokenStore, StoredRefreshToken};
use chrono::Utc;
use consult_common::{AccessTokenSource, ClientResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Owns both session tokens
///
/// Single writer at a time (login, refresh, logout); any number of readers.
pub struct TokenStore {
    access: RwLock<Option<String>>,
    refresh: Arc<dyn RefreshTokenStore>,
}

impl TokenStore {
    /// Create a token store over the given refresh token backend
    #[must_use]
    pub fn new(refresh: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            access: RwLock::new(None),
            refresh,
        }
    }

    /// Create a token store that keeps everything in memory
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRefreshTokenStore::new()))
    }

    /// Current access token
    pub fn access(&self) -> Option<String> {
        self.access.read().clone()
    }

    /// Overwrite the access token
    pub fn set_access(&self, token: impl Into<String>) {
        *self.access.write() = Some(token.into());
    }

    /// Current refresh token, dropping it if its expiry hint has passed
    pub fn refresh(&self) -> Option<String> {
        let record = match self.refresh.load() {
            Ok(record) => record?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read refresh token");
                return None;
            }
        };

        if record.is_stale_at(Utc::now()) {
            tracing::debug!(expires_at = %record.expires_at, "Stored refresh token is stale");
            if let Err(e) = self.refresh.clear() {
                tracing::warn!(error = %e, "Failed to remove stale refresh token");
            }
            return None;
        }

        Some(record.token)
    }

    /// Overwrite the refresh token
    pub fn set_refresh(&self, token: impl Into<String>) -> ClientResult<()> {
        self.refresh.save(&StoredRefreshToken::new(token))
    }

    /// Store a freshly issued pair
    pub fn set_tokens(&self, access: impl Into<String>, refresh: Option<String>) -> ClientResult<()> {
        self.set_access(access);
        match refresh {
            Some(refresh) => self.set_refresh(refresh),
            None => Ok(()),
        }
    }

    /// Forget both tokens
    pub fn clear(&self) {
        self.access.write().take();
        if let Err(e) = self.refresh.clear() {
            tracing::warn!(error = %e, "Failed to clear refresh token");
        }
    }

    /// Whether an access token is currently held
    pub fn has_access(&self) -> bool {
        self.access.read().is_some()
    }
}

impl AccessTokenSource for TokenStore {
    fn access_token(&self) -> Option<String> {
        self.access()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_access", &self.has_access())
            .finish_non_exhaustive()
    }
}
