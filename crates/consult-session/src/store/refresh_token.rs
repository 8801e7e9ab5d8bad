//! Refresh token persistence.
//!
//! The refresh token outlives the process, so it is written to a small JSON file with
//! owner-only permissions. The stored expiry comes from the token's unverified `exp`
//! claim and only decides when a stale record is thrown away.

use chrono::{DateTime, Utc};
use consult_common::{refresh_expiry_hint, ClientError, ClientResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Persisted refresh token record
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRefreshToken {
    pub token: String,
    /// Housekeeping hint derived from the token's `exp` claim
    pub expires_at: DateTime<Utc>,
    pub stored_at: DateTime<Utc>,
}

impl StoredRefreshToken {
    /// Create a record, deriving the expiry hint from the token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let now = Utc::now();
        Self {
            expires_at: refresh_expiry_hint(&token, now),
            stored_at: now,
            token,
        }
    }

    /// Whether the expiry hint has passed
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl std::fmt::Debug for StoredRefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredRefreshToken")
            .field("expires_at", &self.expires_at)
            .field("stored_at", &self.stored_at)
            .finish_non_exhaustive()
    }
}

/// Backing store for the refresh token
pub trait RefreshTokenStore: Send + Sync {
    /// Read the stored record, if any
    fn load(&self) -> ClientResult<Option<StoredRefreshToken>>;

    /// Replace the stored record
    fn save(&self, record: &StoredRefreshToken) -> ClientResult<()>;

    /// Remove the stored record (no error if nothing was stored)
    fn clear(&self) -> ClientResult<()>;
}

/// Process-local refresh token store
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStore {
    record: Mutex<Option<StoredRefreshToken>>,
}

impl MemoryRefreshTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefreshTokenStore for MemoryRefreshTokenStore {
    fn load(&self) -> ClientResult<Option<StoredRefreshToken>> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &StoredRefreshToken) -> ClientResult<()> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        self.record.lock().take();
        Ok(())
    }
}

/// Refresh token store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileRefreshTokenStore {
    path: PathBuf,
}

impl FileRefreshTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to an owner-only temp file next to the target and rename it into place
    fn write_private(&self, contents: &[u8]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl RefreshTokenStore for FileRefreshTokenStore {
    fn load(&self) -> ClientResult<Option<StoredRefreshToken>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::storage(e)),
        };

        match serde_json::from_slice(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable refresh token file"
                );
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn save(&self, record: &StoredRefreshToken) -> ClientResult<()> {
        let json = serde_json::to_vec(record)?;
        self.write_private(&json).map_err(ClientError::storage)?;

        tracing::debug!(
            path = %self.path.display(),
            expires_at = %record.expires_at,
            "Stored refresh token"
        );

        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed refresh token file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::storage(e)),
        }
    }
}
