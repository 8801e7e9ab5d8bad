//! Token storage

mod refresh_token;
mod token_store;

pub use refresh_token::{
    FileRefreshTokenStore, MemoryRefreshTokenStore, RefreshTokenStore, StoredRefreshToken,
};
pub use token_store::TokenStore;
