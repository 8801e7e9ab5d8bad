//! Error types

mod client_error;

pub use client_error::{ClientError, ClientResult, RefreshError};
