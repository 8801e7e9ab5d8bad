//! Read-only access to the current bearer token

use std::sync::Arc;

/// Anything that can hand out the current access token.
///
/// The realtime layer only ever reads through this trait; it never refreshes.
pub trait AccessTokenSource: Send + Sync {
    /// The access token as of this call, if a session is active
    fn access_token(&self) -> Option<String>;
}

impl<T: AccessTokenSource + ?Sized> AccessTokenSource for Arc<T> {
    fn access_token(&self) -> Option<String> {
        (**self).access_token()
    }
}

/// A fixed token, mostly useful for tools and tests
impl AccessTokenSource for String {
    fn access_token(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.clone())
        }
    }
}
