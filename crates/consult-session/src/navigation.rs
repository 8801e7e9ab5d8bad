//! Redirect targets
//!
//! The session layer never renders anything; it asks the host application to move
//! the user to the login or service-down view through a [`Navigator`].

use consult_common::RouteConfig;
use parking_lot::Mutex;

/// Views the session layer can send the user to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The session is unrecoverable
    Login,
    /// The backend or network is down
    ServiceDown,
}

impl Route {
    /// Resolve the configured path for this route
    #[must_use]
    pub fn path(self, routes: &RouteConfig) -> &str {
        match self {
            Self::Login => &routes.login,
            Self::ServiceDown => &routes.service_down,
        }
    }
}

/// Host-provided navigation
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str);
}

/// Navigator that only logs, for headless hosts
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate_to(&self, path: &str) {
        tracing::warn!(path = %path, "Navigation requested");
    }
}

/// Navigator that remembers every redirect
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every path navigated to so far, oldest first
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }

    /// How many times `path` was navigated to
    pub fn count(&self, path: &str) -> usize {
        self.visited.lock().iter().filter(|p| *p == path).count()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, path: &str) {
        self.visited.lock().push(path.to_string());
    }
}
