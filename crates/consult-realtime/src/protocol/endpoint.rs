//! Socket URL resolution
//!
//! `<scheme>://<host>/ws/chat/<room>/?token=<access token>`

use crate::error::RealtimeError;
use consult_common::ClientConfig;
use reqwest::Url;

/// Where chat sockets connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
    base: Url,
}

impl SocketEndpoint {
    /// Parse an explicit `ws://` or `wss://` base
    pub fn parse(base: &str) -> Result<Self, RealtimeError> {
        let base = Url::parse(base).map_err(|e| RealtimeError::InvalidEndpoint(e.to_string()))?;
        if !matches!(base.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidEndpoint(format!(
                "unsupported scheme {}",
                base.scheme()
            )));
        }
        if base.host_str().is_none() {
            return Err(RealtimeError::InvalidEndpoint("missing host".to_string()));
        }
        Ok(Self { base })
    }

    /// Resolve from client configuration
    ///
    /// Host: `ws_host`, else the API base host, else the app origin host.
    /// Scheme: `wss` when the app origin (or, without one, the API base) is https.
    pub fn from_config(config: &ClientConfig) -> Result<Self, RealtimeError> {
        let api = parse_http(&config.api.base_url)?;
        let origin = config.app.origin.as_deref().map(parse_http).transpose()?;

        let secure = origin.as_ref().unwrap_or(&api).scheme() == "https";
        let scheme = if secure { "wss" } else { "ws" };

        let host = match config.realtime.ws_host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) => host.to_string(),
            None => authority(&api)
                .or_else(|| origin.as_ref().and_then(authority))
                .ok_or_else(|| RealtimeError::InvalidEndpoint("no socket host".to_string()))?,
        };

        Self::parse(&format!("{scheme}://{host}"))
    }

    /// Full socket URL for a room
    #[must_use]
    pub fn room_url(&self, room: &str, token: &str) -> String {
        let mut url = self.base.clone();
        url.set_query(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().extend(["ws", "chat", room, ""]);
        }
        url.query_pairs_mut().append_pair("token", token);
        url.into()
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base.scheme() == "wss"
    }
}

fn parse_http(raw: &str) -> Result<Url, RealtimeError> {
    Url::parse(raw).map_err(|e| RealtimeError::InvalidEndpoint(format!("{raw}: {e}")))
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
