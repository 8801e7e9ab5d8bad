//! Room connection manager
//!
//! Keeps one [`ChatSocket`] per joined room using `DashMap` for thread-safe access.

use super::{ChatHandlers, ChatSocket, ConnectionState};
use crate::error::RealtimeError;
use crate::protocol::{OutboundEvent, SocketEndpoint};
use crate::transport::{Connector, TungsteniteConnector};
use consult_common::{AccessTokenSource, ClientConfig, RealtimeConfig};
use dashmap::DashMap;
use std::sync::Arc;

/// Manages the chat sockets of every joined room
///
/// Tokens are read from the session layer on every (re)connect; the manager never
/// refreshes them itself.
pub struct RealtimeManager {
    connector: Arc<dyn Connector>,
    endpoint: SocketEndpoint,
    config: RealtimeConfig,
    tokens: Arc<dyn AccessTokenSource>,

    /// Open sockets by room id
    rooms: DashMap<String, Arc<ChatSocket>>,
}

impl RealtimeManager {
    /// Create a manager with the production connector
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, RealtimeError> {
        Ok(Self::with_connector(
            Arc::new(TungsteniteConnector::new()),
            SocketEndpoint::from_config(config)?,
            config.realtime.clone(),
            tokens,
        ))
    }

    #[must_use]
    pub fn with_connector(
        connector: Arc<dyn Connector>,
        endpoint: SocketEndpoint,
        config: RealtimeConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            connector,
            endpoint,
            config,
            tokens,
            rooms: DashMap::new(),
        }
    }

    /// Open (or refresh handlers of) the socket for `room`
    pub fn join(&self, room: &str, handlers: ChatHandlers) -> Arc<ChatSocket> {
        let socket = self
            .rooms
            .entry(room.to_string())
            .or_insert_with(|| {
                Arc::new(ChatSocket::new(
                    Arc::clone(&self.connector),
                    self.endpoint.clone(),
                    self.config.clone(),
                ))
            })
            .clone();

        let token = self.tokens.access_token().unwrap_or_default();
        if token.is_empty() {
            tracing::warn!(room = %room, "No access token, chat socket stays closed");
        }
        socket.open(room, &token, handlers);
        socket
    }

    /// Close and forget the socket for `room`
    pub fn leave(&self, room: &str) -> bool {
        match self.rooms.remove(room) {
            Some((_, socket)) => {
                socket.close();
                true
            }
            None => false,
        }
    }

    /// Send to `room` if its socket is open
    pub fn send(&self, room: &str, event: &OutboundEvent) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|socket| socket.send(event))
    }

    /// Reconnect every room with the current access token
    ///
    /// Call after the session layer rotated the access token.
    pub fn rotate_token(&self) {
        let Some(token) = self.tokens.access_token() else {
            tracing::debug!("No access token to rotate to");
            return;
        };

        for entry in &self.rooms {
            entry.value().update_token(&token);
        }
        tracing::debug!(rooms = self.rooms.len(), "Chat sockets rotated to new token");
    }

    pub fn socket(&self, room: &str) -> Option<Arc<ChatSocket>> {
        self.rooms.get(room).map(|r| Arc::clone(r.value()))
    }

    pub fn state(&self, room: &str) -> Option<ConnectionState> {
        self.rooms.get(room).map(|socket| socket.state())
    }

    pub fn rooms(&self) -> Vec<String> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Close every socket
    pub fn close_all(&self) {
        let count = self.rooms.len();
        self.rooms.retain(|_, socket| {
            socket.close();
            false
        });
        tracing::info!(rooms = count, "All chat sockets closed");
    }
}

impl std::fmt::Debug for RealtimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeManager")
            .field("endpoint", &self.endpoint)
            .field("rooms", &self.rooms.len())
            .finish_non_exhaustive()
    }
}
