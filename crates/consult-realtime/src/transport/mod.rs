//! Socket transport seam
//!
//! The connection loop only sees [`Frame`]s; a [`Connector`] turns a URL into a
//! frame sink and a frame stream.

mod tungstenite;

#[cfg(test)]
pub(crate) mod testing;

pub use self::tungstenite::TungsteniteConnector;

use crate::error::RealtimeError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::Sink;
use std::pin::Pin;

/// Application-level frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

impl Frame {
    #[must_use]
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Self::Close {
            code,
            reason: reason.into(),
        }
    }
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = RealtimeError> + Send>>;
pub type FrameStream = BoxStream<'static, Result<Frame, RealtimeError>>;

/// Opens socket connections
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the handshake
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), RealtimeError>;
}
