//! `tokio-tungstenite` connector

use super::{Connector, Frame, FrameSink, FrameStream};
use crate::error::RealtimeError;
use crate::protocol::NO_STATUS_RECEIVED;
use async_trait::async_trait;
use futures_util::{future, SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Production connector over TCP/TLS
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), RealtimeError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| RealtimeError::Handshake(e.to_string()))?;

        let (sink, stream) = ws.split();

        let sink = sink.with(|frame: Frame| future::ready(Ok::<_, RealtimeError>(into_message(frame))));
        let stream = stream.filter_map(|msg| {
            future::ready(match msg {
                Ok(msg) => from_message(msg).map(Ok),
                Err(e) => Some(Err(RealtimeError::from(e))),
            })
        });

        Ok((Box::pin(sink), stream.boxed()))
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Close { code, reason } => Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.into(),
        })),
    }
}

/// Control and binary frames are handled by tungstenite or ignored
fn from_message(msg: Message) -> Option<Frame> {
    match msg {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Close(Some(frame)) => Some(Frame::Close {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        }),
        Message::Close(None) => Some(Frame::close(NO_STATUS_RECEIVED, "")),
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}
