//! In-memory connector for tests

use super::{Connector, Frame, FrameSink, FrameStream};
use crate::error::RealtimeError;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{future, SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Server side of an accepted fake connection
pub(crate) struct FakePeer {
    pub url: String,
    /// Frames the client sent
    pub from_client: mpsc::UnboundedReceiver<Frame>,
    /// Push frames to the client; dropping it ends the client's stream without a close frame
    pub to_client: mpsc::UnboundedSender<Frame>,
}

impl FakePeer {
    pub fn push_text(&self, text: &str) {
        let _ = self.to_client.unbounded_send(Frame::Text(text.to_string()));
    }

    pub fn close_with(&self, code: u16) {
        let _ = self.to_client.unbounded_send(Frame::close(code, ""));
    }

    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.from_client.next().await
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    Accept,
    Fail,
    /// Accept, but never complete a send
    Stall,
}

/// Connector that replays a script and records every attempt
///
/// Once the script runs out every attempt is refused.
pub(crate) struct FakeConnector {
    script: Mutex<VecDeque<Script>>,
    attempts: Mutex<Vec<(String, Instant)>>,
    peers: tokio::sync::mpsc::UnboundedSender<FakePeer>,
}

impl FakeConnector {
    pub fn new(script: &[Script]) -> (Self, tokio::sync::mpsc::UnboundedReceiver<FakePeer>) {
        let (peers, accepted) = tokio::sync::mpsc::unbounded_channel();
        let connector = Self {
            script: Mutex::new(script.iter().copied().collect()),
            attempts: Mutex::new(Vec::new()),
            peers,
        };
        (connector, accepted)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.attempts.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Time between consecutive attempts
    pub fn gaps(&self) -> Vec<Duration> {
        self.attempts
            .lock()
            .windows(2)
            .map(|pair| pair[1].1 - pair[0].1)
            .collect()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), RealtimeError> {
        self.attempts.lock().push((url.to_string(), Instant::now()));

        let step = self.script.lock().pop_front().unwrap_or(Script::Fail);
        match step {
            Script::Fail => Err(RealtimeError::Handshake("connection refused".to_string())),
            Script::Accept | Script::Stall => {
                let (client_tx, from_client) = mpsc::unbounded::<Frame>();
                let (to_client, client_rx) = mpsc::unbounded::<Frame>();

                let _ = self.peers.send(FakePeer {
                    url: url.to_string(),
                    from_client,
                    to_client,
                });

                let stream = client_rx.map(Ok).boxed();
                if matches!(step, Script::Stall) {
                    let sink = futures::sink::unfold(client_tx, |_tx, _frame: Frame| {
                        future::pending::<Result<mpsc::UnboundedSender<Frame>, RealtimeError>>()
                    });
                    return Ok((Box::pin(sink), stream));
                }

                let sink = client_tx.sink_map_err(|e| RealtimeError::Transport(e.to_string()));
                Ok((Box::pin(sink), stream))
            }
        }
    }
}
