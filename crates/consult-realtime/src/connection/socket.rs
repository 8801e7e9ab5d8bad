//! Per-room chat socket
//!
//! One background task per opened connection drives the handshake, the read/write
//! loop, and reconnects with exponential backoff. Every connection gets a new epoch;
//! a task whose epoch is no longer current may not publish state or dispatch events.

use super::{ChatHandlers, ConnectionState};
use crate::error::RealtimeError;
use crate::protocol::{
    CloseKind, InboundEvent, OutboundEvent, SocketEndpoint, ABNORMAL_CLOSURE, NORMAL_CLOSURE,
};
use crate::transport::{Connector, Frame, FrameSink, FrameStream};
use consult_common::RealtimeConfig;
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Upper bound on sending our close frame before the connection is dropped
pub(crate) const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// The connection currently owned by a socket
struct Active {
    room: String,
    token: String,
    shutdown: watch::Sender<bool>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    task: JoinHandle<()>,
}

impl Active {
    /// Ask the task to close with 1000 and stop reconnecting
    fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[derive(Default)]
struct Slot {
    epoch: u64,
    active: Option<Active>,
}

struct Shared {
    handlers: RwLock<ChatHandlers>,
    slot: Mutex<Slot>,
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    fn is_current(&self, epoch: u64) -> bool {
        self.slot.lock().epoch == epoch
    }

    /// Publish `state` if `epoch` is still current
    fn publish(&self, epoch: u64, state: ConnectionState) -> bool {
        let slot = self.slot.lock();
        if slot.epoch != epoch {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    fn dispatch(&self, epoch: u64, room: &str, text: &str) {
        if !self.is_current(epoch) {
            return;
        }

        match InboundEvent::parse(text) {
            Ok(Some(event)) => {
                let kind = event.kind();
                let handlers = self.handlers.read().clone();
                if !handlers.dispatch(event) {
                    tracing::trace!(room = %room, kind, "No handler registered");
                }
            }
            Ok(None) => tracing::trace!(room = %room, "Ignoring unrecognised frame"),
            Err(e) => tracing::warn!(room = %room, error = %e, "Dropping malformed frame"),
        }
    }
}

/// Live connection to one chat room
///
/// Must be used inside a tokio runtime. Dropping the socket closes it.
pub struct ChatSocket {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    endpoint: SocketEndpoint,
    config: RealtimeConfig,
}

impl ChatSocket {
    #[must_use]
    pub fn new(
        connector: Arc<dyn Connector>,
        endpoint: SocketEndpoint,
        config: RealtimeConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            shared: Arc::new(Shared {
                handlers: RwLock::new(ChatHandlers::default()),
                slot: Mutex::new(Slot::default()),
                state,
            }),
            connector,
            endpoint,
            config,
        }
    }

    /// Connect to `room` with `token`, or just swap handlers if already connected there
    ///
    /// Does nothing beyond storing the handlers when room or token is empty. A
    /// different room or token tears the old connection down cleanly first.
    pub fn open(&self, room: &str, token: &str, handlers: ChatHandlers) {
        *self.shared.handlers.write() = handlers;

        if room.is_empty() || token.is_empty() {
            tracing::debug!(room = %room, "Room or token missing, not connecting");
            return;
        }

        self.connect(room, token);
    }

    /// Reconnect the current room with a new access token
    pub fn update_token(&self, token: &str) {
        let room = self
            .shared
            .slot
            .lock()
            .active
            .as_ref()
            .map(|active| active.room.clone());

        if let Some(room) = room {
            if !token.is_empty() {
                self.connect(&room, token);
            }
        }
    }

    fn connect(&self, room: &str, token: &str) {
        let mut slot = self.shared.slot.lock();

        if let Some(active) = &slot.active {
            if active.room == room && active.token == token && !active.task.is_finished() {
                tracing::trace!(room = %room, "Already connected, handlers updated");
                return;
            }
        }

        if let Some(old) = slot.active.take() {
            tracing::debug!(room = %old.room, "Replacing chat socket");
            old.stop();
        }

        slot.epoch = slot.epoch.wrapping_add(1);
        let epoch = slot.epoch;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        self.shared.state.send_replace(ConnectionState::Connecting);

        let worker = Worker {
            shared: Arc::clone(&self.shared),
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            url: self.endpoint.room_url(room, token),
            room: room.to_string(),
            epoch,
            shutdown: shutdown_rx,
            outbound: outbound_rx,
        };
        let task = tokio::spawn(worker.run());

        slot.active = Some(Active {
            room: room.to_string(),
            token: token.to_string(),
            shutdown: shutdown_tx,
            outbound: outbound_tx,
            task,
        });

        tracing::debug!(room = %room, epoch, "Chat socket connecting");
    }

    /// Transmit `event` if the connection is open; otherwise drop it
    pub fn send(&self, event: &OutboundEvent) -> bool {
        let slot = self.shared.slot.lock();
        let Some(active) = slot.active.as_ref() else {
            return false;
        };
        if !self.shared.state.borrow().is_open() {
            tracing::trace!(room = %active.room, "Socket not open, dropping outbound event");
            return false;
        }
        active.outbound.send(event.clone()).is_ok()
    }

    /// Close with 1000 and cancel any pending reconnect
    pub fn close(&self) {
        let mut slot = self.shared.slot.lock();
        slot.epoch = slot.epoch.wrapping_add(1);

        if let Some(active) = slot.active.take() {
            active.stop();
            self.shared.state.send_replace(ConnectionState::ClosedClean);
            tracing::info!(room = %active.room, "Chat socket closed");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state.borrow().is_open()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Room of the current connection, if any
    pub fn room(&self) -> Option<String> {
        self.shared
            .slot
            .lock()
            .active
            .as_ref()
            .map(|active| active.room.clone())
    }
}

impl Drop for ChatSocket {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ChatSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSocket")
            .field("room", &self.room())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

enum SessionEnd {
    /// Caller closed or replaced the connection
    Shutdown,
    /// Connection ended with this close code
    Closed(u16),
}

struct Worker {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    config: RealtimeConfig,
    url: String,
    room: String,
    epoch: u64,
    shutdown: watch::Receiver<bool>,
    outbound: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl Worker {
    async fn run(mut self) {
        let mut attempts: u32 = 0;

        loop {
            if !self.shared.publish(self.epoch, ConnectionState::Connecting) {
                return;
            }

            let connected = tokio::select! {
                _ = self.shutdown.changed() => return,
                result = self.connector.connect(&self.url) => result,
            };

            let code = match connected {
                Ok((mut sink, stream)) => {
                    attempts = 0;
                    // Events queued against the previous connection are not replayed.
                    while self.outbound.try_recv().is_ok() {}

                    if !self.shared.publish(self.epoch, ConnectionState::Open) {
                        close_quietly(&mut sink, &self.room, "superseded").await;
                        return;
                    }
                    tracing::info!(room = %self.room, "Chat socket open");

                    match self.pump(sink, stream).await {
                        SessionEnd::Shutdown => return,
                        SessionEnd::Closed(code) => code,
                    }
                }
                Err(e) => {
                    tracing::warn!(room = %self.room, error = %e, "Chat socket handshake failed");
                    ABNORMAL_CLOSURE
                }
            };

            match CloseKind::classify(code) {
                CloseKind::Clean => {
                    tracing::info!(room = %self.room, "Chat socket closed by server");
                    self.shared.publish(self.epoch, ConnectionState::ClosedClean);
                    return;
                }
                CloseKind::AuthRejected => {
                    tracing::warn!(room = %self.room, code, "Chat socket rejected the access token");
                    self.shared
                        .publish(self.epoch, ConnectionState::ClosedAuthRejected);
                    return;
                }
                CloseKind::Unexpected => {}
            }

            if attempts >= self.config.max_reconnect_attempts {
                let err = RealtimeError::ReconnectExhausted { attempts };
                tracing::warn!(room = %self.room, error = %err, "Giving up on chat socket");
                self.shared.publish(self.epoch, ConnectionState::ClosedExhausted);
                return;
            }

            let delay = self.config.backoff_delay(attempts);
            attempts += 1;

            if !self.shared.publish(
                self.epoch,
                ConnectionState::Reconnecting {
                    attempt: attempts,
                    delay,
                },
            ) {
                return;
            }
            tracing::info!(
                room = %self.room,
                code,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Chat socket dropped, reconnecting"
            );

            tokio::select! {
                _ = self.shutdown.changed() => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Read and write frames until the connection ends
    async fn pump(&mut self, mut sink: FrameSink, mut stream: FrameStream) -> SessionEnd {
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    close_quietly(&mut sink, &self.room, "client closed").await;
                    return SessionEnd::Shutdown;
                }
                Some(event) = self.outbound.recv() => {
                    let sent = match event.to_json() {
                        Ok(text) => sink.send(Frame::Text(text)).await,
                        Err(e) => {
                            tracing::warn!(room = %self.room, error = %e, "Failed to encode outbound event");
                            continue;
                        }
                    };
                    if let Err(e) = sent {
                        tracing::warn!(room = %self.room, error = %e, "Failed to send frame");
                        return SessionEnd::Closed(ABNORMAL_CLOSURE);
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Frame::Text(text))) => {
                        self.shared.dispatch(self.epoch, &self.room, &text);
                    }
                    Some(Ok(Frame::Close { code, reason })) => {
                        tracing::debug!(room = %self.room, code, reason = %reason, "Close frame received");
                        return SessionEnd::Closed(code);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(room = %self.room, error = %e, "Chat socket transport error");
                        return SessionEnd::Closed(ABNORMAL_CLOSURE);
                    }
                    None => {
                        tracing::debug!(room = %self.room, "Chat socket stream ended");
                        return SessionEnd::Closed(ABNORMAL_CLOSURE);
                    }
                },
            }
        }
    }
}

/// Send a 1000 close frame and flush, giving up after [`CLOSE_HANDSHAKE_TIMEOUT`]
async fn close_quietly(sink: &mut FrameSink, room: &str, reason: &str) {
    let handshake = async {
        let _ = sink.send(Frame::close(NORMAL_CLOSURE, reason)).await;
        let _ = sink.close().await;
    };
    if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, handshake).await.is_err() {
        tracing::debug!(room = %room, "Close handshake timed out, dropping connection");
    }
}
