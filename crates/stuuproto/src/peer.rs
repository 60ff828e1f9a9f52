//! NativePeer - the engine side of the backend IPC layer.
//!
//! Connects to the native audio backend over a unix-domain stream socket
//! and provides request/response correlation plus an unsolicited event
//! stream.
//!
//! ## Connection lifecycle
//!
//! ```text
//! Idle -> Connecting -> Connected -> Disconnected -> (delay) -> Connecting
//! ```
//!
//! `start()` never blocks on the first connection: if the backend is not
//! there yet the peer keeps retrying every `reconnect_delay` until
//! `stop()` cancels it. Requests issued while disconnected fail
//! immediately.
//!
//! ## Correlation
//!
//! Request ids are allocated from an atomic counter, strictly increasing
//! within a connection. Each in-flight request parks a oneshot waiter in
//! the pending map; the reader task delivers the matching response to at
//! most one waiter. Timed-out entries are removed, so a late response is
//! a lookup miss and is dropped silently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{broadcast, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{Inbound, NativeCodec};
use crate::message::WireMessage;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(750);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("native backend is not connected")]
    NotConnected,

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("disconnected before a response arrived")]
    Disconnected,

    #[error("peer stopped")]
    Stopped,

    #[error("native backend error: {0}")]
    Backend(String),

    #[error("wire error: {0}")]
    Wire(String),
}

/// An unsolicited event from the backend.
#[derive(Debug, Clone)]
pub struct NativeEvent {
    pub event: String,
    pub payload: Value,
}

/// Connection-state notifications for subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Connected,
    Disconnected,
}

type Waiter = oneshot::Sender<Result<Value, PeerError>>;

/// Client for the native audio backend socket. Cheap to clone; all
/// clones share one connection.
#[derive(Clone)]
pub struct NativePeer {
    shared: Arc<PeerShared>,
}

struct PeerShared {
    socket_path: PathBuf,
    request_timeout: Duration,
    reconnect_delay: Duration,
    next_id: AtomicU64,
    started: AtomicBool,
    connected: AtomicBool,
    pending: Mutex<HashMap<u64, Waiter>>,
    writer: tokio::sync::Mutex<Option<FramedWrite<OwnedWriteHalf, NativeCodec>>>,
    events: broadcast::Sender<NativeEvent>,
    states: broadcast::Sender<PeerState>,
    cancel: CancellationToken,
}

impl NativePeer {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self::with_timing(socket_path, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RECONNECT_DELAY)
    }

    pub fn with_timing(
        socket_path: impl AsRef<Path>,
        request_timeout: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let (states, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(PeerShared {
                socket_path: socket_path.as_ref().to_path_buf(),
                request_timeout,
                reconnect_delay,
                next_id: AtomicU64::new(0),
                started: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                pending: Mutex::new(HashMap::new()),
                writer: tokio::sync::Mutex::new(None),
                events,
                states,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Begin connecting. Returns immediately; "started" does not mean
    /// "connected". Reconnects run until [`NativePeer::stop`].
    pub fn start(&self) {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            shared.run().await;
        });
    }

    /// Cancel reconnects, reject every pending request with
    /// [`PeerError::Stopped`], and close the socket.
    pub async fn stop(&self) {
        self.shared.cancel.cancel();
        self.shared.connected.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.shared.writer.lock().await.take() {
            let _ = writer.close().await;
        }
        self.shared.fail_pending(PeerError::Stopped);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn socket_path(&self) -> &Path {
        &self.shared.socket_path
    }

    /// Number of in-flight requests (waiters parked in the pending map).
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.lock().unwrap().len()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<NativeEvent> {
        self.shared.events.subscribe()
    }

    pub fn subscribe_state(&self) -> broadcast::Receiver<PeerState> {
        self.shared.states.subscribe()
    }

    /// Send a request and wait for the correlated response payload.
    pub async fn request(&self, cmd: &str, payload: Value) -> Result<Value, PeerError> {
        let shared = &self.shared;

        if shared.cancel.is_cancelled() {
            return Err(PeerError::Stopped);
        }
        if !shared.connected.load(Ordering::SeqCst) {
            return Err(PeerError::NotConnected);
        }

        let id = shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        shared.pending.lock().unwrap().insert(id, tx);

        let msg = WireMessage::request(id, cmd, payload);
        let send_result = {
            let mut writer = shared.writer.lock().await;
            match writer.as_mut() {
                Some(w) => w.send(msg).await.map_err(|e| PeerError::Wire(e.to_string())),
                None => Err(PeerError::NotConnected),
            }
        };
        if let Err(e) = send_result {
            shared.pending.lock().unwrap().remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(shared.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            // waiter dropped without a verdict: the connection went away
            Ok(Err(_)) => Err(PeerError::Disconnected),
            Err(_) => {
                shared.pending.lock().unwrap().remove(&id);
                Err(PeerError::Timeout(shared.request_timeout.as_millis() as u64))
            }
        }
    }
}

impl PeerShared {
    async fn run(self: Arc<Self>) {
        loop {
            let connect = tokio::select! {
                _ = self.cancel.cancelled() => return,
                res = UnixStream::connect(&self.socket_path) => res,
            };

            match connect {
                Ok(stream) => {
                    let (read_half, write_half) = stream.into_split();
                    let reader = FramedRead::new(read_half, NativeCodec::new());
                    *self.writer.lock().await = Some(FramedWrite::new(write_half, NativeCodec::new()));

                    info!(path = %self.socket_path.display(), "connected to native backend");
                    self.connected.store(true, Ordering::SeqCst);
                    let _ = self.states.send(PeerState::Connected);

                    self.read_loop(reader).await;

                    self.connected.store(false, Ordering::SeqCst);
                    self.writer.lock().await.take();
                    if self.cancel.is_cancelled() {
                        // teardown came from stop(): waiters get Stopped
                        self.fail_pending(PeerError::Stopped);
                        return;
                    }
                    self.fail_pending(PeerError::Disconnected);
                    let _ = self.states.send(PeerState::Disconnected);
                    info!(
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "native backend disconnected, will reconnect"
                    );
                }
                Err(e) => {
                    debug!(path = %self.socket_path.display(), "connect failed: {e}");
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn read_loop(&self, mut reader: FramedRead<OwnedReadHalf, NativeCodec>) {
        loop {
            let item = tokio::select! {
                _ = self.cancel.cancelled() => return,
                item = reader.next() => item,
            };

            match item {
                Some(Ok(Inbound::Message(msg))) => self.dispatch(msg),
                Some(Ok(Inbound::Malformed(err))) => {
                    warn!("malformed frame from native backend: {err}");
                }
                Some(Err(e)) => {
                    warn!("native socket read error: {e}");
                    return;
                }
                None => {
                    info!("native backend closed the connection");
                    return;
                }
            }
        }
    }

    fn dispatch(&self, msg: WireMessage) {
        match msg {
            WireMessage::Response {
                id,
                ok,
                payload,
                error,
            } => {
                let waiter = self.pending.lock().unwrap().remove(&id);
                match waiter {
                    Some(tx) => {
                        let result = if ok {
                            Ok(payload.unwrap_or(Value::Null))
                        } else {
                            Err(PeerError::Backend(
                                error.unwrap_or_else(|| "unspecified backend error".to_string()),
                            ))
                        };
                        let _ = tx.send(result);
                    }
                    None => debug!(id, "dropping response with no waiter"),
                }
            }
            WireMessage::Event { event, payload } => {
                let _ = self.events.send(NativeEvent { event, payload });
            }
            WireMessage::Request { id, cmd, .. } => {
                warn!(id, cmd = %cmd, "unexpected request from native backend");
            }
        }
    }

    fn fail_pending(&self, err: PeerError) {
        let waiters: Vec<Waiter> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().map(|(_, tx)| tx).collect()
        };
        for tx in waiters {
            let _ = tx.send(Err(err.clone()));
        }
    }
}
