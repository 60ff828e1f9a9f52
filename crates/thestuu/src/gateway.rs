//! WebSocket client gateway.
//!
//! Serves N concurrent clients. Every connection first receives the
//! ready/state/transport sequence, then a fan-out of broadcast frames.
//! Incoming commands are forwarded to the engine task one at a time per
//! client, and each one is answered with exactly one ack carrying the
//! client-chosen `id`. A failed command never disconnects the client.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::EngineRequest;
use crate::events;

#[derive(Clone)]
pub struct GatewayState {
    pub engine: mpsc::Sender<EngineRequest>,
    pub events: broadcast::Sender<String>,
}

pub fn router(state: GatewayState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

/// One command frame from a client. `id` is opaque and echoed back in
/// the ack.
#[derive(Debug, Deserialize)]
struct ClientCommand {
    #[serde(default)]
    id: Option<Value>,
    cmd: String,
    #[serde(default)]
    payload: Value,
}

async fn client_session(socket: WebSocket, state: GatewayState) {
    let (mut sink, mut stream) = socket.split();

    // subscribe before the snapshot so no state broadcast is lost
    let mut events = state.events.subscribe();

    let (reply, hello) = oneshot::channel();
    if state
        .engine
        .send(EngineRequest::Hello { reply })
        .await
        .is_err()
    {
        return;
    }
    let Ok(frames) = hello.await else { return };
    for frame in frames {
        if sink.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    info!("client connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(frame) => {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "client fell behind the event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match handle_command(&state, text.as_str()).await {
                        Some(frame) => {
                            if sink.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        // engine gone, nothing left to serve
                        None => break,
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("client socket error: {e}");
                    break;
                }
            }
        }
    }
    info!("client disconnected");
}

/// Route one command to the engine and build the reply frame. `None`
/// means the engine task is gone and the session should end.
async fn handle_command(state: &GatewayState, text: &str) -> Option<String> {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            return Some(events::frame(
                events::ERROR,
                json!({"event": "command", "error": format!("unparseable command: {e}")}),
            ));
        }
    };

    let (reply, rx) = oneshot::channel();
    let request = EngineRequest::Command {
        cmd: command.cmd.clone(),
        payload: command.payload,
        reply,
    };
    if state.engine.send(request).await.is_err() {
        return None;
    }
    let Ok(mut ack) = rx.await else { return None };

    if let Value::Object(fields) = &mut ack {
        fields.insert("cmd".to_string(), Value::String(command.cmd));
        if let Some(id) = command.id {
            fields.insert("id".to_string(), id);
        }
    }
    Some(events::frame(events::ACK, ack))
}
