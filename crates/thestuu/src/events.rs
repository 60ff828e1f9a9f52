//! Client-facing event names and frame encoding.
//!
//! Everything pushed to a client is one JSON text frame of the shape
//! `{"event": <name>, "payload": {...}}`. Frames are serialized once and
//! fanned out as strings so N clients don't pay N serializations.

use serde_json::{json, Value};

pub const READY: &str = "ready";
pub const STATE: &str = "state";
pub const TRANSPORT: &str = "transport";
pub const METER: &str = "meter";
pub const ACK: &str = "ack";
pub const ERROR: &str = "error";

pub fn frame(event: &str, payload: Value) -> String {
    serde_json::to_string(&json!({"event": event, "payload": payload}))
        .expect("event frames serialize")
}
