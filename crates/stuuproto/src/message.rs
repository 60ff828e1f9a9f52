//! Message shapes for the native-backend IPC protocol.
//!
//! Every frame carries exactly one message, a string-keyed map with a
//! `type` discriminator:
//!
//! ```text
//! request:  { type, id, cmd, payload }      engine -> backend
//! response: { type, id, ok, payload?, error? }  backend -> engine
//! event:    { type, event, payload }        backend -> engine, unsolicited
//! ```
//!
//! Request ids are positive integers, strictly increasing within a
//! connection, and correlate a response to its request. Payloads are
//! JSON-shaped maps encoded as MessagePack on the wire (see
//! [`crate::codec`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One IPC message, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Request {
        id: u64,
        cmd: String,
        #[serde(default)]
        payload: Value,
    },
    Response {
        id: u64,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        event: String,
        #[serde(default)]
        payload: Value,
    },
}

impl WireMessage {
    pub fn request(id: u64, cmd: impl Into<String>, payload: Value) -> Self {
        Self::Request {
            id,
            cmd: cmd.into(),
            payload,
        }
    }

    pub fn ok(id: u64, payload: Value) -> Self {
        Self::Response {
            id,
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self::Response {
            id,
            ok: false,
            payload: None,
            error: Some(error.into()),
        }
    }

    pub fn event(event: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            event: event.into(),
            payload,
        }
    }
}

/// Backend command names used by the engine.
pub mod cmd {
    pub const TRANSPORT_GET_STATE: &str = "transport.get_state";
    pub const TRANSPORT_PLAY: &str = "transport.play";
    pub const TRANSPORT_PAUSE: &str = "transport.pause";
    pub const TRANSPORT_STOP: &str = "transport.stop";
    pub const TRANSPORT_SET_BPM: &str = "transport.set_bpm";
    pub const TRANSPORT_SEEK: &str = "transport.seek";
    pub const EDIT_RESET: &str = "edit:reset";
    pub const VST_SCAN: &str = "vst:scan";
    pub const VST_LOAD: &str = "vst:load";
    pub const VST_PARAM_SET: &str = "vst:param:set";
    pub const CLIP_IMPORT_FILE: &str = "clip:import-file";
}

/// Event names the backend publishes.
pub mod event {
    pub const TRANSPORT_TICK: &str = "transport.tick";
    pub const TRANSPORT_STATE: &str = "transport.state";
}
