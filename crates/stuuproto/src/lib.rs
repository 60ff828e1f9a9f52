//! stuuproto - wire protocol for the TheStuu native-backend IPC.
//!
//! This crate defines the framed binary messages exchanged between the
//! engine and the native audio backend, the canonical transport
//! snapshot, and (behind the default `peer` feature) the reconnecting
//! socket client the engine drives.

pub mod message;
pub mod snapshot;

#[cfg(feature = "peer")]
pub mod codec;
#[cfg(feature = "peer")]
pub mod peer;

pub use message::{cmd, event, WireMessage};
pub use snapshot::{
    now_ms, round6, TransportSnapshot, BEATS_PER_BAR, STEPS_PER_BAR, STEPS_PER_BEAT,
};

#[cfg(feature = "peer")]
pub use codec::{encode_frame, Inbound, NativeCodec, ProtoError, MAX_FRAME_LEN};
#[cfg(feature = "peer")]
pub use peer::{
    NativeEvent, NativePeer, PeerError, PeerState, DEFAULT_RECONNECT_DELAY,
    DEFAULT_REQUEST_TIMEOUT,
};
