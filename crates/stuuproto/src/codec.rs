//! Wire framing for the native-backend socket.
//!
//! Each message is a 4-byte big-endian length prefix followed by that
//! many bytes of MessagePack: a self-describing object graph whose root
//! is always a string-keyed map (see [`crate::message`]). MessagePack is
//! the production format for the same reason the mix daemon chain uses
//! it elsewhere: compact, fast, and decodes to the same recursive
//! null/bool/int/float/string/array/map structure as JSON.
//!
//! Decoding never tears down the stream on a bad body: framing errors
//! are I/O errors, but an undecodable body inside a well-framed message
//! is surfaced as [`Inbound::Malformed`] so the reader can log it and
//! keep draining.

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::message::WireMessage;

/// Upper bound on a single frame body.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("malformed message body: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// One decoded frame: either a message or a well-framed body that failed
/// to decode.
#[derive(Debug)]
pub enum Inbound {
    Message(WireMessage),
    Malformed(ProtoError),
}

/// Length-prefix + MessagePack codec for [`WireMessage`] frames.
pub struct NativeCodec {
    framing: LengthDelimitedCodec,
}

impl NativeCodec {
    pub fn new() -> Self {
        Self {
            framing: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LEN)
                .new_codec(),
        }
    }
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<WireMessage> for NativeCodec {
    type Error = ProtoError;

    fn encode(&mut self, msg: WireMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // to_vec_named keeps struct fields as map keys; positional
        // encoding would break the self-describing contract
        let body = rmp_serde::to_vec_named(&msg)?;
        self.framing
            .encode(Bytes::from(body), dst)
            .map_err(ProtoError::Io)
    }
}

impl Decoder for NativeCodec {
    type Item = Inbound;
    type Error = ProtoError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.framing.decode(src).map_err(ProtoError::Io)? else {
            return Ok(None);
        };
        match rmp_serde::from_slice(&frame) {
            Ok(msg) => Ok(Some(Inbound::Message(msg))),
            Err(e) => Ok(Some(Inbound::Malformed(e.into()))),
        }
    }
}

/// Encode one frame into a standalone byte vector (length prefix
/// included). Handy for stub backends in tests.
pub fn encode_frame(msg: &WireMessage) -> Result<Vec<u8>, ProtoError> {
    let body = rmp_serde::to_vec_named(msg)?;
    let mut out = Vec::with_capacity(body.len() + 4);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::cmd;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn encode_decode_roundtrip() {
        let msg = WireMessage::request(1, cmd::TRANSPORT_PLAY, json!({}));
        let mut codec = NativeCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();

        match codec.decode(&mut buf).unwrap() {
            Some(Inbound::Message(decoded)) => assert_eq!(decoded, msg),
            other => panic!("unexpected decode result: {other:?}"),
        }
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn frame_has_big_endian_length_prefix() {
        let msg = WireMessage::event("transport.tick", json!({"positionBeats": 1.5}));
        let bytes = encode_frame(&msg).unwrap();

        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(len, bytes.len() - 4);

        // the body root is a self-describing map with a type tag
        let root: serde_json::Value = rmp_serde::from_slice(&bytes[4..]).unwrap();
        assert_eq!(root["type"], "event");
        assert_eq!(root["payload"]["positionBeats"], 1.5);
    }

    #[test]
    fn encoder_and_encode_frame_agree() {
        let msg = WireMessage::ok(9, json!({"transport": {"playing": false}}));
        let standalone = encode_frame(&msg).unwrap();

        let mut codec = NativeCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(msg, &mut buf).unwrap();
        assert_eq!(&buf[..], &standalone[..]);
    }

    #[test]
    fn partial_frame_waits_for_more_data() {
        let msg = WireMessage::request(2, cmd::VST_SCAN, json!({}));
        let bytes = encode_frame(&msg).unwrap();

        let mut codec = NativeCodec::new();
        let mut buf = BytesMut::from(&bytes[..bytes.len() - 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&bytes[bytes.len() - 1..]);
        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(Inbound::Message(_))
        ));
    }

    #[test]
    fn malformed_body_does_not_kill_the_stream() {
        let mut buf = BytesMut::new();
        // well-framed garbage, then a valid frame
        buf.extend_from_slice(&4u32.to_be_bytes());
        buf.extend_from_slice(b"\xc1\xc1\xc1\xc1");
        let good = WireMessage::event("transport.state", json!({}));
        buf.extend_from_slice(&encode_frame(&good).unwrap());

        let mut codec = NativeCodec::new();
        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(Inbound::Malformed(_))
        ));
        match codec.decode(&mut buf).unwrap() {
            Some(Inbound::Message(msg)) => assert_eq!(msg, good),
            other => panic!("unexpected decode result: {other:?}"),
        }
    }
}
