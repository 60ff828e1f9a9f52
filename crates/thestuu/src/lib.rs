//! thestuu - the orchestration core of the TheStuu DAW.
//!
//! Owns the project model, serializes every mutation through one engine
//! task, keeps the transport clock in sync with the native audio
//! backend (or a local fallback), and serves interactive clients over a
//! WebSocket gateway.

pub mod clock;
pub mod engine;
pub mod events;
pub mod gateway;
pub mod persistence;
