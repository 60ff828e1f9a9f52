//! Error taxonomy for mutation commands.
//!
//! Every command resolves to exactly one ack: `{ok: true, ...}` or
//! `{ok: false, error}`. The variants here only matter for choosing the
//! message; none of them crash the engine, and a failed command never
//! leaves a partial mutation behind.

use thiserror::Error;

use crate::persistence::StoreError;
use stuuproto::PeerError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Input violates the command contract (missing field, out-of-range
    /// value, duplicate id, unsupported format).
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The backend round trip failed (timeout, disconnect, or an
    /// explicit backend error).
    #[error(transparent)]
    Backend(#[from] PeerError),

    /// A load or save failed.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
