//! Internal error taxonomy.
//!
//! These never cross the boundary: the FFI layer turns every error into the
//! neutral value of the call (no-op, zero, `Nothing`, null).

use crate::handle::{Handle, HandleKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("stale {kind} handle {raw:#x}")]
    StaleHandle { kind: &'static str, raw: u64 },

    #[error("handle {0:#x} does not denote a physics body")]
    NotABody(u64),

    #[error("actor {actor:#x} is already bound to entity#{existing}")]
    AlreadyBound { actor: u64, existing: u64 },

    #[error("no bridge context installed on this thread")]
    NoContext,
}

impl BridgeError {
    pub fn stale<K: HandleKind>(handle: Handle<K>) -> Self {
        Self::StaleHandle {
            kind: K::NAME,
            raw: handle.to_raw(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
