//! Error types for the block/connection model.
//!
//! Only structural failures live here. A connection that is merely
//! incompatible is reported as a [`Rejection`](crate::checker::Rejection)
//! and never surfaces as an error during a drag.

use crate::checker::Rejection;
use crate::id::{BlockId, ConnectionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapError {
    #[error("block {0} does not exist")]
    UnknownBlock(BlockId),

    #[error("connection {0} does not exist")]
    UnknownConnection(ConnectionId),

    #[error("block {0} already exists")]
    DuplicateBlock(BlockId),

    #[error("cannot connect {a} to {b}: {reason}")]
    Rejected {
        a: ConnectionId,
        b: ConnectionId,
        reason: Rejection,
    },

    #[error("connection {0} is not connected")]
    NotConnected(ConnectionId),

    /// `a.target == b` but `b.target != a`. The graph is corrupt.
    #[error("partner pointers of {a} and {b} are asymmetric")]
    AsymmetricPartners { a: ConnectionId, b: ConnectionId },

    #[error("connection index for {kind} is unsorted at position {at}")]
    IndexUnsorted { kind: &'static str, at: usize },

    #[error("connection {0} is not present in its index")]
    NotIndexed(ConnectionId),

    #[error("shadow template for {0} has no connection matching its slot")]
    BadShadowTemplate(ConnectionId),
}

pub type Result<T, E = SnapError> = std::result::Result<T, E>;
