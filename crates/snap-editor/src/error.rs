//! Errors raised by drag sessions.
//!
//! A drop that finds nothing to connect to is not an error. These are the
//! states a correct caller can never reach, plus structural failures
//! bubbling up from the workspace.

use snap_core::{BlockId, ConnectionId, ItemId, SnapError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DragError {
    #[error(transparent)]
    Snap(#[from] SnapError),

    #[error("no drag is in progress")]
    NotDragging,

    #[error("a drag is already in progress")]
    AlreadyDragging,

    #[error("block {0} cannot be dragged")]
    NotDraggable(BlockId),

    #[error("item {0} cannot be dragged")]
    ItemNotDraggable(ItemId),

    /// The candidate kept for the drop refers to a local connection that
    /// no longer exists.
    #[error("drop candidate lost its local connection {0}")]
    MissingLocal(ConnectionId),

    #[error("insertion marker {0} was never created")]
    UnknownMarker(BlockId),

    #[error("insertion marker connection {0} is still connected after teardown")]
    StaleMarker(ConnectionId),
}

pub type Result<T, E = DragError> = std::result::Result<T, E>;
