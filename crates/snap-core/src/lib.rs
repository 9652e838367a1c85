pub mod bump;
pub mod checker;
pub mod components;
pub mod config;
pub mod connection;
pub mod connection_db;
pub mod error;
pub mod events;
pub mod id;
pub mod model;
pub mod workspace;

pub use checker::{ConnectionChecker, Rejection};
pub use components::{
    AutoHideable, Capability, Component, ComponentRegistry, DeleteArea, DragTarget, Dragged,
};
pub use config::SnapConfig;
pub use connection_db::ConnectionIndex;
pub use error::{Result, SnapError};
pub use events::{Event, EventBus, EventKind, GroupId, MoveReason};
pub use id::{BlockId, ComponentId, ConnectionId, ItemId, TypeTag};
pub use model::*;
pub use workspace::{FloatingItem, ItemKind, Workspace};

// Re-export kurbo geometry so downstream crates share one version.
pub use kurbo::{Point, Rect, Size, Vec2};
