//! Workspace change events and undo grouping.
//!
//! Every structural mutation fires an [`Event`] stamped with the currently
//! open [`GroupId`]. An undo layer replays a whole group as one step, so a
//! drag opens one group at start and closes it at the end.
//!
//! The bus can be disabled (nesting counter) while internal bookkeeping
//! such as insertion-marker churn runs; events fired while disabled are
//! dropped.

use crate::id::{BlockId, ItemId};
use kurbo::Point;
use serde::Serialize;
use std::fmt;

/// Token shared by all events of one undoable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GroupId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveReason {
    Drag,
    Connect,
    Disconnect,
    Bump,
    Revert,
    Programmatic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    BlockCreate {
        block: BlockId,
        descendants: Vec<BlockId>,
    },
    BlockDelete {
        block: BlockId,
        descendants: Vec<BlockId>,
    },
    BlockMove {
        block: BlockId,
        old_parent: Option<BlockId>,
        new_parent: Option<BlockId>,
        old_xy: Point,
        new_xy: Point,
        reason: MoveReason,
    },
    BlockDrag {
        block: BlockId,
        starting: bool,
        descendants: Vec<BlockId>,
    },
    ItemMove {
        item: ItemId,
        old_xy: Point,
        new_xy: Point,
    },
    ItemDelete {
        item: ItemId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub group: Option<GroupId>,
    #[serde(flatten)]
    pub kind: EventKind,
}

type Listener = Box<dyn FnMut(&Event)>;

#[derive(Default)]
pub struct EventBus {
    group: Option<GroupId>,
    next_group: u64,
    disabled: u32,
    fired: Vec<Event>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("group", &self.group)
            .field("disabled", &self.disabled)
            .field("fired", &self.fired.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and broadcast an event, unless the bus is disabled.
    pub fn fire(&mut self, kind: EventKind) {
        if self.disabled > 0 {
            return;
        }
        let event = Event {
            group: self.group,
            kind,
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
        self.fired.push(event);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Open a fresh group and make it current.
    pub fn open_group(&mut self) -> GroupId {
        self.next_group += 1;
        let id = GroupId(self.next_group);
        self.group = Some(id);
        id
    }

    /// Replace the current group. `None` closes it.
    pub fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }

    pub fn disable(&mut self) {
        self.disabled += 1;
    }

    pub fn enable(&mut self) {
        self.disabled = self.disabled.saturating_sub(1);
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled == 0
    }

    /// Everything fired so far.
    pub fn fired(&self) -> &[Event] {
        &self.fired
    }

    /// Take the fired log, leaving it empty.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.fired)
    }
}
