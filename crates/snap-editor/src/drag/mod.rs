//! Drag strategies.
//!
//! A strategy owns one drag session from `start_drag` to `end_drag` or
//! `revert_drag`. The workspace, the renderer and the effect scheduler are
//! handed in through a [`DragContext`] on every call rather than held, so
//! a session never outlives the borrow of the editor that drives it.
//!
//! Deltas are in screen pixels, measured from where the drag started.

mod block;
mod item;

pub use block::{BlockDragStrategy, DragSubject};
pub use item::ItemDragStrategy;

use crate::effects::EffectScheduler;
use crate::error::Result;
use kurbo::{Point, Vec2};
use snap_core::{Capability, ComponentId, ConnectionId, Dragged, GroupId, Workspace};
use snap_render::Renderer;

/// Everything a drag step may touch.
pub struct DragContext<'a> {
    pub ws: &'a mut Workspace,
    pub renderer: &'a dyn Renderer,
    pub effects: &'a mut EffectScheduler,
}

impl<'a> DragContext<'a> {
    pub fn new(ws: &'a mut Workspace, renderer: &'a dyn Renderer, effects: &'a mut EffectScheduler) -> Self {
        Self {
            ws,
            renderer,
            effects,
        }
    }

    /// Pixel delta to workspace units.
    pub fn to_workspace_units(&self, delta: Vec2) -> Vec2 {
        if self.ws.scale > 0.0 {
            delta / self.ws.scale
        } else {
            delta
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
    Committed,
    Deleted,
    Reverted,
}

/// How a drag ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// Dropped in place, connected to `connected` if a candidate existed.
    Committed {
        connected: Option<(ConnectionId, ConnectionId)>,
    },
    Deleted,
    /// Back where it started: cancelled, or refused by the drop target.
    Reverted,
}

/// Event group bookkeeping: a drag reuses an open group and only closes
/// the one it opened itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GroupToken {
    pub group: GroupId,
    pub opened: bool,
}

impl GroupToken {
    pub(crate) fn acquire(ws: &mut Workspace) -> Self {
        match ws.events.group() {
            Some(group) => Self { group, opened: false },
            None => Self {
                group: ws.events.open_group(),
                opened: true,
            },
        }
    }

    pub(crate) fn release(self, ws: &mut Workspace) {
        if self.opened && ws.events.group() == Some(self.group) {
            ws.events.set_group(None);
        }
    }
}

// ─── Drag targets ────────────────────────────────────────────────────────

/// Fire exit/enter when the target under the pointer changes, then over.
pub(crate) fn update_drag_target(
    ws: &mut Workspace,
    current: &mut Option<ComponentId>,
    new: Option<ComponentId>,
    dragged: &Dragged,
) {
    if *current != new {
        if let Some(old) = *current
            && let Some(t) = ws.components.drag_target_mut(old)
        {
            t.on_drag_exit(dragged);
        }
        if let Some(id) = new
            && let Some(t) = ws.components.drag_target_mut(id)
        {
            t.on_drag_enter(dragged);
        }
    }
    if let Some(id) = new
        && let Some(t) = ws.components.drag_target_mut(id)
    {
        t.on_drag_over(dragged);
    }
    *current = new;
}

/// Whether dropping on `target` right now would delete `dragged`.
pub(crate) fn would_delete(
    ws: &mut Workspace,
    target: Option<ComponentId>,
    dragged: &Dragged,
    could_connect: bool,
) -> bool {
    let Some(id) = target else {
        return false;
    };
    if !dragged.is_deletable() || !ws.components.has_capability(id, Capability::DeleteArea) {
        return false;
    }
    ws.components
        .delete_area_mut(id)
        .is_some_and(|area| area.would_delete(dragged, could_connect))
}

pub(crate) fn prevents_move(ws: &Workspace, target: Option<ComponentId>, dragged: &Dragged) -> bool {
    target
        .and_then(|id| ws.components.drag_target(id))
        .is_some_and(|t| t.should_prevent_move(dragged))
}

pub(crate) fn drop_on(ws: &mut Workspace, target: Option<ComponentId>, dragged: &Dragged) {
    if let Some(id) = target
        && let Some(t) = ws.components.drag_target_mut(id)
    {
        t.on_drop(dragged);
    }
}

pub(crate) fn exit_target(ws: &mut Workspace, target: Option<ComponentId>, dragged: &Dragged) {
    if let Some(id) = target
        && let Some(t) = ws.components.drag_target_mut(id)
    {
        t.on_drag_exit(dragged);
    }
}

/// Drag bookkeeping shared by every strategy's last step: bumps queued
/// during the drag run, layout work resumes and the group closes. All
/// three happen even when one of them fails.
pub(crate) fn finish(ws: &mut Workspace, group: GroupToken) -> Result<()> {
    ws.set_dragging(false);
    let flushed = ws.flush_pending_bumps();
    let resumed = ws.set_resizes_enabled(true);
    group.release(ws);
    flushed?;
    resumed?;
    Ok(())
}

/// Something the pointer can pick up and move.
pub trait DragStrategy {
    fn is_movable(&self, ws: &Workspace) -> bool;

    /// Current position in workspace units.
    fn location(&self, ws: &Workspace) -> Option<Point>;

    fn state(&self) -> DragState;

    /// `heal` keeps the blocks below the dragged one behind.
    fn start_drag(&mut self, ctx: &mut DragContext<'_>, heal: bool) -> Result<()>;

    /// One pointer move. `target` is the drag target under the pointer.
    fn drag(&mut self, ctx: &mut DragContext<'_>, delta: Vec2, target: Option<ComponentId>) -> Result<()>;

    fn end_drag(&mut self, ctx: &mut DragContext<'_>, delta: Vec2, target: Option<ComponentId>) -> Result<DragOutcome>;

    /// Cancel. Safe at any point after `start_drag`.
    fn revert_drag(&mut self, ctx: &mut DragContext<'_>) -> Result<DragOutcome>;
}
