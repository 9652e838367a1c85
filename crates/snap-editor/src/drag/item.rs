//! Dragging a workspace comment or a bubble. No connections, no previews:
//! the item follows the pointer and may be dropped on a delete area.

use super::{
    DragContext, DragOutcome, DragState, DragStrategy, GroupToken, drop_on, exit_target, finish,
    prevents_move, update_drag_target, would_delete,
};
use crate::error::{DragError, Result};
use kurbo::{Point, Vec2};
use snap_core::{ComponentId, Dragged, EventKind, ItemId, Workspace};

#[derive(Debug)]
struct Session {
    start_xy: Point,
    group: GroupToken,
    drag_target: Option<ComponentId>,
    would_delete: bool,
}

#[derive(Debug)]
pub struct ItemDragStrategy {
    item: ItemId,
    state: DragState,
    session: Option<Session>,
}

impl ItemDragStrategy {
    pub fn new(item: ItemId) -> Self {
        Self {
            item,
            state: DragState::Idle,
            session: None,
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn would_delete(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.would_delete)
    }

    fn dragged(&self, ws: &Workspace) -> Dragged {
        Dragged::Item {
            id: self.item,
            deletable: ws.item(self.item).is_some_and(|i| i.deletable),
        }
    }

    fn set_xy(ws: &mut Workspace, item: ItemId, xy: Point) {
        if let Some(i) = ws.item_mut(item) {
            i.xy = xy;
        }
    }

    fn settle(ws: &mut Workspace, item: ItemId) {
        if let Some(i) = ws.item_mut(item) {
            i.dragging = false;
        }
    }

    fn conclude(&mut self, ws: &mut Workspace, session: Session, outcome: DragOutcome) -> Result<DragOutcome> {
        finish(ws, session.group)?;
        self.state = match outcome {
            DragOutcome::Committed { .. } => DragState::Committed,
            DragOutcome::Deleted => DragState::Deleted,
            DragOutcome::Reverted => DragState::Reverted,
        };
        Ok(outcome)
    }
}

impl DragStrategy for ItemDragStrategy {
    fn is_movable(&self, ws: &Workspace) -> bool {
        ws.item(self.item).is_some_and(|i| i.movable)
    }

    fn location(&self, ws: &Workspace) -> Option<Point> {
        ws.item(self.item).map(|i| i.xy)
    }

    fn state(&self) -> DragState {
        self.state
    }

    fn start_drag(&mut self, ctx: &mut DragContext<'_>, _heal: bool) -> Result<()> {
        if self.session.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        if !self.is_movable(ctx.ws) {
            return Err(DragError::ItemNotDraggable(self.item));
        }
        let ws = &mut *ctx.ws;
        let Some(item) = ws.item_mut(self.item) else {
            return Err(DragError::ItemNotDraggable(self.item));
        };
        item.dragging = true;
        let start_xy = item.xy;
        let group = GroupToken::acquire(ws);
        ws.set_dragging(true);
        ctx.effects.cancel_all();
        if let Err(e) = ws.set_resizes_enabled(false) {
            Self::settle(ws, self.item);
            finish(ws, group)?;
            return Err(e.into());
        }
        self.session = Some(Session {
            start_xy,
            group,
            drag_target: None,
            would_delete: false,
        });
        self.state = DragState::Dragging;
        Ok(())
    }

    fn drag(&mut self, ctx: &mut DragContext<'_>, delta: Vec2, target: Option<ComponentId>) -> Result<()> {
        let delta = ctx.to_workspace_units(delta);
        let dragged = self.dragged(ctx.ws);
        let Some(session) = self.session.as_mut() else {
            return Err(DragError::NotDragging);
        };
        Self::set_xy(ctx.ws, self.item, session.start_xy + delta);
        update_drag_target(ctx.ws, &mut session.drag_target, target, &dragged);
        session.would_delete = would_delete(ctx.ws, target, &dragged, false);
        Ok(())
    }

    fn end_drag(&mut self, ctx: &mut DragContext<'_>, delta: Vec2, target: Option<ComponentId>) -> Result<DragOutcome> {
        self.drag(ctx, delta, target)?;
        let dragged = self.dragged(ctx.ws);
        let Some(session) = self.session.take() else {
            return Err(DragError::NotDragging);
        };
        let prevent = prevents_move(ctx.ws, session.drag_target, &dragged);
        drop_on(ctx.ws, session.drag_target, &dragged);
        Self::settle(ctx.ws, self.item);

        let outcome = if session.would_delete {
            ctx.ws.dispose_item(self.item);
            DragOutcome::Deleted
        } else if prevent {
            Self::set_xy(ctx.ws, self.item, session.start_xy);
            DragOutcome::Reverted
        } else {
            let new_xy = self.location(ctx.ws).unwrap_or(session.start_xy);
            ctx.ws.events.fire(EventKind::ItemMove {
                item: self.item,
                old_xy: session.start_xy,
                new_xy,
            });
            DragOutcome::Committed { connected: None }
        };
        self.conclude(ctx.ws, session, outcome)
    }

    fn revert_drag(&mut self, ctx: &mut DragContext<'_>) -> Result<DragOutcome> {
        let dragged = self.dragged(ctx.ws);
        let Some(session) = self.session.take() else {
            return Err(DragError::NotDragging);
        };
        exit_target(ctx.ws, session.drag_target, &dragged);
        Self::settle(ctx.ws, self.item);
        Self::set_xy(ctx.ws, self.item, session.start_xy);
        self.conclude(ctx.ws, session, DragOutcome::Reverted)
    }
}
