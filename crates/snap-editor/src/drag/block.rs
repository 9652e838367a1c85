//! Dragging a block and everything below it.
//!
//! ```text
//! Idle ── start_drag ──▶ Dragging ── end_drag ──▶ Committed | Deleted | Reverted
//!                           │
//!                           └──── revert_drag ──▶ Reverted
//! ```
//!
//! While dragging, the stack moves visually only; its connections stay
//! where the index had them at drag start and every query offsets them by
//! the drag delta. They are written back once, when the drag ends.

use super::{
    DragContext, DragOutcome, DragState, DragStrategy, GroupToken, drop_on, exit_target, finish,
    prevents_move, update_drag_target, would_delete,
};
use crate::candidate::{DragCandidate, DragCandidateFinder, LocalConnections, local_connections};
use crate::effects::{EffectKind, EffectTarget};
use crate::error::{DragError, Result};
use crate::preview::{PreviewController, PreviewState, PreviewStats};
use kurbo::{Point, Vec2};
use snap_core::{
    BlockId, ComponentId, ConnectionId, ConnectionKind, Dragged, EventKind, MoveReason, SnapError,
    Workspace,
};

/// What the pointer grabbed. Shadows never move on their own: grabbing
/// one drags the nearest real ancestor, and the shadow rides along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragSubject {
    Block(BlockId),
    Shadow { shadow: BlockId, parent: BlockId },
}

impl DragSubject {
    pub fn resolve(ws: &Workspace, id: BlockId) -> Self {
        if !ws.block(id).is_some_and(|b| b.shadow) {
            return DragSubject::Block(id);
        }
        let mut current = ws.parent(id);
        while let Some(p) = current {
            if ws.block(p).is_some_and(|b| !b.shadow) {
                return DragSubject::Shadow { shadow: id, parent: p };
            }
            current = ws.parent(p);
        }
        DragSubject::Block(id)
    }

    /// The block that actually moves.
    pub fn block(&self) -> BlockId {
        match *self {
            DragSubject::Block(id) => id,
            DragSubject::Shadow { parent, .. } => parent,
        }
    }
}

#[derive(Debug)]
struct Session {
    start_xy: Point,
    finder: DragCandidateFinder,
    preview: PreviewController,
    locals: LocalConnections,
    would_delete: bool,
    start_parent_conn: Option<ConnectionId>,
    start_child_conn: Option<ConnectionId>,
    group: GroupToken,
    drag_target: Option<ComponentId>,
}

#[derive(Debug)]
pub struct BlockDragStrategy {
    subject: DragSubject,
    state: DragState,
    session: Option<Session>,
    last_stats: PreviewStats,
}

impl BlockDragStrategy {
    pub fn new(ws: &Workspace, id: BlockId) -> Self {
        Self {
            subject: DragSubject::resolve(ws, id),
            state: DragState::Idle,
            session: None,
            last_stats: PreviewStats::default(),
        }
    }

    pub fn subject(&self) -> DragSubject {
        self.subject
    }

    /// The candidate a drop right now would connect.
    pub fn candidate(&self) -> Option<&DragCandidate> {
        self.session.as_ref()?.preview.active()
    }

    pub fn would_delete(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.would_delete)
    }

    pub fn preview_state(&self) -> PreviewState {
        self.session
            .as_ref()
            .map_or(PreviewState::None, |s| s.preview.state())
    }

    /// Preview churn so far; after the drag ends, the final tally.
    pub fn preview_stats(&self) -> PreviewStats {
        self.session
            .as_ref()
            .map_or(self.last_stats, |s| s.preview.stats())
    }

    pub fn markers(&self) -> Vec<BlockId> {
        self.session
            .as_ref()
            .map(|s| s.preview.markers().to_vec())
            .unwrap_or_default()
    }

    pub fn start_parent_conn(&self) -> Option<ConnectionId> {
        self.session.as_ref()?.start_parent_conn
    }

    pub fn start_child_conn(&self) -> Option<ConnectionId> {
        self.session.as_ref()?.start_child_conn
    }

    fn dragged(ws: &Workspace, top: BlockId) -> Dragged {
        Dragged::Block {
            id: top,
            deletable: ws.block(top).is_some_and(|b| b.deletable && !b.shadow),
        }
    }

    /// Fire the drag end marker and write the stack's connections back.
    fn settle(ws: &mut Workspace, top: BlockId) -> Result<()> {
        ws.events.fire(EventKind::BlockDrag {
            block: top,
            starting: false,
            descendants: ws.descendants(top),
        });
        Self::release_stack(ws, top)
    }

    /// Clear the drag flags on the stack and re-index its connections.
    fn release_stack(ws: &mut Workspace, top: BlockId) -> Result<()> {
        ws.set_dragging(false);
        if !ws.contains_block(top) {
            return Ok(());
        }
        for id in ws.descendants(top) {
            if let Some(b) = ws.block_mut(id) {
                b.dragging = false;
            }
        }
        ws.sync_stack_connections(top)?;
        Ok(())
    }

    /// Put the block back: reconnect what was detached at drag start, or
    /// return to the start position.
    fn move_to_original(ws: &mut Workspace, top: BlockId, session: &Session) -> Result<()> {
        if let Some(child) = session.start_child_conn
            && let Some(next) = ws.try_block(top)?.next
            && let Err(e) = ws.connect(child, next)
        {
            log::warn!("could not re-attach the healed tail of {top}: {e}");
        }
        if let Some(parent) = session.start_parent_conn {
            let block = ws.try_block(top)?;
            let plug = match ws.connection(parent).map(|c| c.kind) {
                Some(ConnectionKind::Input) => block.output,
                Some(ConnectionKind::NextStatement) => block.previous,
                _ => None,
            };
            match plug.map(|plug| ws.connect(parent, plug)) {
                Some(Ok(())) => return Ok(()),
                Some(Err(e)) => log::warn!("could not re-attach {top} to its parent: {e}"),
                None => log::warn!("{top} has no plug for its old parent {parent}"),
            }
        }
        ws.move_to(top, session.start_xy, MoveReason::Revert)?;
        ws.bump_block_into_bounds(top)?;
        Ok(())
    }

    /// Drop in place: connect to the candidate or settle unconnected.
    fn place(
        ctx: &mut DragContext<'_>,
        top: BlockId,
        session: &Session,
        candidate: Option<DragCandidate>,
    ) -> Result<DragOutcome> {
        let ws = &mut *ctx.ws;
        let new_xy = ws.try_block(top)?.xy;
        ws.events.fire(EventKind::BlockMove {
            block: top,
            old_parent: None,
            new_parent: None,
            old_xy: session.start_xy,
            new_xy,
            reason: MoveReason::Drag,
        });

        if let Some(DragCandidate { local, neighbour, .. }) = candidate {
            let Some(superior) = ws.connection(local).map(|c| c.is_superior()) else {
                return Err(DragError::MissingLocal(local));
            };
            match ws.connect(local, neighbour) {
                Ok(()) => {
                    let inferior = if superior { neighbour } else { local };
                    let at = ws.connection_location(inferior)?;
                    ctx.effects
                        .play(EffectKind::Ripple, EffectTarget::Point(at), ws.scale);
                    ws.bring_to_front(top);
                    return Ok(DragOutcome::Committed {
                        connected: Some((local, neighbour)),
                    });
                }
                Err(SnapError::Rejected { reason, .. }) => {
                    log::warn!("drop candidate {local} -> {neighbour} went stale: {reason}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        ws.bump_block_into_bounds(top)?;
        ws.bump_neighbours(top)?;
        Ok(DragOutcome::Committed { connected: None })
    }

    /// Detach the stack and mark it as dragging. Undone by the caller on
    /// failure.
    fn begin(ctx: &mut DragContext<'_>, top: BlockId, heal: bool, group: GroupToken) -> Result<Session> {
        let ws = &mut *ctx.ws;
        let start_xy = ws.try_block(top)?.xy;
        let descendants = ws.descendants(top);
        ws.events.fire(EventKind::BlockDrag {
            block: top,
            starting: true,
            descendants,
        });
        ws.set_resizes_enabled(false)?;
        ctx.effects.cancel_all();

        let block = ws.try_block(top)?;
        let (output, previous, next) = (block.output, block.previous, block.next);
        let target_of = |c: Option<ConnectionId>| c.and_then(|c| ws.connection(c)?.target);
        let mut start_parent_conn = None;
        let mut start_child_conn = None;
        if ws.parent(top).is_some() || (heal && ws.next_block(top).is_some()) {
            start_parent_conn = target_of(output).or_else(|| target_of(previous));
            if heal {
                start_child_conn = target_of(next);
            }
            ws.unplug(top, heal)?;
            ctx.effects
                .play(EffectKind::Wobble, EffectTarget::Block(top), ws.scale);
        }
        ws.bring_to_front(top);
        ws.set_dragging(true);
        for id in ws.descendants(top) {
            if let Some(b) = ws.block_mut(id) {
                b.dragging = true;
            }
        }

        let config = ws.config;
        Ok(Session {
            start_xy,
            finder: DragCandidateFinder::new(&config),
            preview: PreviewController::new(top, last_on_stack(ws, top)),
            locals: local_connections(ws, top),
            would_delete: false,
            start_parent_conn,
            start_child_conn,
            group,
            drag_target: None,
        })
    }

    /// Drop the stack: delete it, send it back, or place it.
    fn drop_stack(ctx: &mut DragContext<'_>, top: BlockId, session: &mut Session) -> Result<DragOutcome> {
        let candidate = session.preview.commit(ctx.ws)?;
        // Hidden markers still sit in the index; nothing may bump off them.
        session.preview.dispose(ctx.ws)?;

        let dragged = Self::dragged(ctx.ws, top);
        let prevent = prevents_move(ctx.ws, session.drag_target, &dragged);
        drop_on(ctx.ws, session.drag_target, &dragged);
        Self::settle(ctx.ws, top)?;

        if session.would_delete {
            let ws = &mut *ctx.ws;
            let new_xy = ws.try_block(top)?.xy;
            ws.events.fire(EventKind::BlockMove {
                block: top,
                old_parent: None,
                new_parent: None,
                old_xy: session.start_xy,
                new_xy,
                reason: MoveReason::Drag,
            });
            if let Some(rect) = ws.stack_bounds(top) {
                ctx.effects
                    .play(EffectKind::Shrink, EffectTarget::Rect(rect), ws.scale);
            }
            ws.dispose_block(top, false)?;
            log::debug!("{top} dropped on a delete area");
            Ok(DragOutcome::Deleted)
        } else if prevent {
            Self::move_to_original(ctx.ws, top, session)?;
            Ok(DragOutcome::Reverted)
        } else {
            Self::place(ctx, top, session, candidate)
        }
    }

    fn revert_stack(ws: &mut Workspace, top: BlockId, session: &mut Session) -> Result<DragOutcome> {
        session.preview.revert(ws)?;
        session.preview.dispose(ws)?;
        let dragged = Self::dragged(ws, top);
        exit_target(ws, session.drag_target, &dragged);
        Self::settle(ws, top)?;
        Self::move_to_original(ws, top, session)?;
        log::debug!("drag of {top} reverted");
        Ok(DragOutcome::Reverted)
    }

    /// Session teardown. Runs whether or not the drop itself succeeded, so
    /// a failed drop still leaves no markers, no open group and layout
    /// work resumed.
    fn conclude(
        &mut self,
        ws: &mut Workspace,
        top: BlockId,
        mut session: Session,
        result: Result<DragOutcome>,
    ) -> Result<DragOutcome> {
        let disposed = session.preview.dispose(ws);
        self.last_stats = session.preview.stats();
        if result.is_err()
            && let Err(e) = Self::release_stack(ws, top)
        {
            log::warn!("could not release {top} after a failed drop: {e}");
        }
        let finished = finish(ws, session.group);
        match (result, disposed, finished) {
            (Ok(outcome), Ok(()), Ok(())) => {
                self.state = match outcome {
                    DragOutcome::Committed { .. } => DragState::Committed,
                    DragOutcome::Deleted => DragState::Deleted,
                    DragOutcome::Reverted => DragState::Reverted,
                };
                Ok(outcome)
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                self.state = DragState::Idle;
                Err(e)
            }
        }
    }
}

/// Tail connection of the stack when it is not the top block's own.
fn last_on_stack(ws: &Workspace, top: BlockId) -> Option<ConnectionId> {
    let last = ws.last_connection_in_stack(top, true)?;
    (Some(last) != ws.block(top)?.next).then_some(last)
}

impl DragStrategy for BlockDragStrategy {
    fn is_movable(&self, ws: &Workspace) -> bool {
        let id = match self.subject {
            DragSubject::Block(id) => id,
            DragSubject::Shadow { parent, .. } => parent,
        };
        ws.block(id)
            .is_some_and(|b| b.movable && !b.shadow && !b.insertion_marker)
    }

    fn location(&self, ws: &Workspace) -> Option<Point> {
        ws.block(self.subject.block()).map(|b| b.xy)
    }

    fn state(&self) -> DragState {
        self.state
    }

    fn start_drag(&mut self, ctx: &mut DragContext<'_>, heal: bool) -> Result<()> {
        if self.session.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        let top = match self.subject {
            DragSubject::Block(id) => id,
            DragSubject::Shadow { shadow, parent } => {
                log::debug!("shadow {shadow} hands its drag to {parent}");
                parent
            }
        };
        if !self.is_movable(ctx.ws) {
            return Err(DragError::NotDraggable(top));
        }

        let group = GroupToken::acquire(ctx.ws);
        let session = match Self::begin(ctx, top, heal, group) {
            Ok(session) => session,
            Err(e) => {
                if let Err(re) = Self::release_stack(ctx.ws, top) {
                    log::warn!("could not release {top} after a failed start: {re}");
                }
                if let Err(fe) = finish(ctx.ws, group) {
                    log::warn!("could not close the drag of {top}: {fe}");
                }
                return Err(e);
            }
        };
        log::debug!("drag of {top} started at {:?}", session.start_xy);
        self.session = Some(session);
        self.state = DragState::Dragging;
        Ok(())
    }

    fn drag(&mut self, ctx: &mut DragContext<'_>, delta: Vec2, target: Option<ComponentId>) -> Result<()> {
        let top = self.subject.block();
        let delta = ctx.to_workspace_units(delta);
        let Some(session) = self.session.as_mut() else {
            return Err(DragError::NotDragging);
        };
        let ws = &mut *ctx.ws;
        ws.move_during_drag(top, session.start_xy + delta)?;

        let dragged = Self::dragged(ws, top);
        update_drag_target(ws, &mut session.drag_target, target, &dragged);

        // The stack can change shape mid-drag (a listener adding inputs,
        // say), but not while a marker is plugged in on its behalf.
        if !session.preview.marker_connected(ws) {
            session.locals = local_connections(ws, top);
            session.preview.set_last_on_stack(last_on_stack(ws, top));
        }
        let candidate = session
            .finder
            .find_best_candidate(ws, &session.locals, delta, session.preview.active());
        session.would_delete = would_delete(ws, target, &dragged, candidate.is_some());
        session
            .preview
            .update(ws, ctx.renderer, candidate, session.would_delete)
    }

    fn end_drag(&mut self, ctx: &mut DragContext<'_>, delta: Vec2, target: Option<ComponentId>) -> Result<DragOutcome> {
        let stepped = self.drag(ctx, delta, target);
        let top = self.subject.block();
        let Some(mut session) = self.session.take() else {
            return Err(DragError::NotDragging);
        };
        ctx.effects.cancel(EffectKind::Wobble);
        let result = stepped.and_then(|()| Self::drop_stack(ctx, top, &mut session));
        self.conclude(ctx.ws, top, session, result)
    }

    fn revert_drag(&mut self, ctx: &mut DragContext<'_>) -> Result<DragOutcome> {
        let top = self.subject.block();
        let Some(mut session) = self.session.take() else {
            return Err(DragError::NotDragging);
        };
        ctx.effects.cancel(EffectKind::Wobble);
        let result = Self::revert_stack(ctx.ws, top, &mut session);
        self.conclude(ctx.ws, top, session, result)
    }
}
