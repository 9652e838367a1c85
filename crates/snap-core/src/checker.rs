//! Connection compatibility rules.
//!
//! A pair is compatible when it passes the safety rules (kind pairing,
//! no self or cyclic links, shadow rules), the type checks, and, during a
//! drag, the drag rules that stop a preview from stealing or splitting
//! stacks in surprising ways.

use crate::id::ConnectionId;
use crate::model::{Connection, ConnectionKind};
use crate::workspace::Workspace;
use thiserror::Error;

/// Why a pair of connections may not be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("connection no longer exists")]
    Missing,
    #[error("both connections belong to the same block")]
    SelfConnection,
    #[error("connection kinds do not pair")]
    WrongType,
    #[error("type checks have no type in common")]
    ChecksFailed,
    #[error("a shadow block cannot receive a non-shadow child")]
    ShadowParent,
    #[error("a block cannot be plugged by output and previous at once")]
    PreviousAndOutput,
    #[error("the link would make a block its own ancestor")]
    Cycle,
    #[error("drag rules forbid this link")]
    DragChecksFailed,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectionChecker;

impl ConnectionChecker {
    pub fn can_connect(
        &self,
        ws: &Workspace,
        a: ConnectionId,
        b: ConnectionId,
        is_drag: bool,
    ) -> bool {
        self.check(ws, a, b, is_drag).is_ok()
    }

    /// Full compatibility check of `a` (the local side) against `b`.
    pub fn check(
        &self,
        ws: &Workspace,
        a: ConnectionId,
        b: ConnectionId,
        is_drag: bool,
    ) -> Result<(), Rejection> {
        let (Some(ca), Some(cb)) = (ws.connection(a), ws.connection(b)) else {
            return Err(Rejection::Missing);
        };
        self.safety(ws, ca, cb)?;
        if !Self::type_checks(ca, cb) {
            return Err(Rejection::ChecksFailed);
        }
        if is_drag && !self.drag_checks(ws, ca, cb) {
            return Err(Rejection::DragChecksFailed);
        }
        Ok(())
    }

    /// Structural rules that hold for every link, dragged or not.
    pub fn safety(&self, ws: &Workspace, a: &Connection, b: &Connection) -> Result<(), Rejection> {
        if a.owner == b.owner {
            return Err(Rejection::SelfConnection);
        }
        if a.kind.opposite() != b.kind {
            return Err(Rejection::WrongType);
        }
        let (sup, inf) = if a.is_superior() { (a, b) } else { (b, a) };
        let (Some(sup_block), Some(inf_block)) = (ws.block(sup.owner), ws.block(inf.owner)) else {
            return Err(Rejection::Missing);
        };
        if sup_block.shadow && !inf_block.shadow {
            return Err(Rejection::ShadowParent);
        }
        let other_plug = match inf.kind {
            ConnectionKind::Output => inf_block.previous,
            ConnectionKind::PreviousStatement => inf_block.output,
            _ => None,
        };
        if other_plug
            .and_then(|c| ws.connection(c))
            .is_some_and(Connection::is_connected)
        {
            return Err(Rejection::PreviousAndOutput);
        }
        if ws.is_ancestor_of(inf.owner, sup.owner) {
            return Err(Rejection::Cycle);
        }
        Ok(())
    }

    /// `None` accepts anything; otherwise the two sets must intersect.
    pub fn type_checks(a: &Connection, b: &Connection) -> bool {
        match (&a.checks, &b.checks) {
            (Some(ca), Some(cb)) => ca.iter().any(|t| cb.contains(t)),
            _ => true,
        }
    }

    /// Extra rules applied while a block is being dragged. `a` belongs to
    /// the dragged stack, `b` is the stationary candidate.
    pub fn drag_checks(&self, ws: &Workspace, a: &Connection, b: &Connection) -> bool {
        let Some(b_block) = ws.block(b.owner) else {
            return false;
        };
        if b_block.insertion_marker {
            return false;
        }
        // Connections of the dragged stack itself.
        if ws.root_of(a.owner) == ws.root_of(b.owner) {
            return false;
        }
        let b_target = ws.target_block(b.id).and_then(|t| ws.block(t));
        match b.kind {
            ConnectionKind::PreviousStatement => self.can_connect_to_previous(ws, a, b),
            ConnectionKind::Output => {
                let stolen = b_target.is_some_and(|t| !t.insertion_marker);
                !stolen && !a.is_connected()
            }
            ConnectionKind::Input => {
                !b_target.is_some_and(|t| !t.movable && !t.shadow)
            }
            ConnectionKind::NextStatement => {
                let a_has_next = ws.block(a.owner).is_some_and(|blk| blk.next.is_some());
                !b_target.is_some_and(|t| !a_has_next && !t.shadow && t.next.is_some())
            }
        }
    }

    /// A dragged next connection may only slot above a free previous,
    /// or above an insertion marker that is not itself attached below
    /// something.
    fn can_connect_to_previous(&self, ws: &Workspace, a: &Connection, b: &Connection) -> bool {
        if a.is_connected() {
            return false;
        }
        let Some(target) = ws.target_block(b.id) else {
            return true;
        };
        match ws.block(target) {
            Some(t) if t.insertion_marker => ws.parent(target).is_none(),
            _ => false,
        }
    }
}
