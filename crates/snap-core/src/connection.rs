//! Linking and unlinking connections.
//!
//! The superior side of a link (input or next) owns positioning: on
//! connect, the inferior block's subtree is translated so the two
//! connectors coincide.

use crate::error::{Result, SnapError};
use crate::events::{EventKind, MoveReason};
use crate::id::{BlockId, ConnectionId};
use crate::model::{BlockTemplate, ConnectionKind};
use crate::workspace::{PendingBump, Workspace};

impl Workspace {
    /// Connect `a` to `b` after the full non-drag compatibility check.
    ///
    /// If the superior side is occupied, a shadow occupant is disposed and
    /// a real occupant is re-attached to the end of the new child or,
    /// failing that, bumped away.
    pub fn connect(&mut self, a: ConnectionId, b: ConnectionId) -> Result<()> {
        if self.events.group().is_none() && self.events.is_enabled() {
            log::warn!("connecting {a} to {b} outside of an event group");
        }
        if self.try_connection(a)?.target == Some(b) {
            return Ok(());
        }
        self.checker
            .check(self, a, b, false)
            .map_err(|reason| SnapError::Rejected { a, b, reason })?;
        let (parent, child) = if self.try_connection(a)?.is_superior() {
            (a, b)
        } else {
            (b, a)
        };
        self.connect_superior(parent, child)
    }

    fn connect_superior(&mut self, parent_conn: ConnectionId, child_conn: ConnectionId) -> Result<()> {
        let parent_kind = self.try_connection(parent_conn)?.kind;
        let child_block = self.try_connection(child_conn)?.owner;
        let parent_block = self.try_connection(parent_conn)?.owner;

        if self.try_connection(child_conn)?.is_connected() {
            self.disconnect(child_conn)?;
        }

        let mut orphan = None;
        if let Some(occupant) = self.target_block(parent_conn) {
            // The slot's shadow template must survive the swap, so unlink
            // without respawning.
            self.unlink(parent_conn, false)?;
            if self.try_block(occupant)?.shadow {
                self.dispose_block(occupant, false)?;
            } else {
                orphan = Some(occupant);
            }
        }

        let old_xy = self.try_block(child_block)?.xy;
        self.link(parent_conn, child_conn)?;
        let delta = self.connection_location(parent_conn)? - self.connection_location(child_conn)?;
        self.translate_subtree(child_block, delta, true)?;
        self.events.fire(EventKind::BlockMove {
            block: child_block,
            old_parent: None,
            new_parent: Some(parent_block),
            old_xy,
            new_xy: old_xy + delta,
            reason: MoveReason::Connect,
        });
        self.assert_linked(parent_conn, child_conn)?;

        if let Some(orphan) = orphan {
            self.reattach_orphan(orphan, child_block, parent_kind, parent_conn)?;
        }
        Ok(())
    }

    fn reattach_orphan(
        &mut self,
        orphan: BlockId,
        new_child: BlockId,
        parent_kind: ConnectionKind,
        parent_conn: ConnectionId,
    ) -> Result<()> {
        let block = self.try_block(orphan)?;
        let orphan_conn = match parent_kind {
            ConnectionKind::Input => block.output,
            _ => block.previous,
        };
        let Some(orphan_conn) = orphan_conn else {
            return Ok(());
        };
        match self.connection_for_orphan(new_child, orphan_conn) {
            Some(target) => self.connect(target, orphan_conn),
            None => {
                log::debug!("orphan {orphan} has nowhere to go; bumping");
                self.request_bump(orphan_conn, parent_conn)
            }
        }
    }

    /// Where an orphaned block should re-attach below `start`.
    ///
    /// A value orphan follows the chain of single compatible value inputs
    /// down to the first empty (or shadow) slot. A statement orphan goes
    /// to the last next connection of the stack.
    pub fn connection_for_orphan(&self, start: BlockId, orphan_conn: ConnectionId) -> Option<ConnectionId> {
        let orphan = self.connection(orphan_conn)?;
        if orphan.kind == ConnectionKind::Output {
            let mut block = start;
            while let Some(conn) = self.single_compatible_input(block, orphan_conn) {
                match self.target_block(conn) {
                    None => return Some(conn),
                    Some(t) if self.block(t).is_some_and(|b| b.shadow) => return Some(conn),
                    Some(t) => block = t,
                }
            }
            return None;
        }
        let last = self.last_connection_in_stack(start, true)?;
        self.checker
            .can_connect(self, orphan_conn, last, false)
            .then_some(last)
    }

    fn single_compatible_input(&self, block: BlockId, output: ConnectionId) -> Option<ConnectionId> {
        let mut found = None;
        for conn in self.block(block)?.inputs.iter().filter_map(|i| i.connection) {
            if self.checker.can_connect(self, output, conn, false) {
                if found.is_some() {
                    return None;
                }
                found = Some(conn);
            }
        }
        found
    }

    /// Break the link at `conn`. The child becomes a top-level block at its
    /// current position, and the parent slot respawns its shadow if the
    /// child was a real block.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Result<()> {
        self.unlink(conn, true)
    }

    fn unlink(&mut self, conn: ConnectionId, respawn: bool) -> Result<()> {
        let c = self.try_connection(conn)?;
        let other = c.target.ok_or(SnapError::NotConnected(conn))?;
        self.assert_linked(conn, other)?;
        let (parent_conn, child_conn) = if c.is_superior() {
            (conn, other)
        } else {
            (other, conn)
        };
        let parent_block = self.try_connection(parent_conn)?.owner;
        let child_block = self.try_connection(child_conn)?.owner;

        for id in [parent_conn, child_conn] {
            if let Some(c) = self.connection_mut(id) {
                c.target = None;
            }
        }
        let (p, ch) = (self.node(parent_block)?, self.node(child_block)?);
        if let Some(edge) = self.graph.find_edge(p, ch) {
            self.graph.remove_edge(edge);
        }
        self.z_order.push(child_block);

        let xy = self.try_block(child_block)?.xy;
        self.events.fire(EventKind::BlockMove {
            block: child_block,
            old_parent: Some(parent_block),
            new_parent: None,
            old_xy: xy,
            new_xy: xy,
            reason: MoveReason::Disconnect,
        });

        if respawn && !self.try_block(child_block)?.shadow {
            self.respawn_shadow(parent_conn)?;
        }
        Ok(())
    }

    fn link(&mut self, parent_conn: ConnectionId, child_conn: ConnectionId) -> Result<()> {
        let parent_block = self.try_connection(parent_conn)?.owner;
        let child_block = self.try_connection(child_conn)?.owner;
        let (p, ch) = (self.node(parent_block)?, self.node(child_block)?);
        if let Some(c) = self.connection_mut(parent_conn) {
            c.target = Some(child_conn);
        }
        if let Some(c) = self.connection_mut(child_conn) {
            c.target = Some(parent_conn);
        }
        self.graph.add_edge(p, ch, parent_conn);
        self.z_order.retain(|b| *b != child_block);
        Ok(())
    }

    /// Partner pointers must agree; anything else is a corrupt graph.
    fn assert_linked(&self, a: ConnectionId, b: ConnectionId) -> Result<()> {
        let ca = self.try_connection(a)?;
        let cb = self.try_connection(b)?;
        if ca.target == Some(b) && cb.target == Some(a) {
            Ok(())
        } else {
            log::error!("asymmetric partners {a} <-> {b}");
            Err(SnapError::AsymmetricPartners { a, b })
        }
    }

    // ─── Shadows ─────────────────────────────────────────────────────────

    /// Replace the shadow template of `conn`. An empty slot gets the new
    /// shadow immediately; a slot holding an old shadow has it swapped.
    pub fn set_shadow_template(&mut self, conn: ConnectionId, template: Option<BlockTemplate>) -> Result<()> {
        if let Some(occupant) = self.target_block(conn)
            && self.try_block(occupant)?.shadow
        {
            self.unlink(conn, false)?;
            self.dispose_block(occupant, false)?;
        }
        if let Some(c) = self.connection_mut(conn) {
            c.shadow = template.map(|mut t| {
                t.shadow = true;
                Box::new(t)
            });
        }
        self.respawn_shadow(conn)
    }

    /// Fill an empty slot from its shadow template, if it has one.
    pub(crate) fn respawn_shadow(&mut self, conn: ConnectionId) -> Result<()> {
        let c = self.try_connection(conn)?;
        if c.is_connected() {
            return Ok(());
        }
        let Some(template) = c.shadow.clone() else {
            return Ok(());
        };
        let kind = c.kind;
        let at = c.pos;
        let shadow = self.add_block(&template, at)?;
        let block = self.try_block(shadow)?;
        let plug = match kind {
            ConnectionKind::Input => block.output,
            ConnectionKind::NextStatement => block.previous,
            _ => None,
        }
        .ok_or(SnapError::BadShadowTemplate(conn))?;
        self.connect_superior(conn, plug)
    }

    // ─── Unplug ──────────────────────────────────────────────────────────

    /// Detach `id` from its parent. With `heal`, whatever hung below it is
    /// re-linked to the old parent: the next block for statements, the
    /// child of the single value input for values.
    pub fn unplug(&mut self, id: BlockId, heal: bool) -> Result<()> {
        let block = self.try_block(id)?;
        match (block.output, block.previous) {
            (Some(output), _) => self.unplug_from_row(id, output, heal),
            (None, Some(previous)) => self.unplug_from_stack(id, previous, heal),
            (None, None) => Ok(()),
        }
    }

    fn unplug_from_row(&mut self, id: BlockId, output: ConnectionId, heal: bool) -> Result<()> {
        let Some(parent_conn) = self.try_connection(output)?.target else {
            return Ok(());
        };
        self.disconnect(output)?;
        if !heal {
            return Ok(());
        }
        let Some(value) = self.only_value_connection(id) else {
            return Ok(());
        };
        let Some(child) = self.target_block(value) else {
            return Ok(());
        };
        if self.try_block(child)?.shadow {
            return Ok(());
        }
        let Some(child_conn) = self.try_connection(value)?.target else {
            return Ok(());
        };
        self.disconnect(child_conn)?;
        if self.checker.can_connect(self, child_conn, parent_conn, false) {
            self.connect(parent_conn, child_conn)
        } else {
            self.request_bump(child_conn, parent_conn)
        }
    }

    fn unplug_from_stack(&mut self, id: BlockId, previous: ConnectionId, heal: bool) -> Result<()> {
        let previous_target = self.try_connection(previous)?.target;
        if previous_target.is_some() {
            self.disconnect(previous)?;
        }
        if !heal {
            return Ok(());
        }
        let Some(next) = self.next_block(id) else {
            return Ok(());
        };
        if self.try_block(next)?.shadow {
            return Ok(());
        }
        let Some(next_target) = self.try_block(next)?.previous else {
            return Ok(());
        };
        self.disconnect(next_target)?;
        if let Some(prev) = previous_target
            && self.checker.can_connect(self, prev, next_target, false)
        {
            self.connect(prev, next_target)?;
        }
        Ok(())
    }

    /// Bump `conn`'s block away from `away_from` now, or after the drag if
    /// one is in progress.
    pub(crate) fn request_bump(&mut self, conn: ConnectionId, away_from: ConnectionId) -> Result<()> {
        if self.dragging {
            self.pending_bumps.push(PendingBump { conn, away_from });
            return Ok(());
        }
        self.bump_away_from(conn, away_from)
    }
}
