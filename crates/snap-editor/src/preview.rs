//! Showing where a drop would land.
//!
//! One controller per drag session. It owns up to two insertion markers:
//! the first mirrors the top block of the dragged stack, the last mirrors
//! the block owning the stack's tail connection. Markers are created the
//! first time they are needed and kept hidden between previews, so moving
//! in and out of range does not churn blocks.
//!
//! Everything here runs with events disabled: previews are not edits.

use crate::candidate::DragCandidate;
use crate::error::{DragError, Result};
use smallvec::SmallVec;
use snap_core::{BlockId, ConnectionId, MoveReason, Workspace};
use snap_render::{PreviewMethod, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    None,
    Previewing,
    Committed,
    Reverted,
}

/// What is currently on screen for the active candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shown {
    Marker { marker: BlockId, conn: ConnectionId },
    Outline { block: BlockId, conn: ConnectionId },
    Fade { block: BlockId },
}

/// Counters for marker and preview churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewStats {
    pub markers_created: usize,
    pub markers_disposed: usize,
    pub shown: usize,
    pub hidden: usize,
}

#[derive(Debug)]
pub struct PreviewController {
    top_block: BlockId,
    last_on_stack: Option<ConnectionId>,
    first_marker: Option<BlockId>,
    last_marker: Option<BlockId>,
    active: Option<DragCandidate>,
    shown: Option<Shown>,
    highlighted: Option<ConnectionId>,
    state: PreviewState,
    stats: PreviewStats,
}

impl PreviewController {
    /// `last_on_stack` is the stack's tail connection when it is not the
    /// top block's own next connection.
    pub fn new(top_block: BlockId, last_on_stack: Option<ConnectionId>) -> Self {
        Self {
            top_block,
            last_on_stack,
            first_marker: None,
            last_marker: None,
            active: None,
            shown: None,
            highlighted: None,
            state: PreviewState::None,
            stats: PreviewStats::default(),
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn active(&self) -> Option<&DragCandidate> {
        self.active.as_ref()
    }

    pub fn stats(&self) -> PreviewStats {
        self.stats
    }

    pub fn set_last_on_stack(&mut self, last: Option<ConnectionId>) {
        self.last_on_stack = last;
    }

    pub fn markers(&self) -> SmallVec<[BlockId; 2]> {
        self.first_marker.into_iter().chain(self.last_marker).collect()
    }

    /// Whether a marker is currently plugged in at the candidate site.
    pub fn marker_connected(&self, ws: &Workspace) -> bool {
        matches!(self.shown, Some(Shown::Marker { conn, .. })
            if ws.connection(conn).is_some_and(|c| c.is_connected()))
    }

    /// Bring the preview in line with `candidate`. An unchanged pair is a
    /// no-op; anything else tears the old preview down first.
    pub fn update(
        &mut self,
        ws: &mut Workspace,
        renderer: &dyn Renderer,
        candidate: Option<DragCandidate>,
        would_delete: bool,
    ) -> Result<()> {
        let wanted = candidate.filter(|_| !would_delete);
        match (&mut self.active, &wanted) {
            (None, None) => return Ok(()),
            (Some(active), Some(new)) if active.same_pair(new) => {
                active.distance = new.distance;
                return Ok(());
            }
            _ => {}
        }
        ws.events.disable();
        let result = self.replace(ws, renderer, wanted);
        ws.events.enable();
        result
    }

    fn replace(
        &mut self,
        ws: &mut Workspace,
        renderer: &dyn Renderer,
        wanted: Option<DragCandidate>,
    ) -> Result<()> {
        self.hide_preview(ws)?;
        let Some(candidate) = wanted else {
            return Ok(());
        };
        if ws
            .connection(candidate.neighbour)
            .and_then(|c| ws.block(c.owner))
            .is_none_or(|b| b.insertion_marker)
        {
            log::warn!("refusing to preview against insertion marker connection {}", candidate.neighbour);
            return Ok(());
        }
        self.show_preview(ws, renderer, candidate)
    }

    /// Tear down whatever is shown and forget the candidate.
    pub fn hide(&mut self, ws: &mut Workspace) -> Result<()> {
        ws.events.disable();
        let result = self.hide_preview(ws);
        ws.events.enable();
        result
    }

    /// End of a successful drop: the preview is gone, the candidate (if
    /// any) is handed back to be connected for real.
    pub fn commit(&mut self, ws: &mut Workspace) -> Result<Option<DragCandidate>> {
        let candidate = self.active;
        self.hide(ws)?;
        self.state = PreviewState::Committed;
        Ok(candidate)
    }

    pub fn revert(&mut self, ws: &mut Workspace) -> Result<()> {
        self.hide(ws)?;
        self.state = PreviewState::Reverted;
        Ok(())
    }

    /// Dispose every marker this session created. Keeps going past a
    /// failure and reports the first one.
    pub fn dispose(&mut self, ws: &mut Workspace) -> Result<()> {
        let mut result = self.hide(ws);
        let markers = [self.first_marker.take(), self.last_marker.take()];
        for marker in markers.into_iter().flatten() {
            if let Err(e) = self.dispose_marker(ws, marker) {
                log::warn!("{e}");
                result = result.and(Err(e));
            }
        }
        result
    }

    // ─── Show ────────────────────────────────────────────────────────────

    fn show_preview(&mut self, ws: &mut Workspace, renderer: &dyn Renderer, candidate: DragCandidate) -> Result<()> {
        let DragCandidate { local, neighbour, .. } = candidate;
        let method = renderer.connection_preview_method(ws, neighbour, local, self.top_block);
        let shown = match method {
            PreviewMethod::InsertionMarker => self.show_insertion_marker(ws, candidate)?,
            PreviewMethod::InputOutline => {
                let block = ws.try_connection(neighbour)?.owner;
                if let Some(b) = ws.block_mut(block) {
                    b.highlighted_input = Some(neighbour);
                }
                Some(Shown::Outline { block, conn: neighbour })
            }
            PreviewMethod::ReplacementFade => match ws.target_block(neighbour) {
                Some(block) => {
                    if let Some(b) = ws.block_mut(block) {
                        b.faded = true;
                    }
                    Some(Shown::Fade { block })
                }
                None => {
                    log::warn!("{} asked to fade an empty connection {neighbour}", renderer.name());
                    None
                }
            },
        };
        let Some(shown) = shown else {
            return Ok(());
        };
        if renderer.should_highlight_connection(ws, neighbour) {
            ws.set_connection_highlight(neighbour, true)?;
            self.highlighted = Some(neighbour);
        }
        self.shown = Some(shown);
        self.active = Some(candidate);
        self.state = PreviewState::Previewing;
        self.stats.shown += 1;
        Ok(())
    }

    fn show_insertion_marker(&mut self, ws: &mut Workspace, candidate: DragCandidate) -> Result<Option<Shown>> {
        let DragCandidate { local, neighbour, .. } = candidate;
        let is_last = self.last_on_stack == Some(local);
        let source = ws.try_connection(local)?.owner;

        let mut marker = self.marker_for(ws, is_last, source)?;
        let conn = match matching_connection(ws, marker, source, local) {
            Ok(conn) => conn,
            Err(()) => {
                log::warn!("insertion marker {marker} no longer matches {source}; regenerating");
                let stale = if is_last {
                    self.last_marker.take()
                } else {
                    self.first_marker.take()
                };
                if let Some(stale) = stale {
                    self.dispose_marker(ws, stale)?;
                }
                marker = self.marker_for(ws, is_last, source)?;
                matching_connection(ws, marker, source, local).ok().flatten()
            }
        };
        let Some(conn) = conn else {
            log::warn!("insertion marker {marker} has no connection matching {local}");
            return Ok(None);
        };

        // Park the marker so its connector sits on the neighbour; whichever
        // side ends up superior, the stationary block then stays put.
        let at = ws.connection_location(neighbour)?;
        let offset = ws.try_connection(conn)?.offset;
        ws.move_to(marker, at - offset, MoveReason::Programmatic)?;
        if let Err(e) = ws.connect(conn, neighbour) {
            log::warn!("insertion marker could not connect at {neighbour}: {e}");
            return Ok(None);
        }
        if let Some(b) = ws.block_mut(marker) {
            b.visible = true;
        }
        Ok(Some(Shown::Marker { marker, conn }))
    }

    fn marker_for(&mut self, ws: &mut Workspace, is_last: bool, source: BlockId) -> Result<BlockId> {
        let slot = if is_last {
            &mut self.last_marker
        } else {
            &mut self.first_marker
        };
        if let Some(marker) = *slot {
            return Ok(marker);
        }
        let marker = ws.add_insertion_marker(source)?;
        *slot = Some(marker);
        self.stats.markers_created += 1;
        Ok(marker)
    }

    // ─── Hide ────────────────────────────────────────────────────────────

    fn hide_preview(&mut self, ws: &mut Workspace) -> Result<()> {
        if let Some(conn) = self.highlighted.take()
            && ws.connection(conn).is_some()
        {
            ws.set_connection_highlight(conn, false)?;
        }
        match self.shown.take() {
            Some(Shown::Marker { marker, conn }) => hide_insertion_marker(ws, marker, conn)?,
            Some(Shown::Outline { block, conn }) => {
                if let Some(b) = ws.block_mut(block)
                    && b.highlighted_input == Some(conn)
                {
                    b.highlighted_input = None;
                }
            }
            Some(Shown::Fade { block }) => {
                if let Some(b) = ws.block_mut(block) {
                    b.faded = false;
                }
            }
            None => {}
        }
        if self.active.take().is_some() {
            self.stats.hidden += 1;
            self.state = PreviewState::None;
        }
        Ok(())
    }

    fn dispose_marker(&mut self, ws: &mut Workspace, marker: BlockId) -> Result<()> {
        if !ws.contains_block(marker) {
            return Err(DragError::UnknownMarker(marker));
        }
        // Heal, so a marker still spliced into a stack takes no real
        // blocks with it.
        ws.events.disable();
        let result = ws.dispose_block(marker, true);
        ws.events.enable();
        result?;
        self.stats.markers_disposed += 1;
        log::debug!("disposed insertion marker {marker}");
        Ok(())
    }
}

/// The marker's connection in the same position as `local` on `source`.
/// `Err` when the two blocks no longer have the same connection layout.
fn matching_connection(
    ws: &Workspace,
    marker: BlockId,
    source: BlockId,
    local: ConnectionId,
) -> std::result::Result<Option<ConnectionId>, ()> {
    let (Some(m), Some(s)) = (ws.block(marker), ws.block(source)) else {
        return Err(());
    };
    let ours = m.connections(true);
    let theirs = s.connections(true);
    if ours.len() != theirs.len() {
        return Err(());
    }
    Ok(theirs
        .iter()
        .position(|c| *c == local)
        .map(|i| ours[i]))
}

/// Unplug the marker and put the blocks back as they were.
fn hide_insertion_marker(ws: &mut Workspace, marker: BlockId, conn: ConnectionId) -> Result<()> {
    let Some(block) = ws.block(marker) else {
        return Err(DragError::UnknownMarker(marker));
    };
    let plugged = |c: Option<ConnectionId>| {
        c.and_then(|c| ws.connection(c))
            .is_some_and(|c| c.is_connected())
    };
    let is_top = !plugged(block.previous) && !plugged(block.output);
    if is_top {
        // Unplugging a top block does nothing; detach what hangs off it.
        if let Some(child) = ws.target_block(conn) {
            ws.unplug(child, false)?;
        }
    } else {
        ws.unplug(marker, true)?;
    }
    if ws.connection(conn).is_some_and(|c| c.is_connected()) {
        return Err(DragError::StaleMarker(conn));
    }
    if let Some(b) = ws.block_mut(marker) {
        b.visible = false;
    }
    Ok(())
}
