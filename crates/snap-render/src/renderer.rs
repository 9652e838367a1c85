//! Renderer contract for connection previews.
//!
//! Drawing itself lives outside this workspace. What the drag engine needs
//! from a renderer is a decision: which of three mutually exclusive
//! treatments to show for a candidate, and whether to highlight the
//! candidate connection.

use snap_core::{BlockId, ConnectionId, ConnectionKind, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewMethod {
    /// Ghost clone of the dragged block connected at the candidate.
    InsertionMarker,
    /// Outline the empty input; no marker block.
    InputOutline,
    /// Fade the block the drop would displace.
    ReplacementFade,
}

pub trait Renderer {
    fn name(&self) -> &'static str;

    /// Preview for dropping `local` (on the dragged stack whose top block
    /// is `top_block`) onto `neighbour`.
    fn connection_preview_method(
        &self,
        ws: &Workspace,
        neighbour: ConnectionId,
        local: ConnectionId,
        top_block: BlockId,
    ) -> PreviewMethod;

    fn should_highlight_connection(&self, ws: &Workspace, conn: ConnectionId) -> bool;
}

/// Block currently plugged into `conn`, ignoring insertion markers.
fn occupant(ws: &Workspace, conn: ConnectionId) -> Option<BlockId> {
    ws.target_block(conn)
        .filter(|b| ws.block(*b).is_some_and(|b| !b.insertion_marker))
}

/// Whether the block displaced at `neighbour` could re-attach somewhere
/// at the end of the dragged stack.
pub fn orphan_can_connect_at_end(
    ws: &Workspace,
    top_block: BlockId,
    orphan: BlockId,
    local_kind: ConnectionKind,
) -> bool {
    let Some(block) = ws.block(orphan) else {
        return false;
    };
    let orphan_conn = match local_kind {
        ConnectionKind::Output => block.output,
        _ => block.previous,
    };
    orphan_conn.is_some_and(|c| ws.connection_for_orphan(top_block, c).is_some())
}

/// Marker for inserts, fade when the drop would evict a block with
/// nowhere to go. Highlights the candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassicRenderer;

impl Renderer for ClassicRenderer {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn connection_preview_method(
        &self,
        ws: &Workspace,
        neighbour: ConnectionId,
        local: ConnectionId,
        top_block: BlockId,
    ) -> PreviewMethod {
        let Some(kind) = ws.connection(local).map(|c| c.kind) else {
            return PreviewMethod::InsertionMarker;
        };
        if !matches!(kind, ConnectionKind::Output | ConnectionKind::PreviousStatement) {
            return PreviewMethod::InsertionMarker;
        }
        match occupant(ws, neighbour) {
            None => PreviewMethod::InsertionMarker,
            Some(orphan) if orphan_can_connect_at_end(ws, top_block, orphan, kind) => {
                PreviewMethod::InsertionMarker
            }
            Some(orphan) => {
                log::trace!("{orphan} has nowhere to go on {top_block}; fading it");
                PreviewMethod::ReplacementFade
            }
        }
    }

    fn should_highlight_connection(&self, _ws: &Workspace, _conn: ConnectionId) -> bool {
        true
    }
}

/// Flat look: empty value inputs are outlined instead of filled by a
/// marker, and occupied ones always fade. No connection highlight.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatRenderer;

impl Renderer for FlatRenderer {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn connection_preview_method(
        &self,
        ws: &Workspace,
        neighbour: ConnectionId,
        local: ConnectionId,
        top_block: BlockId,
    ) -> PreviewMethod {
        if ws.connection(local).map(|c| c.kind) == Some(ConnectionKind::Output) {
            return match occupant(ws, neighbour) {
                None => {
                    log::trace!("outlining empty input {neighbour}");
                    PreviewMethod::InputOutline
                }
                Some(_) => PreviewMethod::ReplacementFade,
            };
        }
        ClassicRenderer.connection_preview_method(ws, neighbour, local, top_block)
    }

    fn should_highlight_connection(&self, _ws: &Workspace, _conn: ConnectionId) -> bool {
        false
    }
}
