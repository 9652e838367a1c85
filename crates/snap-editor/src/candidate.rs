//! Finding the connection a drop would make.
//!
//! Every local connection on the dragged stack queries the index of its
//! opposite kind. The search radius shrinks with each hit, so the result
//! is the globally closest compatible pair. A previewed candidate is then
//! kept unless the new one is clearly closer, which stops the preview from
//! flickering between two connectors at nearly the same distance.

use kurbo::Vec2;
use smallvec::SmallVec;
use snap_core::{BlockId, ConnectionId, SnapConfig, Workspace};

pub type LocalConnections = SmallVec<[ConnectionId; 8]>;

/// A proposed pairing of a connection on the dragged stack with one on a
/// stationary block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragCandidate {
    pub local: ConnectionId,
    pub neighbour: ConnectionId,
    pub distance: f64,
}

impl DragCandidate {
    pub fn same_pair(&self, other: &DragCandidate) -> bool {
        self.local == other.local && self.neighbour == other.neighbour
    }
}

/// Connections of the dragged stack that may snap: everything on the top
/// block, plus the last next connection of the stack when that is not the
/// top block's own.
pub fn local_connections(ws: &Workspace, top: BlockId) -> LocalConnections {
    let Some(block) = ws.block(top) else {
        return LocalConnections::new();
    };
    let mut locals = block.connections(false);
    if let Some(last) = ws.last_connection_in_stack(top, true)
        && Some(last) != block.next
    {
        locals.push(last);
    }
    locals
}

/// Candidate search with hysteresis. Radii come from the config snapshot
/// taken when the drag started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragCandidateFinder {
    snap_radius: f64,
    connecting_snap_radius: f64,
    preference: f64,
}

impl DragCandidateFinder {
    pub fn new(config: &SnapConfig) -> Self {
        Self {
            snap_radius: config.snap_radius,
            connecting_snap_radius: config.connecting_snap_radius,
            preference: config.current_connection_preference,
        }
    }

    /// Once something is previewed, the tighter connecting radius applies.
    pub fn start_radius(&self, has_candidate: bool) -> f64 {
        if has_candidate {
            self.connecting_snap_radius
        } else {
            self.snap_radius
        }
    }

    /// Closest compatible pair for `locals` shifted by `delta`, ignoring
    /// any previous candidate.
    pub fn search(
        &self,
        ws: &Workspace,
        locals: &[ConnectionId],
        delta: Vec2,
        has_candidate: bool,
    ) -> Option<DragCandidate> {
        let mut radius = self.start_radius(has_candidate);
        let mut best = None;
        for &local in locals {
            if let Some((neighbour, distance)) = ws.closest(local, radius, delta) {
                best = Some(DragCandidate {
                    local,
                    neighbour,
                    distance,
                });
                radius = distance;
            }
        }
        best
    }

    /// The candidate a drop at `delta` would use, given the one currently
    /// previewed.
    pub fn find_best_candidate(
        &self,
        ws: &Workspace,
        locals: &[ConnectionId],
        delta: Vec2,
        previous: Option<&DragCandidate>,
    ) -> Option<DragCandidate> {
        let found = self.search(ws, locals, delta, previous.is_some())?;
        let Some(previous) = previous else {
            return Some(found);
        };
        if previous.same_pair(&found) {
            return Some(found);
        }
        match self.current_distance(ws, previous, delta) {
            Some(current) if found.distance >= current - self.preference => Some(DragCandidate {
                distance: current,
                ..*previous
            }),
            _ => Some(found),
        }
    }

    /// Distance between the previous pair at the current drag offset, or
    /// `None` once either side is gone.
    pub fn current_distance(&self, ws: &Workspace, candidate: &DragCandidate, delta: Vec2) -> Option<f64> {
        let local = ws.connection(candidate.local)?;
        let neighbour = ws.connection(candidate.neighbour)?;
        Some((local.pos + delta).distance(neighbour.pos))
    }
}
