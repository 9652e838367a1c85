//! Spatial index of connections, one per workspace per connection kind.
//!
//! Entries are kept in a `Vec` sorted by `y` (ties keep insertion order).
//! Radius queries binary-search the query's `y` and walk outward in both
//! directions, stopping as soon as the `y` distance alone exceeds the
//! current radius. Only survivors of that prune pay for a full Euclidean
//! distance and the caller's compatibility check.

use crate::error::{Result, SnapError};
use crate::id::ConnectionId;
use crate::model::ConnectionKind;
use kurbo::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    id: ConnectionId,
    pos: Point,
}

#[derive(Debug, Clone)]
pub struct ConnectionIndex {
    kind: ConnectionKind,
    slots: Vec<Slot>,
}

impl ConnectionIndex {
    pub fn new(kind: ConnectionKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, Point)> + '_ {
        self.slots.iter().map(|s| (s.id, s.pos))
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.slots.iter().any(|s| s.id == id)
    }

    /// First slot whose `y` is not below `y`.
    fn lower_bound(&self, y: f64) -> usize {
        self.slots.partition_point(|s| s.pos.y < y)
    }

    /// Insert after every entry with the same `y`.
    pub fn insert(&mut self, id: ConnectionId, pos: Point) {
        let at = self.slots.partition_point(|s| s.pos.y <= pos.y);
        self.slots.insert(at, Slot { id, pos });
    }

    /// Remove `id`, which must have been inserted at height `y`.
    pub fn remove(&mut self, id: ConnectionId, y: f64) -> Result<()> {
        let at = self.find(id, y).ok_or(SnapError::NotIndexed(id))?;
        self.slots.remove(at);
        Ok(())
    }

    fn find(&self, id: ConnectionId, y: f64) -> Option<usize> {
        let start = self.lower_bound(y);
        self.slots[start..]
            .iter()
            .take_while(|s| s.pos.y == y)
            .position(|s| s.id == id)
            .map(|offset| start + offset)
    }

    /// Move `id` from height `old_y` to `pos`.
    ///
    /// A purely horizontal move is patched in place; anything else is a
    /// remove followed by an insert.
    pub fn move_to(&mut self, id: ConnectionId, old_y: f64, pos: Point) -> Result<()> {
        let at = self.find(id, old_y).ok_or(SnapError::NotIndexed(id))?;
        if pos.y == old_y {
            self.slots[at].pos = pos;
            return Ok(());
        }
        self.slots.remove(at);
        self.insert(id, pos);
        Ok(())
    }

    /// Find the closest accepted connection within `max_radius` of `query`.
    ///
    /// `accept` is only called for entries already known to lie within the
    /// current best radius. Distances equal to the radius count as inside.
    pub fn search_for_closest(
        &self,
        query: Point,
        max_radius: f64,
        mut accept: impl FnMut(ConnectionId, f64) -> bool,
    ) -> Option<(ConnectionId, f64)> {
        if self.slots.is_empty() || max_radius < 0.0 {
            return None;
        }
        let start = self.lower_bound(query.y);
        let mut best: Option<(ConnectionId, f64)> = None;
        let mut radius = max_radius;

        let mut consider = |slot: &Slot, radius: &mut f64, best: &mut Option<(ConnectionId, f64)>| {
            let d = query.distance(slot.pos);
            if d > *radius {
                return;
            }
            if best.is_some_and(|(_, bd)| d >= bd) {
                return;
            }
            if accept(slot.id, d) {
                *best = Some((slot.id, d));
                *radius = d;
            }
        };

        for slot in self.slots[..start].iter().rev() {
            if query.y - slot.pos.y > radius {
                break;
            }
            consider(slot, &mut radius, &mut best);
        }
        for slot in &self.slots[start..] {
            if slot.pos.y - query.y > radius {
                break;
            }
            consider(slot, &mut radius, &mut best);
        }
        best
    }

    /// All entries within `max_radius` of `query`, in index order.
    /// No compatibility filtering.
    pub fn neighbours(&self, query: Point, max_radius: f64) -> Vec<ConnectionId> {
        let lo = self.lower_bound(query.y - max_radius);
        self.slots[lo..]
            .iter()
            .take_while(|s| s.pos.y - query.y <= max_radius)
            .filter(|s| query.distance(s.pos) <= max_radius)
            .map(|s| s.id)
            .collect()
    }

    /// Verify the sort order. Cheap enough for tests and debug assertions.
    pub fn check_sorted(&self) -> Result<()> {
        match self.slots.windows(2).position(|w| w[0].pos.y > w[1].pos.y) {
            Some(at) => Err(SnapError::IndexUnsorted {
                kind: self.kind.name(),
                at,
            }),
            None => Ok(()),
        }
    }
}
