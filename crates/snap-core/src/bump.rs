//! Repositioning blocks so they neither sit on top of unrelated
//! connectors nor drift outside the bounds of a fixed-size workspace.

use crate::error::Result;
use crate::events::MoveReason;
use crate::id::{BlockId, ConnectionId};
use crate::workspace::Workspace;
use kurbo::{Rect, Vec2};
use rand::Rng;

/// Clamp `value` into `[lower, upper]`, swapping inverted bounds.
fn clamp(lower: f64, value: f64, upper: f64) -> f64 {
    let (lo, hi) = if upper < lower { (upper, lower) } else { (lower, upper) };
    value.min(hi).max(lo)
}

/// Smallest translation that brings `object` inside `bounds`, each axis
/// clamped on its own.
///
/// An object larger than the bounds is aligned to the top, and to the
/// leading edge: left in LTR, right in RTL.
pub fn into_bounds_delta(bounds: Rect, object: Rect, rtl: bool) -> Vec2 {
    let top_clamp = bounds.y0;
    let bottom_clamp = (bounds.y1 - object.height()).max(top_clamp);
    let dy = clamp(top_clamp, object.y0, bottom_clamp) - object.y0;

    let mut left_clamp = bounds.x0;
    let mut right_clamp = bounds.x1 - object.width();
    if rtl {
        left_clamp = left_clamp.min(right_clamp);
    } else {
        right_clamp = right_clamp.max(left_clamp);
    }
    let dx = clamp(left_clamp, object.x0, right_clamp) - object.x0;
    Vec2::new(dx, dy)
}

impl Workspace {
    fn jitter(&mut self) -> f64 {
        match self.config.bump_randomness {
            0 => 0.0,
            n => f64::from(self.rng.gen_range(0..n)),
        }
    }

    /// Nudge the stack owning `conn` away from `away_from`.
    ///
    /// If that stack is immovable the other stack moves instead, in the
    /// opposite vertical direction. If neither can move, nothing happens.
    /// While a drag is in progress the bump is queued.
    pub fn bump_away_from(&mut self, conn: ConnectionId, away_from: ConnectionId) -> Result<()> {
        if self.dragging {
            return self.request_bump(conn, away_from);
        }
        let this = self.try_connection(conn)?.pos;
        let mut other = self.try_connection(away_from)?.pos;
        let mut root = self.root_of(self.try_connection(conn)?.owner);
        let mut reverse = false;
        if !self.try_block(root)?.movable {
            root = self.root_of(self.try_connection(away_from)?.owner);
            if !self.try_block(root)?.movable {
                return Ok(());
            }
            other = this;
            reverse = true;
        }

        let radius = self.config.snap_radius;
        let mut dx = other.x + radius + self.jitter() - this.x;
        let mut dy = other.y + radius + self.jitter() - this.y;
        if reverse {
            dy = -dy;
        }
        if self.rtl {
            dx = other.x - radius - self.jitter() - this.x;
        }
        log::debug!("bumping {root} by ({dx}, {dy})");
        self.move_by(root, Vec2::new(dx, dy), MoveReason::Bump)
    }

    /// Bump away every unrelated stack whose connectors happen to line up
    /// with `id`'s within the snap radius.
    pub fn bump_neighbours(&mut self, id: BlockId) -> Result<()> {
        if self.dragging || self.block(id).is_none_or(|b| b.insertion_marker) {
            return Ok(());
        }
        let root = self.root_of(id);
        let radius = self.config.snap_radius;
        let conns = self.try_block(id)?.connections(false);
        for conn in conns {
            let Some(c) = self.connection(conn) else {
                continue;
            };
            let superior = c.is_superior();
            if superior && let Some(child) = self.target_block(conn) {
                self.bump_neighbours(child)?;
            }
            for other in self.neighbours(conn, radius) {
                let (Some(c), Some(o)) = (self.connection(conn), self.connection(other)) else {
                    continue;
                };
                if c.is_connected() && o.is_connected() {
                    continue;
                }
                if self.root_of(o.owner) == root {
                    continue;
                }
                if superior {
                    self.bump_away_from(other, conn)?;
                } else {
                    self.bump_away_from(conn, other)?;
                }
            }
        }
        Ok(())
    }

    /// Run the bumps queued during the last drag. Orphans that found a
    /// parent in the meantime are left alone.
    pub fn flush_pending_bumps(&mut self) -> Result<()> {
        for bump in std::mem::take(&mut self.pending_bumps) {
            let Some(c) = self.connection(bump.conn) else {
                continue;
            };
            if self.parent(c.owner).is_some() || self.connection(bump.away_from).is_none() {
                continue;
            }
            self.bump_away_from(bump.conn, bump.away_from)?;
        }
        Ok(())
    }

    pub fn has_pending_bumps(&self) -> bool {
        !self.pending_bumps.is_empty()
    }

    /// Move a top-level stack back inside the fixed bounds.
    /// Returns whether it moved.
    pub fn bump_block_into_bounds(&mut self, id: BlockId) -> Result<bool> {
        let Some(bounds) = self.fixed_bounds else {
            return Ok(false);
        };
        let root = self.root_of(id);
        let Some(object) = self.stack_bounds(root) else {
            return Ok(false);
        };
        let delta = into_bounds_delta(bounds, object, self.rtl);
        if delta == Vec2::ZERO {
            return Ok(false);
        }
        self.move_by(root, delta, MoveReason::Bump)?;
        Ok(true)
    }

    /// Bump every top-level stack and floating item into the fixed bounds.
    pub fn bump_all_into_bounds(&mut self) -> Result<()> {
        let Some(bounds) = self.fixed_bounds else {
            return Ok(());
        };
        if self.dragging {
            return Ok(());
        }
        for id in self.z_order.clone() {
            self.bump_block_into_bounds(id)?;
        }
        let items: Vec<_> = self.items.values().map(|i| (i.id, i.rect())).collect();
        for (id, rect) in items {
            let delta = into_bounds_delta(bounds, rect, self.rtl);
            if delta != Vec2::ZERO {
                self.move_item(id, rect.origin() + delta);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapConfig;
    use crate::model::{BlockTemplate, ConnectionSpec};
    use kurbo::Point;
    use pretty_assertions::assert_eq;

    #[test]
    fn inside_objects_do_not_move() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let obj = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(into_bounds_delta(bounds, obj, false), Vec2::ZERO);
    }

    #[test]
    fn each_axis_clamps_independently() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let obj = Rect::new(-15.0, 95.0, 5.0, 105.0);
        assert_eq!(into_bounds_delta(bounds, obj, false), Vec2::new(15.0, -5.0));
    }

    #[test]
    fn oversized_objects_align_to_the_leading_edge() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let wide = Rect::new(30.0, 0.0, 180.0, 10.0);
        assert_eq!(into_bounds_delta(bounds, wide, false).x, -30.0);
        // RTL keeps the right edge inside instead.
        assert_eq!(into_bounds_delta(bounds, wide, true).x, -80.0);
    }

    fn value_block(id: &str) -> BlockTemplate {
        BlockTemplate::new("v", 30.0, 20.0)
            .id(id)
            .output(ConnectionSpec::at(0.0, 0.0))
    }

    fn holder(id: &str) -> BlockTemplate {
        BlockTemplate::new("h", 100.0, 40.0)
            .id(id)
            .value_input("A", ConnectionSpec::at(60.0, 10.0))
    }

    #[test]
    fn bump_moves_away_by_snap_radius_plus_jitter() {
        let config = SnapConfig {
            bump_randomness: 0,
            ..SnapConfig::default()
        };
        let mut ws = Workspace::with_seed(config, 1);
        let h = ws.add_block(&holder("b_h"), Point::ZERO).unwrap();
        let v = ws.add_block(&value_block("b_v"), Point::new(60.0, 10.0)).unwrap();
        let input = ws.block(h).unwrap().inputs[0].connection.unwrap();
        let out = ws.block(v).unwrap().output.unwrap();

        ws.bump_away_from(out, input).unwrap();
        assert_eq!(ws.block(v).unwrap().xy, Point::new(88.0, 38.0));
        ws.check_invariants().unwrap();
    }

    #[test]
    fn immovable_blocks_push_the_other_side() {
        let config = SnapConfig {
            bump_randomness: 0,
            ..SnapConfig::default()
        };
        let mut ws = Workspace::with_seed(config, 1);
        let h = ws.add_block(&holder("b_h2"), Point::ZERO).unwrap();
        let v = ws
            .add_block(&value_block("b_v2").immovable(), Point::new(60.0, 10.0))
            .unwrap();
        let input = ws.block(h).unwrap().inputs[0].connection.unwrap();
        let out = ws.block(v).unwrap().output.unwrap();

        ws.bump_away_from(out, input).unwrap();
        assert_eq!(ws.block(v).unwrap().xy, Point::new(60.0, 10.0));
        assert_eq!(ws.block(h).unwrap().xy, Point::new(28.0, -28.0));
    }

    #[test]
    fn bumps_wait_for_the_drag_to_end() {
        let mut ws = Workspace::with_seed(SnapConfig::default(), 7);
        let h = ws.add_block(&holder("b_h3"), Point::ZERO).unwrap();
        let v = ws.add_block(&value_block("b_v3"), Point::new(60.0, 10.0)).unwrap();
        let input = ws.block(h).unwrap().inputs[0].connection.unwrap();
        let out = ws.block(v).unwrap().output.unwrap();

        ws.set_dragging(true);
        ws.bump_away_from(out, input).unwrap();
        assert!(ws.has_pending_bumps());
        assert_eq!(ws.block(v).unwrap().xy, Point::new(60.0, 10.0));

        ws.set_dragging(false);
        ws.flush_pending_bumps().unwrap();
        assert!(!ws.has_pending_bumps());
        assert!(ws.block(v).unwrap().xy.x >= 88.0);
    }

    #[test]
    fn neighbours_of_a_dropped_block_are_bumped() {
        let config = SnapConfig {
            bump_randomness: 0,
            ..SnapConfig::default()
        };
        let mut ws = Workspace::with_seed(config, 3);
        let h = ws.add_block(&holder("b_h4"), Point::ZERO).unwrap();
        let v = ws.add_block(&value_block("b_v4"), Point::new(62.0, 12.0)).unwrap();
        ws.bump_neighbours(h).unwrap();
        assert_eq!(ws.block(v).unwrap().xy, Point::new(88.0, 38.0));
    }

    #[test]
    fn insertion_markers_neither_bump_nor_get_bumped() {
        let mut ws = Workspace::with_seed(SnapConfig::default(), 3);
        let h = ws.add_block(&holder("b_h6"), Point::ZERO).unwrap();
        let v = ws.add_block(&value_block("b_v6"), Point::new(300.0, 300.0)).unwrap();
        let marker = ws.add_insertion_marker(v).unwrap();
        ws.move_to(marker, Point::new(62.0, 12.0), MoveReason::Programmatic)
            .unwrap();
        let input = ws.block(h).unwrap().inputs[0].connection.unwrap();
        assert!(ws.neighbours(input, 28.0).is_empty());

        ws.bump_neighbours(h).unwrap();
        ws.bump_neighbours(marker).unwrap();
        assert_eq!(ws.block(h).unwrap().xy, Point::ZERO);
        assert_eq!(ws.block(marker).unwrap().xy, Point::new(62.0, 12.0));
    }

    #[test]
    fn fixed_bounds_pull_stacks_back() {
        let mut ws = Workspace::default();
        let v = ws.add_block(&value_block("b_v5"), Point::new(-40.0, 500.0)).unwrap();
        ws.set_fixed_bounds(Some(Rect::new(0.0, 0.0, 200.0, 200.0)))
            .unwrap();
        assert_eq!(ws.block(v).unwrap().xy, Point::new(0.0, 180.0));
    }
}
