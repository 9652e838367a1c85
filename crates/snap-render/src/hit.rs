//! Hit testing: point → block, item or drag target.
//!
//! Walks top-level stacks front to back. Inside a stack, later
//! descendants paint over earlier ones, so they are checked first.

use kurbo::Point;
use snap_core::{BlockId, Capability, ComponentId, ItemId, Workspace};

/// Topmost visible, non-marker block at `pt` (workspace units).
/// Returns `None` on empty canvas.
pub fn hit_test(ws: &Workspace, pt: Point) -> Option<BlockId> {
    for root in ws.top_blocks().iter().rev() {
        for id in ws.descendants(*root).into_iter().rev() {
            let Some(block) = ws.block(id) else {
                continue;
            };
            if !block.visible || block.insertion_marker {
                continue;
            }
            if block.rect().contains(pt) {
                return Some(id);
            }
        }
    }
    None
}

/// Topmost floating item at `pt`. Items paint above blocks.
pub fn hit_test_item(ws: &Workspace, pt: Point) -> Option<ItemId> {
    ws.items()
        .filter(|i| i.rect().contains(pt))
        .map(|i| i.id)
        .last()
}

/// The drag target under `screen_pt`: the lightest-weight registered
/// target whose client rect contains the point.
pub fn drag_target_at(ws: &Workspace, screen_pt: Point) -> Option<ComponentId> {
    ws.components
        .components_by_capability(Capability::DragTarget, true)
        .into_iter()
        .find(|id| {
            ws.components
                .drag_target(*id)
                .and_then(|t| t.client_rect())
                .is_some_and(|r| r.contains(screen_pt))
        })
        .inspect(|id| log::trace!("drag target {id} under {screen_pt:?}"))
}
