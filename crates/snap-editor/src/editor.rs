//! The editor facade: one workspace, one renderer, one gesture and at most
//! one drag in flight.
//!
//! Hosts feed [`InputEvent`]s to [`Editor::handle`] and call
//! [`Editor::tick`] from their frame loop to get effect frames to paint.

use crate::drag::{BlockDragStrategy, DragContext, DragOutcome, DragStrategy, ItemDragStrategy};
use crate::effects::{EffectFrame, EffectScheduler};
use crate::error::{DragError, Result};
use crate::gesture::{Gesture, GestureAction, GestureTarget};
use crate::input::InputEvent;
use kurbo::{Point, Vec2};
use snap_core::{BlockId, ComponentId, Workspace};
use snap_render::{Renderer, drag_target_at, hit_test, hit_test_item};
use std::time::Duration;

/// The drag currently owned by the editor.
#[derive(Debug)]
pub enum ActiveDrag {
    Block(BlockDragStrategy),
    Item(ItemDragStrategy),
}

impl ActiveDrag {
    pub fn strategy(&self) -> &dyn DragStrategy {
        match self {
            ActiveDrag::Block(s) => s,
            ActiveDrag::Item(s) => s,
        }
    }

    pub fn strategy_mut(&mut self) -> &mut dyn DragStrategy {
        match self {
            ActiveDrag::Block(s) => s,
            ActiveDrag::Item(s) => s,
        }
    }

    pub fn as_block(&self) -> Option<&BlockDragStrategy> {
        match self {
            ActiveDrag::Block(s) => Some(s),
            ActiveDrag::Item(_) => None,
        }
    }
}

pub struct Editor {
    pub workspace: Workspace,
    pub effects: EffectScheduler,
    renderer: Box<dyn Renderer>,
    gesture: Gesture,
    active: Option<ActiveDrag>,
    /// The last drag that ended, kept for inspection.
    finished: Option<ActiveDrag>,
}

impl Editor {
    pub fn new(workspace: Workspace, renderer: Box<dyn Renderer>) -> Self {
        let config = workspace.config;
        Self {
            effects: EffectScheduler::new(Duration::from_millis(config.effect_tick_ms)),
            gesture: Gesture::new(config.drag_radius),
            workspace,
            renderer,
            active: None,
            finished: None,
        }
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Swap renderers. Refused mid-drag: the preview method belongs to the
    /// renderer that started it.
    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) -> Result<()> {
        if self.active.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        log::info!("renderer switched to {}", renderer.name());
        self.renderer = renderer;
        Ok(())
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_drag(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    pub fn last_drag(&self) -> Option<&ActiveDrag> {
        self.finished.as_ref()
    }

    pub fn screen_to_workspace(&self, pt: Point) -> Point {
        let scale = self.workspace.scale;
        if scale > 0.0 {
            Point::new(pt.x / scale, pt.y / scale)
        } else {
            pt
        }
    }

    /// What lies under a screen point. Items paint above blocks.
    pub fn hit(&self, screen: Point) -> Option<GestureTarget> {
        let pt = self.screen_to_workspace(screen);
        hit_test_item(&self.workspace, pt)
            .map(GestureTarget::Item)
            .or_else(|| hit_test(&self.workspace, pt).map(GestureTarget::Block))
    }

    /// Feed one input event through the gesture. Returns the outcome when
    /// the event ended a drag.
    pub fn handle(&mut self, event: &InputEvent) -> Result<Option<DragOutcome>> {
        let hit = match event {
            InputEvent::PointerDown { .. } => event.position().and_then(|p| self.hit(p)),
            _ => None,
        };
        let mut outcome = None;
        for action in self.gesture.handle(event, hit) {
            if let Some(o) = self.apply(action)? {
                outcome = Some(o);
            }
        }
        Ok(outcome)
    }

    fn apply(&mut self, action: GestureAction) -> Result<Option<DragOutcome>> {
        match action {
            GestureAction::StartDrag { target, heal } => {
                match self.start_drag(target, heal) {
                    Ok(()) => {}
                    Err(DragError::NotDraggable(id)) => {
                        log::debug!("{id} is not movable; ignoring the drag");
                        self.gesture.cancel();
                    }
                    Err(DragError::ItemNotDraggable(id)) => {
                        log::debug!("{id} is not movable; ignoring the drag");
                        self.gesture.cancel();
                    }
                    Err(e) => return Err(e),
                }
                Ok(None)
            }
            GestureAction::Drag { delta, pointer } if self.active.is_some() => {
                let target = drag_target_at(&self.workspace, pointer);
                self.drag(delta, target)?;
                Ok(None)
            }
            GestureAction::EndDrag { delta, pointer } if self.active.is_some() => {
                let target = drag_target_at(&self.workspace, pointer);
                self.end_drag(delta, target).map(Some)
            }
            GestureAction::Revert if self.active.is_some() => self.revert_drag().map(Some),
            GestureAction::Click(target) => {
                log::debug!("click on {target:?}");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    // ─── Drag lifecycle ──────────────────────────────────────────────────

    pub fn start_drag(&mut self, target: GestureTarget, heal: bool) -> Result<()> {
        if self.active.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        let mut drag = match target {
            GestureTarget::Block(id) => ActiveDrag::Block(BlockDragStrategy::new(&self.workspace, id)),
            GestureTarget::Item(id) => ActiveDrag::Item(ItemDragStrategy::new(id)),
        };
        let mut ctx = DragContext::new(&mut self.workspace, self.renderer.as_ref(), &mut self.effects);
        drag.strategy_mut().start_drag(&mut ctx, heal)?;
        self.active = Some(drag);
        Ok(())
    }

    /// Shorthand for dragging a block without going through the gesture.
    pub fn start_block_drag(&mut self, id: BlockId, heal: bool) -> Result<()> {
        self.start_drag(GestureTarget::Block(id), heal)
    }

    pub fn drag(&mut self, delta: Vec2, target: Option<ComponentId>) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Err(DragError::NotDragging);
        };
        let mut ctx = DragContext::new(&mut self.workspace, self.renderer.as_ref(), &mut self.effects);
        active.strategy_mut().drag(&mut ctx, delta, target)
    }

    pub fn end_drag(&mut self, delta: Vec2, target: Option<ComponentId>) -> Result<DragOutcome> {
        let Some(mut active) = self.active.take() else {
            return Err(DragError::NotDragging);
        };
        let mut ctx = DragContext::new(&mut self.workspace, self.renderer.as_ref(), &mut self.effects);
        let outcome = active.strategy_mut().end_drag(&mut ctx, delta, target);
        self.finished = Some(active);
        outcome
    }

    pub fn revert_drag(&mut self) -> Result<DragOutcome> {
        let Some(mut active) = self.active.take() else {
            return Err(DragError::NotDragging);
        };
        let mut ctx = DragContext::new(&mut self.workspace, self.renderer.as_ref(), &mut self.effects);
        let outcome = active.strategy_mut().revert_drag(&mut ctx);
        self.finished = Some(active);
        self.gesture.cancel();
        outcome
    }

    /// Advance effects by one tick.
    pub fn tick(&mut self) -> Vec<EffectFrame> {
        self.effects.poll()
    }
}
