//! Gesture recognition for canvas input.
//!
//! A press only arms a drag. The drag starts once the pointer has travelled
//! farther than the drag radius, so a click with a shaky hand stays a
//! click.
//!
//! ## Modifier behaviors
//!
//! | Modifier | On press over a block |
//! |----------|-----------------------|
//! | **Ctrl / Meta / Alt** | Heal the stack: blocks below stay behind |
//! | **Escape** (key) | Revert the active drag |

use crate::input::InputEvent;
use kurbo::{Point, Vec2};
use snap_core::{BlockId, ItemId};

/// What a press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureTarget {
    Block(BlockId),
    Item(ItemId),
}

/// Drag calls the gesture asks its owner to make. Deltas are in pixels
/// from the press point; `pointer` is the current screen position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    StartDrag { target: GestureTarget, heal: bool },
    Drag { delta: Vec2, pointer: Point },
    EndDrag { delta: Vec2, pointer: Point },
    Revert,
    Click(GestureTarget),
}

#[derive(Debug, Clone, Copy)]
struct Press {
    start: Point,
    target: GestureTarget,
    heal: bool,
}

#[derive(Debug, Clone)]
pub struct Gesture {
    drag_radius: f64,
    press: Option<Press>,
    dragging: bool,
}

impl Gesture {
    pub fn new(drag_radius: f64) -> Self {
        Self {
            drag_radius,
            press: None,
            dragging: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Forget the current press without emitting anything.
    pub fn cancel(&mut self) {
        self.press = None;
        self.dragging = false;
    }

    /// Handle an input event. `hit` is what lies under a pointer-down.
    pub fn handle(&mut self, event: &InputEvent, hit: Option<GestureTarget>) -> Vec<GestureAction> {
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                if self.press.is_some() {
                    // A second pointer while one is down is ignored.
                    return vec![];
                }
                self.dragging = false;
                self.press = hit.map(|target| Press {
                    start: Point::new(*x, *y),
                    target,
                    heal: event.modifiers().heals_stack(),
                });
                vec![]
            }
            InputEvent::PointerMove { x, y, .. } => {
                let Some(press) = self.press else {
                    return vec![];
                };
                let pointer = Point::new(*x, *y);
                let delta = pointer - press.start;
                let mut actions = Vec::new();
                if !self.dragging {
                    if delta.hypot() <= self.drag_radius {
                        return actions;
                    }
                    self.dragging = true;
                    actions.push(GestureAction::StartDrag {
                        target: press.target,
                        heal: press.heal,
                    });
                }
                actions.push(GestureAction::Drag { delta, pointer });
                actions
            }
            InputEvent::PointerUp { x, y, .. } => {
                let Some(press) = self.press.take() else {
                    return vec![];
                };
                let was_dragging = std::mem::replace(&mut self.dragging, false);
                if was_dragging {
                    let pointer = Point::new(*x, *y);
                    vec![GestureAction::EndDrag {
                        delta: pointer - press.start,
                        pointer,
                    }]
                } else {
                    vec![GestureAction::Click(press.target)]
                }
            }
            InputEvent::PointerCancel => self.revert(),
            InputEvent::Key { key, .. } if key == "Escape" => self.revert(),
            InputEvent::Key { .. } => vec![],
        }
    }

    fn revert(&mut self) -> Vec<GestureAction> {
        let was_dragging = self.dragging;
        self.cancel();
        if was_dragging {
            vec![GestureAction::Revert]
        } else {
            vec![]
        }
    }
}
