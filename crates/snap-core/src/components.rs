//! Registry of UI components keyed by explicit capability tags.
//!
//! A component declares the capabilities it has at registration time.
//! Lookups go through the tag first, and only then through the trait view
//! the component exposes, so a region that happens to implement
//! [`DeleteArea`] is not treated as one unless it was registered with
//! [`Capability::DeleteArea`].

use crate::id::{BlockId, ComponentId, ItemId};
use kurbo::Rect;
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Positionable,
    DragTarget,
    DeleteArea,
    AutoHideable,
}

/// What is being dragged, as seen by drag targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dragged {
    Block { id: BlockId, deletable: bool },
    Item { id: ItemId, deletable: bool },
}

impl Dragged {
    pub fn is_deletable(&self) -> bool {
        match *self {
            Dragged::Block { deletable, .. } | Dragged::Item { deletable, .. } => deletable,
        }
    }
}

/// A UI region that reacts to things dragged over it.
pub trait DragTarget {
    /// Screen-space bounds, or `None` while hidden.
    fn client_rect(&self) -> Option<Rect>;

    fn on_drag_enter(&mut self, _dragged: &Dragged) {}
    fn on_drag_over(&mut self, _dragged: &Dragged) {}
    fn on_drag_exit(&mut self, _dragged: &Dragged) {}
    fn on_drop(&mut self, _dragged: &Dragged) {}

    /// Refuse the drop; the dragged thing returns to where it started.
    fn should_prevent_move(&self, _dragged: &Dragged) -> bool {
        false
    }
}

/// A drag target that deletes what is dropped on it.
pub trait DeleteArea {
    /// `could_connect` is true when the dragged block currently has a
    /// connection candidate.
    fn would_delete(&mut self, dragged: &Dragged, could_connect: bool) -> bool;
}

pub trait AutoHideable {
    fn auto_hide(&mut self, only_closed_popups: bool);
}

/// A registered UI component. The trait views default to absent.
pub trait Component {
    fn id(&self) -> ComponentId;

    fn bounds(&self) -> Option<Rect> {
        None
    }

    fn as_drag_target(&mut self) -> Option<&mut dyn DragTarget> {
        None
    }

    fn as_drag_target_ref(&self) -> Option<&dyn DragTarget> {
        None
    }

    fn as_delete_area(&mut self) -> Option<&mut dyn DeleteArea> {
        None
    }

    fn as_auto_hideable(&mut self) -> Option<&mut dyn AutoHideable> {
        None
    }
}

struct Entry {
    component: Box<dyn Component>,
    weight: i32,
    capabilities: SmallVec<[Capability; 4]>,
}

#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<Entry>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| (e.component.id(), e.weight, &e.capabilities)),
            )
            .finish()
    }
}

impl ComponentRegistry {
    /// Register a component. Replaces any component with the same id.
    pub fn register(
        &mut self,
        component: Box<dyn Component>,
        weight: i32,
        capabilities: &[Capability],
    ) {
        let id = component.id();
        if self.unregister(id) {
            log::warn!("component {id} registered twice; replacing");
        }
        self.entries.push(Entry {
            component,
            weight,
            capabilities: capabilities.iter().copied().collect(),
        });
    }

    pub fn unregister(&mut self, id: ComponentId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.component.id() != id);
        before != self.entries.len()
    }

    fn entry(&self, id: ComponentId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.component.id() == id)
    }

    fn entry_mut(&mut self, id: ComponentId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.component.id() == id)
    }

    pub fn has_capability(&self, id: ComponentId, cap: Capability) -> bool {
        self.entry(id).is_some_and(|e| e.capabilities.contains(&cap))
    }

    pub fn add_capability(&mut self, id: ComponentId, cap: Capability) {
        if let Some(e) = self.entry_mut(id)
            && !e.capabilities.contains(&cap)
        {
            e.capabilities.push(cap);
        }
    }

    pub fn remove_capability(&mut self, id: ComponentId, cap: Capability) {
        if let Some(e) = self.entry_mut(id) {
            e.capabilities.retain(|c| *c != cap);
        }
    }

    /// Ids of every component with `cap`, lightest weight first when
    /// `sorted`, otherwise in registration order.
    pub fn components_by_capability(&self, cap: Capability, sorted: bool) -> Vec<ComponentId> {
        let mut hits: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| e.capabilities.contains(&cap))
            .collect();
        if sorted {
            hits.sort_by_key(|e| e.weight);
        }
        hits.into_iter().map(|e| e.component.id()).collect()
    }

    pub fn get(&self, id: ComponentId) -> Option<&dyn Component> {
        self.entry(id).map(|e| e.component.as_ref())
    }

    pub fn drag_target(&self, id: ComponentId) -> Option<&dyn DragTarget> {
        self.entry(id)
            .filter(|e| e.capabilities.contains(&Capability::DragTarget))
            .and_then(|e| e.component.as_drag_target_ref())
    }

    pub fn drag_target_mut(&mut self, id: ComponentId) -> Option<&mut dyn DragTarget> {
        self.entry_mut(id)
            .filter(|e| e.capabilities.contains(&Capability::DragTarget))
            .and_then(|e| e.component.as_drag_target())
    }

    pub fn delete_area_mut(&mut self, id: ComponentId) -> Option<&mut dyn DeleteArea> {
        self.entry_mut(id)
            .filter(|e| e.capabilities.contains(&Capability::DeleteArea))
            .and_then(|e| e.component.as_delete_area())
    }

    /// Hide every auto-hideable component (flyouts, open popups).
    pub fn auto_hide_all(&mut self, only_closed_popups: bool) {
        for e in &mut self.entries {
            if !e.capabilities.contains(&Capability::AutoHideable) {
                continue;
            }
            if let Some(h) = e.component.as_auto_hideable() {
                h.auto_hide(only_closed_popups);
            }
        }
    }
}
