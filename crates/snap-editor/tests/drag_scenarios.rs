//! Integration tests: block drags end to end (snap-editor ↔ snap-core).
//!
//! Drives `BlockDragStrategy` and the `Editor` facade against a live
//! workspace and checks previews, drops, deletes and reverts.

use pretty_assertions::assert_eq;
use snap_core::*;
use snap_editor::*;
use snap_render::{ClassicRenderer, FlatRenderer, Renderer};
use std::cell::RefCell;
use std::rc::Rc;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn statement(id: &str) -> BlockTemplate {
    BlockTemplate::new("stmt", 120.0, 24.0)
        .id(id)
        .previous(ConnectionSpec::at(16.0, 0.0))
        .next(ConnectionSpec::at(16.0, 24.0))
}

fn number(id: &str) -> BlockTemplate {
    BlockTemplate::new("math_number", 40.0, 20.0)
        .id(id)
        .output(ConnectionSpec::at(0.0, 5.0))
}

fn print(id: &str) -> BlockTemplate {
    BlockTemplate::new("text_print", 100.0, 30.0)
        .id(id)
        .value_input("TEXT", ConnectionSpec::at(60.0, 5.0))
}

fn workspace() -> Workspace {
    init_logs();
    Workspace::with_seed(SnapConfig::default(), 7)
}

fn conn(ws: &Workspace, id: BlockId, pick: impl Fn(&Block) -> Option<ConnectionId>) -> ConnectionId {
    pick(ws.block(id).unwrap()).unwrap()
}

fn input(ws: &Workspace, id: BlockId, name: &str) -> ConnectionId {
    ws.block(id).unwrap().input(name).unwrap().connection.unwrap()
}

/// Owns everything a `DragContext` borrows.
struct Rig {
    ws: Workspace,
    renderer: Box<dyn Renderer>,
    effects: EffectScheduler,
}

impl Rig {
    fn new(ws: Workspace) -> Self {
        Self::with_renderer(ws, Box::new(ClassicRenderer))
    }

    fn with_renderer(ws: Workspace, renderer: Box<dyn Renderer>) -> Self {
        Self {
            ws,
            renderer,
            effects: EffectScheduler::default(),
        }
    }

    fn ctx(&mut self) -> DragContext<'_> {
        DragContext::new(&mut self.ws, self.renderer.as_ref(), &mut self.effects)
    }
}

/// A delete area that logs every callback it receives.
struct Trash {
    id: ComponentId,
    rect: Rect,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl DragTarget for Trash {
    fn client_rect(&self) -> Option<Rect> {
        Some(self.rect)
    }
    fn on_drag_enter(&mut self, _dragged: &Dragged) {
        self.log.borrow_mut().push("enter");
    }
    fn on_drag_exit(&mut self, _dragged: &Dragged) {
        self.log.borrow_mut().push("exit");
    }
    fn on_drop(&mut self, _dragged: &Dragged) {
        self.log.borrow_mut().push("drop");
    }
}

impl DeleteArea for Trash {
    fn would_delete(&mut self, dragged: &Dragged, _could_connect: bool) -> bool {
        dragged.is_deletable()
    }
}

impl Component for Trash {
    fn id(&self) -> ComponentId {
        self.id
    }
    fn as_drag_target(&mut self) -> Option<&mut dyn DragTarget> {
        Some(self)
    }
    fn as_drag_target_ref(&self) -> Option<&dyn DragTarget> {
        Some(self)
    }
    fn as_delete_area(&mut self) -> Option<&mut dyn DeleteArea> {
        Some(self)
    }
}

fn add_trash(ws: &mut Workspace, name: &str) -> (ComponentId, Rc<RefCell<Vec<&'static str>>>) {
    let id = ComponentId::intern(name);
    let log = Rc::new(RefCell::new(Vec::new()));
    ws.components.register(
        Box::new(Trash {
            id,
            rect: Rect::new(600.0, 0.0, 700.0, 100.0),
            log: log.clone(),
        }),
        0,
        &[Capability::DragTarget, Capability::DeleteArea],
    );
    (id, log)
}

// ─── Insertion markers ───────────────────────────────────────────────────

#[test]
fn empty_input_in_range_previews_with_a_marker_then_connects() {
    let mut ws = workspace();
    let holder = ws.add_block(&print("im_holder"), Point::new(200.0, 0.0)).unwrap();
    let value = ws.add_block(&number("im_value"), Point::new(0.0, 100.0)).unwrap();
    let slot = input(&ws, holder, "TEXT");
    let out = conn(&ws, value, |b| b.output);
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, value);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    // Output lands at (264, 5), 4 px right of the input.
    let delta = Vec2::new(264.0, -100.0);
    drag.drag(&mut rig.ctx(), delta, None).unwrap();

    let candidate = *drag.candidate().unwrap();
    assert_eq!((candidate.local, candidate.neighbour), (out, slot));
    assert_eq!(candidate.distance, 4.0);
    assert_eq!(drag.preview_state(), PreviewState::Previewing);
    let markers = drag.markers();
    assert_eq!(markers.len(), 1);
    assert_eq!(rig.ws.target_block(slot), Some(markers[0]));
    assert!(rig.ws.block(markers[0]).unwrap().visible);
    assert!(rig.ws.connection(slot).unwrap().highlighted);

    let outcome = drag.end_drag(&mut rig.ctx(), delta, None).unwrap();
    assert_eq!(
        outcome,
        DragOutcome::Committed {
            connected: Some((out, slot)),
        }
    );
    assert_eq!(drag.state(), DragState::Committed);
    assert_eq!(rig.ws.target_block(slot), Some(value));
    assert_eq!(rig.ws.block(value).unwrap().xy, Point::new(260.0, 0.0));
    assert!(!rig.ws.contains_block(markers[0]));
    assert!(!rig.ws.connection(slot).unwrap().highlighted);
    assert!(rig.effects.is_playing(EffectKind::Ripple));
    assert_eq!(
        drag.preview_stats(),
        PreviewStats {
            markers_created: 1,
            markers_disposed: 1,
            shown: 1,
            hidden: 1,
        }
    );
    assert!(!rig.ws.is_dragging());
    rig.ws.check_invariants().unwrap();
}

#[test]
fn marker_insertion_mid_stack_moves_the_tail_and_heals_on_drop() {
    let mut ws = workspace();
    let a = ws.add_block(&statement("mid_a"), Point::ZERO).unwrap();
    let c = ws.add_block(&statement("mid_c"), Point::new(0.0, 200.0)).unwrap();
    let b = ws.add_block(&statement("mid_b"), Point::new(300.0, 300.0)).unwrap();
    ws.connect(conn(&ws, a, |x| x.next), conn(&ws, c, |x| x.previous))
        .unwrap();
    assert_eq!(ws.block(c).unwrap().xy, Point::new(0.0, 24.0));
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, b);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    // b's previous lands at (20, 24), 4 px from a's next.
    let delta = Vec2::new(-296.0, -276.0);
    drag.drag(&mut rig.ctx(), delta, None).unwrap();

    let marker = drag.markers()[0];
    assert_eq!(rig.ws.next_block(a), Some(marker));
    assert_eq!(rig.ws.next_block(marker), Some(c));
    assert_eq!(rig.ws.block(c).unwrap().xy, Point::new(0.0, 48.0));

    drag.end_drag(&mut rig.ctx(), delta, None).unwrap();
    assert_eq!(rig.ws.next_block(a), Some(b));
    assert_eq!(rig.ws.next_block(b), Some(c));
    assert_eq!(rig.ws.block(b).unwrap().xy, Point::new(0.0, 24.0));
    assert_eq!(rig.ws.block(c).unwrap().xy, Point::new(0.0, 48.0));
    assert!(!rig.ws.contains_block(marker));
    rig.ws.check_invariants().unwrap();
}

#[test]
fn repeating_a_drag_step_does_not_churn_the_preview() {
    let mut ws = workspace();
    ws.add_block(&print("idem_holder"), Point::new(200.0, 0.0)).unwrap();
    let value = ws.add_block(&number("idem_value"), Point::new(0.0, 100.0)).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, value);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    let delta = Vec2::new(262.0, -100.0);
    drag.drag(&mut rig.ctx(), delta, None).unwrap();
    let before = drag.preview_stats();
    let marker = drag.markers()[0];
    let xy = rig.ws.block(marker).unwrap().xy;

    drag.drag(&mut rig.ctx(), delta, None).unwrap();
    drag.drag(&mut rig.ctx(), delta, None).unwrap();
    assert_eq!(drag.preview_stats(), before);
    assert_eq!(drag.markers()[0], marker);
    assert_eq!(rig.ws.block(marker).unwrap().xy, xy);
}

#[test]
fn hidden_marker_does_not_bump_an_unconnected_drop() {
    let mut ws = workspace();
    let a = ws.add_block(&statement("ghost_a"), Point::ZERO).unwrap();
    let b = ws.add_block(&statement("ghost_b"), Point::new(300.0, 300.0)).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, b);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    drag.drag(&mut rig.ctx(), Vec2::new(-296.0, -276.0), None)
        .unwrap();
    let marker = drag.markers()[0];
    assert_eq!(rig.ws.next_block(a), Some(marker));

    // b's previous is now 34 px from a's next and 10 px from the marker's.
    let away = Vec2::new(-300.0, -242.0);
    drag.drag(&mut rig.ctx(), away, None).unwrap();
    assert_eq!(drag.preview_state(), PreviewState::None);
    assert_eq!(rig.ws.next_block(a), None);
    assert!(!rig.ws.block(marker).unwrap().visible);

    let outcome = drag.end_drag(&mut rig.ctx(), away, None).unwrap();
    assert_eq!(outcome, DragOutcome::Committed { connected: None });
    assert_eq!(rig.ws.block(b).unwrap().xy, Point::new(0.0, 58.0));
    assert!(!rig.ws.contains_block(marker));
    rig.ws.check_invariants().unwrap();
}

#[test]
fn marker_is_rebuilt_when_the_dragged_block_changes_shape() {
    let mut ws = workspace();
    let holder = ws.add_block(&print("regen_holder"), Point::new(200.0, 0.0)).unwrap();
    let value = ws.add_block(&number("regen_value"), Point::new(0.0, 100.0)).unwrap();
    let slot = input(&ws, holder, "TEXT");
    let out = conn(&ws, value, |b| b.output);
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, value);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    let near = Vec2::new(264.0, -100.0);
    drag.drag(&mut rig.ctx(), near, None).unwrap();
    let stale = drag.markers()[0];
    drag.drag(&mut rig.ctx(), Vec2::new(400.0, -100.0), None)
        .unwrap();
    assert_eq!(drag.preview_state(), PreviewState::None);

    // A mutator adds an input while the marker is parked.
    let extra = InputSpec {
        name: "EXTRA".to_string(),
        kind: InputKind::Value,
        connection: Some(ConnectionSpec::at(30.0, 5.0)),
        shadow: None,
        visible: true,
    };
    rig.ws.add_input(value, &extra).unwrap();

    drag.drag(&mut rig.ctx(), near, None).unwrap();
    let fresh = drag.markers()[0];
    assert_ne!(fresh, stale);
    assert!(!rig.ws.contains_block(stale));
    assert_eq!(rig.ws.target_block(slot), Some(fresh));
    assert_eq!(rig.ws.block(fresh).unwrap().inputs.len(), 1);

    let outcome = drag.end_drag(&mut rig.ctx(), near, None).unwrap();
    assert_eq!(
        outcome,
        DragOutcome::Committed {
            connected: Some((out, slot)),
        }
    );
    assert_eq!(
        drag.preview_stats(),
        PreviewStats {
            markers_created: 2,
            markers_disposed: 2,
            shown: 2,
            hidden: 2,
        }
    );
    assert!(!rig.ws.contains_block(fresh));
}

// ─── Hysteresis ──────────────────────────────────────────────────────────

#[test]
fn previewed_candidate_is_kept_until_another_is_clearly_closer() {
    let mut ws = workspace();
    let first = ws.add_block(&print("hy_first"), Point::new(200.0, 0.0)).unwrap();
    let second = ws.add_block(&print("hy_second"), Point::new(200.0, 20.0)).unwrap();
    let value = ws.add_block(&number("hy_value"), Point::new(0.0, 100.0)).unwrap();
    let first_slot = input(&ws, first, "TEXT");
    let second_slot = input(&ws, second, "TEXT");
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, value);
    drag.start_drag(&mut rig.ctx(), false).unwrap();

    // Output at (264, 5): 4 px from the first input.
    drag.drag(&mut rig.ctx(), Vec2::new(264.0, -100.0), None).unwrap();
    assert_eq!(drag.candidate().unwrap().neighbour, first_slot);

    // Output at (260, 17): 12 from the first, 8 from the second. Not
    // enough of an improvement to switch.
    drag.drag(&mut rig.ctx(), Vec2::new(260.0, -88.0), None).unwrap();
    let kept = *drag.candidate().unwrap();
    assert_eq!(kept.neighbour, first_slot);
    assert_eq!(kept.distance, 12.0);

    // Output at (260, 24): 19 from the first, 1 from the second.
    drag.drag(&mut rig.ctx(), Vec2::new(260.0, -81.0), None).unwrap();
    assert_eq!(drag.candidate().unwrap().neighbour, second_slot);
    let stats = drag.preview_stats();
    assert_eq!(stats.markers_created, 1, "the marker is reused");
    assert_eq!(stats.shown, 2);
    assert_eq!(stats.hidden, 1);
    assert_eq!(rig.ws.target_block(first_slot), None);

    drag.revert_drag(&mut rig.ctx()).unwrap();
}

// ─── Other preview methods ───────────────────────────────────────────────

#[test]
fn occupied_input_fades_the_block_that_would_be_replaced() {
    let mut ws = workspace();
    let holder = ws.add_block(&print("fade_holder"), Point::new(200.0, 0.0)).unwrap();
    let old = ws.add_block(&number("fade_old"), Point::ZERO).unwrap();
    let new = ws.add_block(&number("fade_new"), Point::new(0.0, 100.0)).unwrap();
    let slot = input(&ws, holder, "TEXT");
    ws.connect(slot, conn(&ws, old, |b| b.output)).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, new);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    drag.drag(&mut rig.ctx(), Vec2::new(262.0, -100.0), None).unwrap();
    assert!(rig.ws.block(old).unwrap().faded);
    assert!(drag.markers().is_empty());

    let outcome = drag
        .end_drag(&mut rig.ctx(), Vec2::new(262.0, -100.0), None)
        .unwrap();
    assert!(matches!(outcome, DragOutcome::Committed { connected: Some(_) }));
    assert!(!rig.ws.block(old).unwrap().faded);
    assert_eq!(rig.ws.target_block(slot), Some(new));
    assert_eq!(rig.ws.parent(old), None, "the old value is evicted");
    rig.ws.check_invariants().unwrap();
}

#[test]
fn flat_renderer_outlines_empty_inputs_without_highlight() {
    let mut ws = workspace();
    let holder = ws.add_block(&print("flat_holder"), Point::new(200.0, 0.0)).unwrap();
    let value = ws.add_block(&number("flat_value"), Point::new(0.0, 100.0)).unwrap();
    let slot = input(&ws, holder, "TEXT");
    let mut rig = Rig::with_renderer(ws, Box::new(FlatRenderer));

    let mut drag = BlockDragStrategy::new(&rig.ws, value);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    drag.drag(&mut rig.ctx(), Vec2::new(264.0, -100.0), None).unwrap();
    assert_eq!(rig.ws.block(holder).unwrap().highlighted_input, Some(slot));
    assert!(!rig.ws.connection(slot).unwrap().highlighted);
    assert!(drag.markers().is_empty());

    drag.end_drag(&mut rig.ctx(), Vec2::new(264.0, -100.0), None)
        .unwrap();
    assert_eq!(rig.ws.block(holder).unwrap().highlighted_input, None);
    assert_eq!(rig.ws.target_block(slot), Some(value));
    assert_eq!(drag.preview_stats().markers_created, 0);
}

// ─── Delete areas ────────────────────────────────────────────────────────

#[test]
fn dropping_on_a_delete_area_disposes_the_whole_stack() {
    let mut ws = workspace();
    let holder = ws.add_block(&print("del_holder"), Point::ZERO).unwrap();
    let value = ws.add_block(&number("del_value"), Point::new(0.0, 100.0)).unwrap();
    ws.connect(input(&ws, holder, "TEXT"), conn(&ws, value, |b| b.output))
        .unwrap();
    let (trash, log) = add_trash(&mut ws, "trash");
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, holder);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    drag.drag(&mut rig.ctx(), Vec2::new(640.0, 40.0), Some(trash))
        .unwrap();
    assert!(drag.would_delete());
    assert_eq!(drag.candidate(), None);

    let outcome = drag
        .end_drag(&mut rig.ctx(), Vec2::new(640.0, 40.0), Some(trash))
        .unwrap();
    assert_eq!(outcome, DragOutcome::Deleted);
    assert_eq!(drag.state(), DragState::Deleted);
    assert!(!rig.ws.contains_block(holder));
    assert!(!rig.ws.contains_block(value));
    assert_eq!(rig.ws.block_count(), 0);
    assert!(rig.effects.is_playing(EffectKind::Shrink));
    assert_eq!(*log.borrow(), vec!["enter", "drop"]);
    assert!(
        rig.ws
            .events
            .fired()
            .iter()
            .any(|e| matches!(e.kind, EventKind::BlockDelete { block, .. } if block == holder))
    );
    rig.ws.check_invariants().unwrap();
}

#[test]
fn undeletable_blocks_survive_the_delete_area() {
    let mut ws = workspace();
    let keep = ws
        .add_block(&statement("keep").undeletable(), Point::ZERO)
        .unwrap();
    let (trash, log) = add_trash(&mut ws, "trash_keep");
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, keep);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    drag.drag(&mut rig.ctx(), Vec2::new(640.0, 40.0), Some(trash))
        .unwrap();
    assert!(!drag.would_delete());
    drag.drag(&mut rig.ctx(), Vec2::new(100.0, 40.0), None).unwrap();
    let outcome = drag
        .end_drag(&mut rig.ctx(), Vec2::new(100.0, 40.0), None)
        .unwrap();
    assert_eq!(outcome, DragOutcome::Committed { connected: None });
    assert_eq!(rig.ws.block(keep).unwrap().xy, Point::new(100.0, 40.0));
    assert_eq!(*log.borrow(), vec!["enter", "exit"]);
}

// ─── Reverts ─────────────────────────────────────────────────────────────

#[test]
fn revert_reattaches_the_block_to_its_old_parent() {
    let mut ws = workspace();
    let a = ws.add_block(&statement("rv_a"), Point::ZERO).unwrap();
    let b = ws.add_block(&statement("rv_b"), Point::ZERO).unwrap();
    let c = ws.add_block(&statement("rv_c"), Point::ZERO).unwrap();
    ws.connect(conn(&ws, a, |x| x.next), conn(&ws, b, |x| x.previous))
        .unwrap();
    ws.connect(conn(&ws, b, |x| x.next), conn(&ws, c, |x| x.previous))
        .unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, b);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    assert_eq!(drag.start_parent_conn(), Some(conn(&rig.ws, a, |x| x.next)));
    assert_eq!(drag.start_child_conn(), None);
    assert_eq!(rig.ws.parent(b), None);
    assert_eq!(rig.ws.next_block(b), Some(c), "the tail comes along");
    assert!(rig.effects.is_playing(EffectKind::Wobble));

    drag.drag(&mut rig.ctx(), Vec2::new(300.0, 0.0), None).unwrap();
    let outcome = drag.revert_drag(&mut rig.ctx()).unwrap();
    assert_eq!(outcome, DragOutcome::Reverted);
    assert_eq!(drag.state(), DragState::Reverted);
    assert_eq!(rig.ws.next_block(a), Some(b));
    assert_eq!(rig.ws.next_block(b), Some(c));
    assert_eq!(rig.ws.block(b).unwrap().xy, Point::new(0.0, 24.0));
    assert_eq!(rig.ws.block(c).unwrap().xy, Point::new(0.0, 48.0));
    assert!(!rig.effects.is_playing(EffectKind::Wobble));
    rig.ws.check_invariants().unwrap();
}

#[test]
fn revert_before_any_move_leaves_everything_in_place() {
    let mut ws = workspace();
    let lone = ws.add_block(&statement("rv_lone"), Point::new(40.0, 40.0)).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, lone);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    assert!(rig.ws.is_dragging());
    assert_eq!(drag.revert_drag(&mut rig.ctx()).unwrap(), DragOutcome::Reverted);
    assert_eq!(rig.ws.block(lone).unwrap().xy, Point::new(40.0, 40.0));
    assert!(!rig.ws.is_dragging());
    assert!(!rig.ws.block(lone).unwrap().dragging);
    assert_eq!(rig.ws.events.group(), None);
}

#[test]
fn revert_during_a_preview_disposes_the_marker() {
    let mut ws = workspace();
    let holder = ws.add_block(&print("rvp_holder"), Point::new(200.0, 0.0)).unwrap();
    let value = ws.add_block(&number("rvp_value"), Point::new(0.0, 100.0)).unwrap();
    let slot = input(&ws, holder, "TEXT");
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, value);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    drag.drag(&mut rig.ctx(), Vec2::new(264.0, -100.0), None).unwrap();
    let marker = drag.markers()[0];

    drag.revert_drag(&mut rig.ctx()).unwrap();
    assert!(!rig.ws.contains_block(marker));
    assert_eq!(rig.ws.target_block(slot), None);
    assert_eq!(rig.ws.block(value).unwrap().xy, Point::new(0.0, 100.0));
    assert_eq!(
        rig.ws.connection(conn(&rig.ws, value, |b| b.output)).unwrap().pos,
        Point::new(0.0, 105.0)
    );
    rig.ws.check_invariants().unwrap();
}

#[test]
fn second_end_or_revert_is_an_error() {
    let mut ws = workspace();
    let lone = ws.add_block(&statement("twice"), Point::ZERO).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, lone);
    assert!(matches!(
        drag.drag(&mut rig.ctx(), Vec2::ZERO, None),
        Err(DragError::NotDragging)
    ));
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    assert!(matches!(
        drag.start_drag(&mut rig.ctx(), false),
        Err(DragError::AlreadyDragging)
    ));
    drag.end_drag(&mut rig.ctx(), Vec2::ZERO, None).unwrap();
    assert!(matches!(
        drag.revert_drag(&mut rig.ctx()),
        Err(DragError::NotDragging)
    ));
}

#[test]
fn a_failed_drop_still_closes_the_drag() {
    let mut ws = workspace();
    let a = ws.add_block(&statement("fail_a"), Point::ZERO).unwrap();
    let b = ws.add_block(&statement("fail_b"), Point::new(300.0, 300.0)).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, b);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    let delta = Vec2::new(-296.0, -276.0);
    drag.drag(&mut rig.ctx(), delta, None).unwrap();
    let marker = drag.markers()[0];
    assert!(!rig.ws.resizes_enabled());

    // Someone else deletes the marker behind the drag's back.
    rig.ws.dispose_block(marker, true).unwrap();
    let result = drag.end_drag(&mut rig.ctx(), delta, None);

    assert!(matches!(result, Err(DragError::UnknownMarker(m)) if m == marker));
    assert_eq!(drag.state(), DragState::Idle);
    assert!(drag.markers().is_empty());
    assert!(!rig.ws.is_dragging());
    assert!(rig.ws.resizes_enabled());
    assert_eq!(rig.ws.events.group(), None);
    assert!(!rig.ws.block(b).unwrap().dragging);
    assert_eq!(rig.ws.next_block(a), None);

    // The workspace is usable for the next drag.
    let mut again = BlockDragStrategy::new(&rig.ws, b);
    again.start_drag(&mut rig.ctx(), false).unwrap();
    assert_eq!(again.revert_drag(&mut rig.ctx()).unwrap(), DragOutcome::Reverted);
    rig.ws.check_invariants().unwrap();
}

// ─── Healing ─────────────────────────────────────────────────────────────

#[test]
fn healing_drag_leaves_the_tail_behind_and_revert_restores_it() {
    let mut ws = workspace();
    let a = ws.add_block(&statement("heal_a"), Point::ZERO).unwrap();
    let b = ws.add_block(&statement("heal_b"), Point::ZERO).unwrap();
    let c = ws.add_block(&statement("heal_c"), Point::ZERO).unwrap();
    ws.connect(conn(&ws, a, |x| x.next), conn(&ws, b, |x| x.previous))
        .unwrap();
    ws.connect(conn(&ws, b, |x| x.next), conn(&ws, c, |x| x.previous))
        .unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, b);
    drag.start_drag(&mut rig.ctx(), true).unwrap();
    assert_eq!(drag.start_child_conn(), Some(conn(&rig.ws, c, |x| x.previous)));
    assert_eq!(rig.ws.next_block(a), Some(c));
    assert_eq!(rig.ws.next_block(b), None);
    assert_eq!(rig.ws.block(c).unwrap().xy, Point::new(0.0, 24.0));

    drag.drag(&mut rig.ctx(), Vec2::new(400.0, 0.0), None).unwrap();
    drag.revert_drag(&mut rig.ctx()).unwrap();
    assert_eq!(rig.ws.next_block(a), Some(b));
    assert_eq!(rig.ws.next_block(b), Some(c));
    assert_eq!(rig.ws.block(c).unwrap().xy, Point::new(0.0, 48.0));
    rig.ws.check_invariants().unwrap();
}

// ─── Shadows ─────────────────────────────────────────────────────────────

#[test]
fn grabbing_a_shadow_drags_its_parent() {
    let mut ws = workspace();
    let holder = ws
        .add_block(
            &print("sh_holder").with_shadow(
                BlockTemplate::new("text", 30.0, 20.0).output(ConnectionSpec::at(0.0, 0.0)),
            ),
            Point::new(200.0, 0.0),
        )
        .unwrap();
    let slot = input(&ws, holder, "TEXT");
    let shadow = ws.target_block(slot).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, shadow);
    assert_eq!(drag.subject(), DragSubject::Shadow { shadow, parent: holder });
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    drag.end_drag(&mut rig.ctx(), Vec2::new(100.0, 0.0), None)
        .unwrap();

    assert_eq!(rig.ws.block(holder).unwrap().xy, Point::new(300.0, 0.0));
    assert_eq!(rig.ws.target_block(slot), Some(shadow));
    assert_eq!(rig.ws.block(shadow).unwrap().xy, Point::new(360.0, 5.0));
}

#[test]
fn immovable_blocks_refuse_to_start() {
    let mut ws = workspace();
    let pinned = ws
        .add_block(&statement("pinned").immovable(), Point::ZERO)
        .unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, pinned);
    assert!(!drag.is_movable(&rig.ws));
    assert!(matches!(
        drag.start_drag(&mut rig.ctx(), false),
        Err(DragError::NotDraggable(id)) if id == pinned
    ));
    assert_eq!(rig.ws.events.group(), None);
}

// ─── Events ──────────────────────────────────────────────────────────────

#[test]
fn a_drag_opens_and_closes_its_own_group() {
    let mut ws = workspace();
    let lone = ws.add_block(&statement("grp_lone"), Point::ZERO).unwrap();
    ws.events.drain();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, lone);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    let group = rig.ws.events.group();
    assert!(group.is_some());
    drag.end_drag(&mut rig.ctx(), Vec2::new(50.0, 0.0), None)
        .unwrap();

    assert_eq!(rig.ws.events.group(), None);
    let fired = rig.ws.events.drain();
    assert!(!fired.is_empty());
    assert!(fired.iter().all(|e| e.group == group));
    assert!(matches!(
        fired.first().map(|e| &e.kind),
        Some(EventKind::BlockDrag { starting: true, .. })
    ));
    assert!(fired.iter().any(|e| matches!(
        e.kind,
        EventKind::BlockMove {
            reason: MoveReason::Drag,
            ..
        }
    )));
}

#[test]
fn a_drag_joins_an_already_open_group() {
    let mut ws = workspace();
    let lone = ws.add_block(&statement("grp_join"), Point::ZERO).unwrap();
    let outer = ws.events.open_group();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, lone);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    assert_eq!(rig.ws.events.group(), Some(outer));
    drag.end_drag(&mut rig.ctx(), Vec2::new(50.0, 0.0), None)
        .unwrap();
    assert_eq!(rig.ws.events.group(), Some(outer), "the outer group stays open");
}

#[test]
fn previews_fire_no_events() {
    let mut ws = workspace();
    ws.add_block(&print("quiet_holder"), Point::new(200.0, 0.0)).unwrap();
    let value = ws.add_block(&number("quiet_value"), Point::new(0.0, 100.0)).unwrap();
    let mut rig = Rig::new(ws);

    let mut drag = BlockDragStrategy::new(&rig.ws, value);
    drag.start_drag(&mut rig.ctx(), false).unwrap();
    rig.ws.events.drain();
    drag.drag(&mut rig.ctx(), Vec2::new(264.0, -100.0), None).unwrap();
    drag.drag(&mut rig.ctx(), Vec2::new(0.0, 0.0), None).unwrap();
    assert!(rig.ws.events.fired().is_empty());
    drag.revert_drag(&mut rig.ctx()).unwrap();
}

// ─── Editor and gestures ─────────────────────────────────────────────────

#[test]
fn pointer_gesture_drops_a_value_into_an_input() {
    let mut ws = workspace();
    let holder = ws.add_block(&print("ed_holder"), Point::new(200.0, 0.0)).unwrap();
    let value = ws.add_block(&number("ed_value"), Point::new(0.0, 100.0)).unwrap();
    let slot = input(&ws, holder, "TEXT");
    let mut editor = Editor::new(ws, Box::new(ClassicRenderer));

    editor.handle(&InputEvent::down(10.0, 110.0)).unwrap();
    // Inside the drag radius: still a press.
    editor.handle(&InputEvent::moved(13.0, 110.0)).unwrap();
    assert!(!editor.is_dragging());

    editor.handle(&InputEvent::moved(274.0, 15.0)).unwrap();
    assert!(editor.is_dragging());
    let candidate = editor
        .active_drag()
        .and_then(ActiveDrag::as_block)
        .and_then(|d| d.candidate().copied())
        .unwrap();
    assert_eq!(candidate.neighbour, slot);

    let outcome = editor.handle(&InputEvent::up(274.0, 15.0)).unwrap();
    assert!(matches!(outcome, Some(DragOutcome::Committed { connected: Some(_) })));
    assert_eq!(editor.workspace.target_block(slot), Some(value));
    assert!(editor.last_drag().is_some());

    let frames = editor.tick();
    assert!(frames.iter().any(|f| matches!(f, EffectFrame::Ripple { .. })));
}

#[test]
fn escape_reverts_a_pointer_drag() {
    let mut ws = workspace();
    let lone = ws.add_block(&statement("esc_lone"), Point::new(0.0, 0.0)).unwrap();
    let mut editor = Editor::new(ws, Box::new(ClassicRenderer));

    editor.handle(&InputEvent::down(5.0, 5.0)).unwrap();
    editor.handle(&InputEvent::moved(105.0, 5.0)).unwrap();
    assert_eq!(editor.workspace.block(lone).unwrap().xy, Point::new(100.0, 0.0));

    let outcome = editor.handle(&InputEvent::key("Escape")).unwrap();
    assert_eq!(outcome, Some(DragOutcome::Reverted));
    assert_eq!(editor.workspace.block(lone).unwrap().xy, Point::ZERO);
    assert_eq!(editor.handle(&InputEvent::up(105.0, 5.0)).unwrap(), None);
}

#[test]
fn pointer_drag_onto_the_trash_deletes() {
    let mut ws = workspace();
    let lone = ws.add_block(&statement("trash_lone"), Point::ZERO).unwrap();
    add_trash(&mut ws, "editor_trash");
    let mut editor = Editor::new(ws, Box::new(ClassicRenderer));

    editor.handle(&InputEvent::down(5.0, 5.0)).unwrap();
    editor.handle(&InputEvent::moved(650.0, 50.0)).unwrap();
    let outcome = editor.handle(&InputEvent::up(650.0, 50.0)).unwrap();
    assert_eq!(outcome, Some(DragOutcome::Deleted));
    assert!(!editor.workspace.contains_block(lone));
}

#[test]
fn renderer_cannot_change_mid_drag() {
    let mut ws = workspace();
    let lone = ws.add_block(&statement("swap_lone"), Point::ZERO).unwrap();
    let mut editor = Editor::new(ws, Box::new(ClassicRenderer));

    editor.start_block_drag(lone, false).unwrap();
    assert!(editor.set_renderer(Box::new(FlatRenderer)).is_err());
    editor.end_drag(Vec2::new(10.0, 0.0), None).unwrap();
    editor.set_renderer(Box::new(FlatRenderer)).unwrap();
    assert_eq!(editor.renderer().name(), "flat");
}
