//! The workspace: block arena, connection arena and the four connection
//! indexes.
//!
//! Blocks are nodes of a `StableDiGraph`; an edge runs from parent to
//! child and carries the parent-side connection. Connections sit in a flat
//! arena and are never reused, so a disposed connection id resolves to
//! `None`.
//!
//! Every connection's `pos` mirrors what its index holds. Positions are
//! only written through [`Workspace::set_connection_position`], which keeps
//! the index sorted and handles the tracked state.

use crate::checker::ConnectionChecker;
use crate::components::ComponentRegistry;
use crate::config::SnapConfig;
use crate::connection_db::ConnectionIndex;
use crate::error::{Result, SnapError};
use crate::events::{EventBus, EventKind, MoveReason};
use crate::id::{BlockId, ConnectionId, ItemId};
use crate::model::{
    Block, BlockTemplate, Connection, ConnectionKind, ConnectionSpec, Input, InputKind, InputSpec,
    TrackedState,
};
use kurbo::{Point, Rect, Size, Vec2};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use rand::SeedableRng;
use rand::rngs::StdRng;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

// ─── Floating items ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Free-standing workspace comment.
    Comment,
    /// Bubble anchored to a block (comment, warning or mutator bubble).
    Bubble,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatingItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub xy: Point,
    pub size: Size,
    pub movable: bool,
    pub deletable: bool,
    pub dragging: bool,
}

impl FloatingItem {
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.xy, self.size)
    }
}

/// A bump requested while a drag was in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingBump {
    pub conn: ConnectionId,
    pub away_from: ConnectionId,
}

// ─── Workspace ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Workspace {
    pub(crate) graph: StableDiGraph<Block, ConnectionId>,
    pub(crate) id_index: HashMap<BlockId, NodeIndex>,
    pub(crate) connections: Vec<Option<Connection>>,
    pub(crate) dbs: [ConnectionIndex; 4],
    /// Top-level blocks, back to front.
    pub(crate) z_order: Vec<BlockId>,
    pub(crate) items: BTreeMap<ItemId, FloatingItem>,
    next_item: u32,

    pub events: EventBus,
    pub components: ComponentRegistry,
    pub config: SnapConfig,
    pub checker: ConnectionChecker,

    /// Right-to-left layout.
    pub rtl: bool,
    /// Pixels per workspace unit.
    pub scale: f64,
    /// Scrollable bounds of a workspace without scrollbars.
    pub(crate) fixed_bounds: Option<Rect>,

    pub(crate) dragging: bool,
    pub(crate) resizes_enabled: bool,
    pub(crate) pending_bumps: Vec<PendingBump>,
    pub(crate) rng: StdRng,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(SnapConfig::default())
    }
}

impl Workspace {
    pub fn new(config: SnapConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic bump jitter, for tests and replays.
    pub fn with_seed(config: SnapConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SnapConfig, rng: StdRng) -> Self {
        Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            connections: Vec::new(),
            dbs: ConnectionKind::ALL.map(ConnectionIndex::new),
            z_order: Vec::new(),
            items: BTreeMap::new(),
            next_item: 0,
            events: EventBus::new(),
            components: ComponentRegistry::default(),
            config: config.normalized(),
            checker: ConnectionChecker,
            rtl: false,
            scale: 1.0,
            fixed_bounds: None,
            dragging: false,
            resizes_enabled: true,
            pending_bumps: Vec::new(),
            rng,
        }
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Mutable access for presentation flags. Geometry and links must go
    /// through the workspace methods so the indexes stay consistent.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn try_block(&self, id: BlockId) -> Result<&Block> {
        self.block(id).ok_or(SnapError::UnknownBlock(id))
    }

    pub(crate) fn node(&self, id: BlockId) -> Result<NodeIndex> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(SnapError::UnknownBlock(id))
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn block_count(&self) -> usize {
        self.id_index.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.graph.node_weights()
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn try_connection(&self, id: ConnectionId) -> Result<&Connection> {
        self.connection(id).ok_or(SnapError::UnknownConnection(id))
    }

    pub fn index(&self, kind: ConnectionKind) -> &ConnectionIndex {
        &self.dbs[kind.slot()]
    }

    /// Top-level blocks, back to front.
    pub fn top_blocks(&self) -> &[BlockId] {
        &self.z_order
    }

    // ─── Tree ────────────────────────────────────────────────────────────

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        let idx = self.id_index.get(&id)?;
        self.graph
            .neighbors_directed(*idx, Direction::Incoming)
            .next()
            .map(|p| self.graph[p].id)
    }

    /// The superior connection this block hangs from.
    pub fn parent_connection(&self, id: BlockId) -> Option<ConnectionId> {
        let idx = self.id_index.get(&id)?;
        self.graph
            .edges_directed(*idx, Direction::Incoming)
            .next()
            .map(|e| *e.weight())
    }

    /// Children in layout order: inputs first, then the next block.
    pub fn children(&self, id: BlockId) -> Vec<BlockId> {
        let Some(block) = self.block(id) else {
            return Vec::new();
        };
        block
            .inputs
            .iter()
            .filter_map(|i| i.connection)
            .chain(block.next)
            .filter_map(|c| self.target_block(c))
            .collect()
    }

    /// `id` followed by every block below it, depth first.
    pub fn descendants(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(b) = stack.pop() {
            if !self.contains_block(b) {
                continue;
            }
            out.push(b);
            let mut kids = self.children(b);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    pub fn root_of(&self, id: BlockId) -> BlockId {
        let mut current = id;
        while let Some(p) = self.parent(current) {
            current = p;
        }
        current
    }

    /// Whether `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: BlockId, descendant: BlockId) -> bool {
        let mut current = descendant;
        while let Some(p) = self.parent(current) {
            if p == ancestor {
                return true;
            }
            current = p;
        }
        false
    }

    pub fn target_block(&self, conn: ConnectionId) -> Option<BlockId> {
        let target = self.connection(conn)?.target?;
        self.connection(target).map(|c| c.owner)
    }

    pub fn next_block(&self, id: BlockId) -> Option<BlockId> {
        self.target_block(self.block(id)?.next?)
    }

    /// The block whose next connection holds this one.
    pub fn previous_block(&self, id: BlockId) -> Option<BlockId> {
        self.target_block(self.block(id)?.previous?)
    }

    /// Walk the next chain and return the first free next connection. With
    /// `ignore_shadows`, a next connection holding a shadow counts as free.
    pub fn last_connection_in_stack(&self, id: BlockId, ignore_shadows: bool) -> Option<ConnectionId> {
        let mut block = id;
        loop {
            let next = self.block(block)?.next?;
            match self.target_block(next) {
                None => return Some(next),
                Some(t) if ignore_shadows && self.block(t).is_some_and(|b| b.shadow) => {
                    return Some(next);
                }
                Some(t) => block = t,
            }
        }
    }

    /// The block's single value input, if it has exactly one.
    pub fn only_value_connection(&self, id: BlockId) -> Option<ConnectionId> {
        let block = self.block(id)?;
        let mut values = block
            .inputs
            .iter()
            .filter_map(|i| i.connection)
            .filter(|c| self.connection(*c).is_some_and(|c| c.kind == ConnectionKind::Input));
        let first = values.next()?;
        values.next().is_none().then_some(first)
    }

    // ─── Creation and disposal ───────────────────────────────────────────

    /// Create a block (plus any shadow children its inputs declare) at `xy`.
    pub fn add_block(&mut self, template: &BlockTemplate, xy: Point) -> Result<BlockId> {
        let id = self.create_block(template, xy, false)?;
        self.events.disable();
        let spawned = self.spawn_shadows(id);
        self.events.enable();
        spawned?;
        let descendants = self.descendants(id);
        self.events.fire(EventKind::BlockCreate {
            block: id,
            descendants,
        });
        Ok(id)
    }

    /// Create a hidden, non-interactive clone of `source` for previews.
    /// Copies fields, mutation and the collapsed/inline flags, but no
    /// children and no shadows.
    pub fn add_insertion_marker(&mut self, source: BlockId) -> Result<BlockId> {
        let mut template = self.template_of(source, false)?;
        template.id = None;
        template.shadow = false;
        let id = self.create_block(&template, Point::ZERO, true)?;
        log::debug!("created insertion marker {id} for {source}");
        Ok(id)
    }

    fn create_block(&mut self, template: &BlockTemplate, xy: Point, marker: bool) -> Result<BlockId> {
        let id = match &template.id {
            Some(name) => BlockId::intern(name),
            None if marker => BlockId::with_prefix("marker"),
            None => BlockId::anonymous(),
        };
        if self.contains_block(id) {
            return Err(SnapError::DuplicateBlock(id));
        }

        let output = template
            .output
            .as_ref()
            .map(|s| self.alloc_connection(id, ConnectionKind::Output, s, xy, None));
        let previous = template
            .previous
            .as_ref()
            .map(|s| self.alloc_connection(id, ConnectionKind::PreviousStatement, s, xy, None));
        let next = template
            .next
            .as_ref()
            .map(|s| self.alloc_connection(id, ConnectionKind::NextStatement, s, xy, None));
        let inputs = template
            .inputs
            .iter()
            .map(|spec| self.alloc_input(id, spec, xy, !marker))
            .collect();

        let block = Block {
            id,
            type_name: template.type_name.clone(),
            xy,
            size: template.size,
            output,
            previous,
            next,
            inputs,
            fields: template.fields.clone(),
            mutation: template.mutation.clone(),
            shadow: template.shadow,
            insertion_marker: marker,
            movable: template.movable || marker,
            deletable: template.deletable,
            collapsed: template.collapsed,
            inline_inputs: template.inline_inputs,
            visible: !marker,
            dragging: false,
            faded: false,
            highlighted_input: None,
        };
        let idx = self.graph.add_node(block);
        self.id_index.insert(id, idx);
        self.z_order.push(id);
        self.sync_connections(id)?;
        if template.collapsed {
            self.apply_collapsed(id, true)?;
        }
        Ok(id)
    }

    fn alloc_input(&mut self, owner: BlockId, spec: &InputSpec, xy: Point, with_shadow: bool) -> Input {
        let kind = match spec.kind {
            InputKind::Value => Some(ConnectionKind::Input),
            InputKind::Statement => Some(ConnectionKind::NextStatement),
            InputKind::Dummy => None,
        };
        let connection = match (kind, &spec.connection) {
            (Some(kind), Some(c)) => {
                let shadow = spec.shadow.clone().filter(|_| with_shadow);
                Some(self.alloc_connection(owner, kind, c, xy, shadow))
            }
            _ => None,
        };
        Input {
            name: spec.name.clone(),
            kind: spec.kind,
            connection,
            visible: spec.visible,
        }
    }

    fn alloc_connection(
        &mut self,
        owner: BlockId,
        kind: ConnectionKind,
        spec: &ConnectionSpec,
        xy: Point,
        shadow: Option<Box<BlockTemplate>>,
    ) -> ConnectionId {
        let id = ConnectionId(self.connections.len() as u32);
        self.connections.push(Some(Connection {
            id,
            kind,
            owner,
            offset: spec.offset,
            pos: xy + spec.offset,
            checks: spec.interned_checks(),
            target: None,
            tracked: TrackedState::WillTrack,
            shadow,
            highlighted: false,
        }));
        id
    }

    fn spawn_shadows(&mut self, id: BlockId) -> Result<()> {
        let slots: SmallVec<[ConnectionId; 4]> = self
            .try_block(id)?
            .inputs
            .iter()
            .filter_map(|i| i.connection)
            .collect();
        for conn in slots {
            self.respawn_shadow(conn)?;
        }
        Ok(())
    }

    /// Append an input to an existing block, as a mutator would.
    pub fn add_input(&mut self, id: BlockId, spec: &InputSpec) -> Result<Option<ConnectionId>> {
        let xy = self.try_block(id)?.xy;
        let input = self.alloc_input(id, spec, xy, true);
        let conn = input.connection;
        let idx = self.node(id)?;
        self.graph[idx].inputs.push(input);
        if let Some(c) = conn {
            if !self.dragging {
                let offset = self.try_connection(c)?.offset;
                self.set_connection_position(c, xy + offset)?;
            }
            self.respawn_shadow(c)?;
        }
        Ok(conn)
    }

    /// Build a template describing `id` alone.
    pub fn template_of(&self, id: BlockId, with_shadows: bool) -> Result<BlockTemplate> {
        let block = self.try_block(id)?;
        let spec = |c: Option<ConnectionId>| {
            c.and_then(|c| self.connection(c)).map(|c| ConnectionSpec {
                offset: c.offset,
                checks: c
                    .checks
                    .as_ref()
                    .map(|t| t.iter().map(|t| t.as_str().to_string()).collect()),
            })
        };
        let inputs = block
            .inputs
            .iter()
            .map(|i| InputSpec {
                name: i.name.clone(),
                kind: i.kind,
                connection: spec(i.connection),
                shadow: i
                    .connection
                    .and_then(|c| self.connection(c))
                    .and_then(|c| c.shadow.clone())
                    .filter(|_| with_shadows),
                visible: i.visible,
            })
            .collect();
        Ok(BlockTemplate {
            type_name: block.type_name.clone(),
            id: None,
            size: block.size,
            output: spec(block.output),
            previous: spec(block.previous),
            next: spec(block.next),
            inputs,
            fields: block.fields.clone(),
            mutation: block.mutation.clone(),
            shadow: block.shadow,
            movable: block.movable,
            deletable: block.deletable,
            collapsed: block.collapsed,
            inline_inputs: block.inline_inputs,
        })
    }

    /// Dispose `id` and everything below it. With `heal`, the block is
    /// first unplugged with healing so its tail stays on the workspace.
    pub fn dispose_block(&mut self, id: BlockId, heal: bool) -> Result<()> {
        self.unplug(id, heal)?;
        let doomed = self.descendants(id);
        self.events.fire(EventKind::BlockDelete {
            block: id,
            descendants: doomed.clone(),
        });
        for b in doomed.iter().rev() {
            let idx = self.node(*b)?;
            let conns = self.graph[idx].connections(true);
            for conn in conns {
                self.forget_connection(conn)?;
            }
            self.graph.remove_node(idx);
            self.id_index.remove(b);
        }
        self.z_order.retain(|b| *b != id);
        Ok(())
    }

    fn forget_connection(&mut self, conn: ConnectionId) -> Result<()> {
        let c = self.try_connection(conn)?;
        if c.tracked == TrackedState::Tracked {
            let (kind, y) = (c.kind, c.pos.y);
            self.dbs[kind.slot()].remove(conn, y)?;
        }
        self.pending_bumps
            .retain(|p| p.conn != conn && p.away_from != conn);
        self.connections[conn.index()] = None;
        Ok(())
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    pub fn block_rect(&self, id: BlockId) -> Option<Rect> {
        self.block(id).map(Block::rect)
    }

    /// Union of the rects of `id` and its descendants.
    pub fn stack_bounds(&self, id: BlockId) -> Option<Rect> {
        self.descendants(id)
            .into_iter()
            .filter_map(|b| self.block_rect(b))
            .reduce(|a, b| a.union(b))
    }

    /// Move a top-level block (and its children) by `delta`.
    pub fn move_by(&mut self, id: BlockId, delta: Vec2, reason: MoveReason) -> Result<()> {
        if let Some(parent) = self.parent(id) {
            log::warn!("move_by on {id}, which is attached to {parent}; moving the subtree anyway");
        }
        let old_xy = self.try_block(id)?.xy;
        self.translate_subtree(id, delta, true)?;
        self.events.fire(EventKind::BlockMove {
            block: id,
            old_parent: None,
            new_parent: None,
            old_xy,
            new_xy: old_xy + delta,
            reason,
        });
        Ok(())
    }

    pub fn move_to(&mut self, id: BlockId, xy: Point, reason: MoveReason) -> Result<()> {
        let delta = xy - self.try_block(id)?.xy;
        self.move_by(id, delta, reason)
    }

    /// Visual move during a drag: block positions change, connection
    /// positions stay where the index has them. No events.
    pub fn move_during_drag(&mut self, id: BlockId, xy: Point) -> Result<()> {
        let delta = xy - self.try_block(id)?.xy;
        self.translate_subtree(id, delta, false)
    }

    pub(crate) fn translate_subtree(&mut self, id: BlockId, delta: Vec2, sync: bool) -> Result<()> {
        for b in self.descendants(id) {
            let idx = self.node(b)?;
            self.graph[idx].xy += delta;
            if sync {
                self.sync_connections(b)?;
            }
        }
        Ok(())
    }

    /// Where `conn` is right now, from its owner's position. Differs from
    /// the indexed `pos` while the owner is being dragged.
    pub fn connection_location(&self, conn: ConnectionId) -> Result<Point> {
        let c = self.try_connection(conn)?;
        Ok(self.try_block(c.owner)?.xy + c.offset)
    }

    /// Rewrite every connection of `id` from its block position.
    pub fn sync_connections(&mut self, id: BlockId) -> Result<()> {
        let block = self.try_block(id)?;
        let xy = block.xy;
        for conn in block.connections(true) {
            let offset = self.try_connection(conn)?.offset;
            self.set_connection_position(conn, xy + offset)?;
        }
        Ok(())
    }

    /// Rewrite connection positions for `id` and all its descendants.
    pub fn sync_stack_connections(&mut self, id: BlockId) -> Result<()> {
        for b in self.descendants(id) {
            self.sync_connections(b)?;
        }
        Ok(())
    }

    /// The only writer of `Connection::pos`.
    pub(crate) fn set_connection_position(&mut self, conn: ConnectionId, pos: Point) -> Result<()> {
        let c = self.try_connection(conn)?;
        let (kind, old, state) = (c.kind, c.pos, c.tracked);
        let db = &mut self.dbs[kind.slot()];
        let state = match state {
            TrackedState::WillTrack => {
                db.insert(conn, pos);
                TrackedState::Tracked
            }
            TrackedState::Tracked => {
                db.move_to(conn, old.y, pos)?;
                TrackedState::Tracked
            }
            TrackedState::Untracked => TrackedState::Untracked,
        };
        if let Some(c) = self.connection_mut(conn) {
            c.pos = pos;
            c.tracked = state;
        }
        Ok(())
    }

    // ─── Tracking ────────────────────────────────────────────────────────

    pub fn set_tracking(&mut self, conn: ConnectionId, on: bool) -> Result<()> {
        let c = self.try_connection(conn)?;
        let (kind, pos, state) = (c.kind, c.pos, c.tracked);
        let next = match (on, state) {
            (true, TrackedState::Tracked) | (false, TrackedState::Untracked) => return Ok(()),
            (true, _) => {
                self.dbs[kind.slot()].insert(conn, pos);
                TrackedState::Tracked
            }
            (false, TrackedState::Tracked) => {
                self.dbs[kind.slot()].remove(conn, pos.y)?;
                TrackedState::Untracked
            }
            (false, TrackedState::WillTrack) => TrackedState::Untracked,
        };
        if let Some(c) = self.connection_mut(conn) {
            c.tracked = next;
        }
        Ok(())
    }

    /// Untrack `conn` and every connection of every block below it.
    pub fn stop_tracking_all(&mut self, conn: ConnectionId) -> Result<()> {
        self.set_tracking(conn, false)?;
        if let Some(child) = self.target_block(conn) {
            for b in self.descendants(child) {
                let conns = self.try_block(b)?.connections(true);
                for c in conns {
                    self.set_tracking(c, false)?;
                }
            }
        }
        Ok(())
    }

    /// Track `conn` and spider down through superior connections. A
    /// collapsed child only reveals its outer connections.
    pub fn start_tracking_all(&mut self, conn: ConnectionId) -> Result<()> {
        self.set_tracking(conn, true)?;
        if !self.try_connection(conn)?.is_superior() {
            return Ok(());
        }
        let Some(child) = self.target_block(conn) else {
            return Ok(());
        };
        let block = self.try_block(child)?;
        let conns: SmallVec<[ConnectionId; 8]> = if block.collapsed {
            block
                .output
                .into_iter()
                .chain(block.next)
                .chain(block.previous)
                .collect()
        } else {
            block.connections(true)
        };
        for c in conns {
            self.start_tracking_all(c)?;
        }
        Ok(())
    }

    pub fn set_collapsed(&mut self, id: BlockId, collapsed: bool) -> Result<()> {
        if self.try_block(id)?.collapsed == collapsed {
            return Ok(());
        }
        self.apply_collapsed(id, collapsed)
    }

    fn apply_collapsed(&mut self, id: BlockId, collapsed: bool) -> Result<()> {
        let idx = self.node(id)?;
        self.graph[idx].collapsed = collapsed;
        let inputs: SmallVec<[ConnectionId; 4]> = self.graph[idx]
            .inputs
            .iter()
            .filter_map(|i| i.connection)
            .collect();
        for conn in inputs {
            if collapsed {
                self.stop_tracking_all(conn)?;
            } else {
                self.start_tracking_all(conn)?;
            }
        }
        Ok(())
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Closest compatible connection to `conn` shifted by `offset`, within
    /// `max_radius`. Applies the drag rules.
    pub fn closest(&self, conn: ConnectionId, max_radius: f64, offset: Vec2) -> Option<(ConnectionId, f64)> {
        let c = self.connection(conn)?;
        let db = &self.dbs[c.kind.opposite().slot()];
        db.search_for_closest(c.pos + offset, max_radius, |cand, _| {
            self.checker.can_connect(self, conn, cand, true)
        })
    }

    /// Every opposite-kind connection within `max_radius` of `conn`,
    /// compatible or not. Insertion markers are not neighbours of anything.
    pub fn neighbours(&self, conn: ConnectionId, max_radius: f64) -> Vec<ConnectionId> {
        let Some(c) = self.connection(conn) else {
            return Vec::new();
        };
        let mut found = self.dbs[c.kind.opposite().slot()].neighbours(c.pos, max_radius);
        found.retain(|n| {
            self.connection(*n)
                .and_then(|n| self.block(n.owner))
                .is_some_and(|b| !b.insertion_marker)
        });
        found
    }

    pub fn set_connection_highlight(&mut self, conn: ConnectionId, on: bool) -> Result<()> {
        self.connection_mut(conn)
            .ok_or(SnapError::UnknownConnection(conn))?
            .highlighted = on;
        Ok(())
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    /// Raise the stack containing `id` above every other stack.
    pub fn bring_to_front(&mut self, id: BlockId) -> bool {
        let root = self.root_of(id);
        let Some(pos) = self.z_order.iter().position(|b| *b == root) else {
            return false;
        };
        if pos + 1 == self.z_order.len() {
            return false;
        }
        self.z_order.remove(pos);
        self.z_order.push(root);
        true
    }

    // ─── Floating items ──────────────────────────────────────────────────

    pub fn add_item(&mut self, kind: ItemKind, xy: Point, size: Size) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        self.items.insert(
            id,
            FloatingItem {
                id,
                kind,
                xy,
                size,
                movable: true,
                deletable: kind == ItemKind::Comment,
                dragging: false,
            },
        );
        id
    }

    pub fn item(&self, id: ItemId) -> Option<&FloatingItem> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut FloatingItem> {
        self.items.get_mut(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &FloatingItem> {
        self.items.values()
    }

    /// Move an item and record the move.
    pub fn move_item(&mut self, id: ItemId, xy: Point) -> bool {
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        let old_xy = item.xy;
        item.xy = xy;
        self.events.fire(EventKind::ItemMove {
            item: id,
            old_xy,
            new_xy: xy,
        });
        true
    }

    pub fn dispose_item(&mut self, id: ItemId) -> bool {
        if self.items.remove(&id).is_none() {
            return false;
        }
        self.events.fire(EventKind::ItemDelete { item: id });
        true
    }

    // ─── Drag and layout state ───────────────────────────────────────────

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub fn resizes_enabled(&self) -> bool {
        self.resizes_enabled
    }

    /// Suspend or resume layout work. Resuming re-applies fixed bounds.
    pub fn set_resizes_enabled(&mut self, enabled: bool) -> Result<()> {
        let resumed = enabled && !self.resizes_enabled;
        self.resizes_enabled = enabled;
        if resumed {
            self.bump_all_into_bounds()?;
        }
        Ok(())
    }

    pub fn fixed_bounds(&self) -> Option<Rect> {
        self.fixed_bounds
    }

    /// Set the scrollable bounds of a fixed-size workspace and bump every
    /// top-level object back inside them.
    pub fn set_fixed_bounds(&mut self, bounds: Option<Rect>) -> Result<()> {
        self.fixed_bounds = bounds;
        if self.resizes_enabled {
            self.bump_all_into_bounds()?;
        }
        Ok(())
    }

    // ─── Invariants ──────────────────────────────────────────────────────

    /// Verify partner symmetry, index order and index membership.
    pub fn check_invariants(&self) -> Result<()> {
        for c in self.connections.iter().flatten() {
            if let Some(t) = c.target {
                let other = self.try_connection(t)?;
                if other.target != Some(c.id) || other.kind != c.kind.opposite() {
                    return Err(SnapError::AsymmetricPartners { a: c.id, b: t });
                }
            }
            let indexed = self.dbs[c.kind.slot()].contains(c.id);
            if indexed != (c.tracked == TrackedState::Tracked) {
                return Err(SnapError::NotIndexed(c.id));
            }
        }
        for db in &self.dbs {
            db.check_sorted()?;
        }
        Ok(())
    }
}
