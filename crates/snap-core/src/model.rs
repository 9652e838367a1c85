//! Block and connection data model.
//!
//! Blocks live in a `petgraph` stable graph owned by the
//! [`Workspace`](crate::workspace::Workspace); edges go from parent to
//! child and carry the parent-side [`ConnectionId`]. Connections live in a
//! flat arena addressed by `ConnectionId`, and a connected pair points at
//! each other through `target`.
//!
//! Positions are absolute workspace coordinates. A connection's absolute
//! position is its owner's `xy` plus its `offset`; the copy stored in
//! `pos` is what the connection index was last told about.

use crate::id::{BlockId, ConnectionId, TypeTag};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

// ─── Connections ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// Value plug on the left edge of a block.
    Output,
    /// Value socket inside a block.
    Input,
    /// Statement plug at the bottom of a block.
    NextStatement,
    /// Statement notch at the top of a block.
    PreviousStatement,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 4] = [
        ConnectionKind::Output,
        ConnectionKind::Input,
        ConnectionKind::NextStatement,
        ConnectionKind::PreviousStatement,
    ];

    /// The only kind this kind may ever pair with.
    pub fn opposite(self) -> Self {
        match self {
            ConnectionKind::Output => ConnectionKind::Input,
            ConnectionKind::Input => ConnectionKind::Output,
            ConnectionKind::NextStatement => ConnectionKind::PreviousStatement,
            ConnectionKind::PreviousStatement => ConnectionKind::NextStatement,
        }
    }

    /// Superior connections receive a child block and own its position.
    pub fn is_superior(self) -> bool {
        matches!(self, ConnectionKind::Input | ConnectionKind::NextStatement)
    }

    pub fn is_value(self) -> bool {
        matches!(self, ConnectionKind::Input | ConnectionKind::Output)
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            ConnectionKind::Output => 0,
            ConnectionKind::Input => 1,
            ConnectionKind::NextStatement => 2,
            ConnectionKind::PreviousStatement => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConnectionKind::Output => "output",
            ConnectionKind::Input => "input",
            ConnectionKind::NextStatement => "next",
            ConnectionKind::PreviousStatement => "previous",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a connection participates in the connection index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedState {
    /// Added to the index on its next position write.
    WillTrack,
    /// Hidden from queries until tracking is switched back on.
    Untracked,
    Tracked,
}

pub type TypeChecks = SmallVec<[TypeTag; 2]>;

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub kind: ConnectionKind,
    pub owner: BlockId,
    /// Offset from the owner's top-left corner.
    pub offset: Vec2,
    /// Absolute position last written to the index.
    pub pos: Point,
    /// Accepted value types. `None` accepts anything.
    pub checks: Option<TypeChecks>,
    pub target: Option<ConnectionId>,
    pub tracked: TrackedState,
    /// Shadow block respawned into this slot whenever it becomes empty.
    pub shadow: Option<Box<BlockTemplate>>,
    pub highlighted: bool,
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_superior(&self) -> bool {
        self.kind.is_superior()
    }

    pub fn distance_to(&self, other: &Connection) -> f64 {
        self.pos.distance(other.pos)
    }
}

// ─── Inputs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Value,
    Statement,
    /// Label-only row without a connection.
    Dummy,
}

#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub kind: InputKind,
    pub connection: Option<ConnectionId>,
    pub visible: bool,
}

// ─── Blocks ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub type_name: String,
    /// Absolute top-left corner.
    pub xy: Point,
    pub size: Size,
    pub output: Option<ConnectionId>,
    pub previous: Option<ConnectionId>,
    pub next: Option<ConnectionId>,
    pub inputs: SmallVec<[Input; 4]>,
    pub fields: BTreeMap<String, String>,
    /// Opaque mutator state, copied verbatim into insertion markers.
    pub mutation: Option<serde_json::Value>,
    pub shadow: bool,
    pub insertion_marker: bool,
    pub movable: bool,
    pub deletable: bool,
    pub collapsed: bool,
    pub inline_inputs: bool,
    pub visible: bool,
    pub dragging: bool,
    /// Shown faded because a drop would replace it.
    pub faded: bool,
    /// Input whose outline is highlighted as a drop preview.
    pub highlighted_input: Option<ConnectionId>,
}

impl Block {
    /// Connections in canonical order: output, previous, next, then inputs.
    ///
    /// With `all == false` the inputs of a collapsed block are skipped.
    pub fn connections(&self, all: bool) -> SmallVec<[ConnectionId; 8]> {
        let mut out = SmallVec::new();
        out.extend(self.output);
        out.extend(self.previous);
        out.extend(self.next);
        if all || !self.collapsed {
            out.extend(self.inputs.iter().filter_map(|i| i.connection));
        }
        out
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.xy, self.size)
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn input_with_connection(&self, conn: ConnectionId) -> Option<&Input> {
        self.inputs.iter().find(|i| i.connection == Some(conn))
    }
}

// ─── Templates ───────────────────────────────────────────────────────────

/// A connection slot as declared in a [`BlockTemplate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub offset: Vec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<String>>,
}

impl ConnectionSpec {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            offset: Vec2::new(x, y),
            checks: None,
        }
    }

    #[must_use]
    pub fn checks(mut self, types: &[&str]) -> Self {
        self.checks = Some(types.iter().map(|t| (*t).to_string()).collect());
        self
    }

    pub(crate) fn interned_checks(&self) -> Option<TypeChecks> {
        self.checks
            .as_ref()
            .map(|c| c.iter().map(|t| TypeTag::intern(t)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Box<BlockTemplate>>,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

/// Declarative description of a single block (no children).
///
/// Used to create blocks, to clone insertion markers, and as the
/// respawn template of shadow slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub size: Size,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<ConnectionSpec>,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<serde_json::Value>,
    #[serde(default)]
    pub shadow: bool,
    #[serde(default = "default_true")]
    pub movable: bool,
    #[serde(default = "default_true")]
    pub deletable: bool,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub inline_inputs: bool,
}

impl BlockTemplate {
    pub fn new(type_name: &str, width: f64, height: f64) -> Self {
        Self {
            type_name: type_name.to_string(),
            id: None,
            size: Size::new(width, height),
            output: None,
            previous: None,
            next: None,
            inputs: Vec::new(),
            fields: BTreeMap::new(),
            mutation: None,
            shadow: false,
            movable: true,
            deletable: true,
            collapsed: false,
            inline_inputs: false,
        }
    }

    #[must_use]
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn output(mut self, spec: ConnectionSpec) -> Self {
        self.output = Some(spec);
        self
    }

    #[must_use]
    pub fn previous(mut self, spec: ConnectionSpec) -> Self {
        self.previous = Some(spec);
        self
    }

    #[must_use]
    pub fn next(mut self, spec: ConnectionSpec) -> Self {
        self.next = Some(spec);
        self
    }

    #[must_use]
    pub fn value_input(mut self, name: &str, spec: ConnectionSpec) -> Self {
        self.inputs.push(InputSpec {
            name: name.to_string(),
            kind: InputKind::Value,
            connection: Some(spec),
            shadow: None,
            visible: true,
        });
        self
    }

    #[must_use]
    pub fn statement_input(mut self, name: &str, spec: ConnectionSpec) -> Self {
        self.inputs.push(InputSpec {
            name: name.to_string(),
            kind: InputKind::Statement,
            connection: Some(spec),
            shadow: None,
            visible: true,
        });
        self
    }

    /// Attach a shadow template to the most recently added input.
    #[must_use]
    pub fn with_shadow(mut self, shadow: BlockTemplate) -> Self {
        if let Some(input) = self.inputs.last_mut() {
            let mut shadow = shadow;
            shadow.shadow = true;
            input.shadow = Some(Box::new(shadow));
        }
        self
    }

    #[must_use]
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    #[must_use]
    pub fn immovable(mut self) -> Self {
        self.movable = false;
        self
    }

    #[must_use]
    pub fn undeletable(mut self) -> Self {
        self.deletable = false;
        self
    }
}
