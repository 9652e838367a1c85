//! Identifiers.
//!
//! Two families:
//!
//! | Family | Types | Backing | Lifetime |
//! |--------|-------|---------|----------|
//! | Interned | `BlockId`, `TypeTag`, `ComponentId` | `lasso::Spur` in one process-wide interner | forever; equal strings give equal ids |
//! | Dense | `ConnectionId`, `ItemId` | `u32` slot in a workspace arena | one workspace; never reused |
//!
//! Interned ids serialise as their string, so block templates and events
//! stay readable. Dense ids are meaningless outside the workspace that
//! allocated them.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned string id. `$debug` and `$display` prefix the two renderings.
macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, debug = $debug:literal, display = $display:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern `s`, or return the id it already has.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($debug, "{}"), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($display, "{}"), self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

/// Arena slot id, rendered as `$prefix` followed by the slot number.
macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Build an id outside a workspace, for standalone indexes.
            pub const fn from_raw(raw: u32) -> Self {
                $name(raw)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

interned_id!(
    /// A block on a workspace. Templates may name it; otherwise it is
    /// generated (`_block_7`, `marker_3`).
    BlockId,
    debug = "#",
    display = "#"
);

interned_id!(
    /// A value-type name checked when two connections meet (`"Number"`,
    /// `"String"`, `"Boolean"`, ...).
    TypeTag,
    debug = "",
    display = ""
);

interned_id!(
    /// A UI component in the
    /// [`ComponentRegistry`](crate::components::ComponentRegistry): trash
    /// can, toolbox, flyout.
    ComponentId,
    debug = "@",
    display = ""
);

dense_id!(
    /// Connection slot. A connection on a disposed block resolves to
    /// `None`, never to a newer connection.
    ConnectionId,
    "conn#"
);

dense_id!(
    /// Floating workspace item (comment or bubble).
    ItemId,
    "item#"
);

impl BlockId {
    /// A fresh id for a block created without one.
    pub fn anonymous() -> Self {
        Self::with_prefix("_block")
    }

    /// A fresh id `{prefix}_{n}`; insertion markers and respawned shadows
    /// get theirs this way.
    pub fn with_prefix(prefix: &str) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }
}
