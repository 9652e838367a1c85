//! Renderer side of the drag engine.
//!
//! A [`Renderer`] decides how a connection candidate is previewed; the
//! `hit` module maps pointer positions to blocks, floating items and drag
//! targets.

pub mod hit;
pub mod renderer;

pub use hit::{drag_target_at, hit_test, hit_test_item};
pub use renderer::{ClassicRenderer, FlatRenderer, PreviewMethod, Renderer};
