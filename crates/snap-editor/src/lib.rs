pub mod candidate;
pub mod drag;
pub mod editor;
pub mod effects;
pub mod error;
pub mod gesture;
pub mod input;
pub mod preview;

pub use candidate::{DragCandidate, DragCandidateFinder};
pub use drag::{
    BlockDragStrategy, DragContext, DragOutcome, DragState, DragStrategy, DragSubject,
    ItemDragStrategy,
};
pub use editor::{ActiveDrag, Editor};
pub use effects::{EffectFrame, EffectKind, EffectScheduler, EffectTarget};
pub use error::{DragError, Result};
pub use gesture::{Gesture, GestureAction, GestureTarget};
pub use input::{InputEvent, Modifiers};
pub use preview::{PreviewController, PreviewState, PreviewStats};
