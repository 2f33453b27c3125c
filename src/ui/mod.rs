mod console;

pub use console::ConsoleRenderer;

use crate::model::{PuzzleCategory, StateMap};

/// Rendering collaborator. Receives a read-only generic snapshot and the
/// game-type tag, and must handle all three categories; it never sees
/// engine internals and never mutates the snapshot.
pub trait Renderer {
    fn render(&self, state: &StateMap, category: PuzzleCategory);
}
