mod json_store;
mod library;
mod memory;

use thiserror::Error;

use crate::model::UserProgress;

pub use json_store::JsonProgressStore;
pub use library::{builtin_puzzles, PuzzleLibrary};
pub use memory::MemoryProgressStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is malformed: {0}")]
    Format(#[from] serde_json::Error),
    #[error("storage unavailable")]
    Unavailable,
}

/// Opaque per-player progress persistence. The engine depends only on
/// these two operations, never on the storage format; a failed `save`
/// leaves in-memory state untouched and is reported to the caller.
pub trait ProgressStore {
    fn load(&self, player_id: &str) -> Result<Option<UserProgress>, StoreError>;
    fn save(&self, progress: &UserProgress) -> Result<(), StoreError>;
}
