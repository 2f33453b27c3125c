use thiserror::Error;

use crate::model::{GameResult, PuzzleCategory, PuzzleDefinition, StateMap};

/// Setup- and restore-time failures. Gameplay input is never an error;
/// `process_input` signals rejection by returning `false`.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid puzzle definition: {0}")]
    InvalidDefinition(String),
    #[error("definition is for {found}, expected {expected}")]
    WrongCategory {
        expected: PuzzleCategory,
        found: PuzzleCategory,
    },
    #[error("snapshot is missing or mistypes '{0}'")]
    Snapshot(String),
}

/// The uniform contract every mini-game implements. A driver runs all
/// three categories through the same loop and never branches on the
/// concrete type except to pick a rendering template.
pub trait PuzzleGame {
    fn category(&self) -> PuzzleCategory;

    /// Consumes the category-specific definition payload and establishes
    /// initial state. Fails fast on a malformed or mismatched payload.
    fn initialize(&mut self, definition: &PuzzleDefinition) -> Result<(), GameError>;

    /// Interprets one user move. `false` means rejected with no state
    /// change; `true` means the move was recognized, including moves
    /// that do not advance toward a win.
    fn process_input(&mut self, raw: &str) -> bool;

    /// Clears transient display state (the Matching game's pair-shown
    /// selection). Called by the driver after its display pause; a no-op
    /// for games without transient state.
    fn clear_transient(&mut self) {}

    /// Pure function of current state.
    fn is_game_over(&self) -> bool;

    /// Read-only view sufficient for rendering.
    fn state(&self) -> StateMap;

    /// Meaningful once `is_game_over()` is true; derived from state.
    fn result(&self) -> GameResult;

    /// Flattens every field needed to reconstruct behavior into the
    /// generic container. Hints are never included.
    fn save_state(&self) -> StateMap;

    /// Inverse of `save_state`: the restored game behaves identically to
    /// the saved one for all subsequent input sequences.
    fn restore_state(&mut self, snapshot: &StateMap) -> Result<(), GameError>;

    /// Re-attaches hint texts from the immutable definition. Only the
    /// word puzzle overrides this.
    fn attach_hints(&mut self, _hints: &[String]) {}
}

/// Maps a puzzle category to a fresh, uninitialized game instance.
pub fn new_game(category: PuzzleCategory) -> Box<dyn PuzzleGame> {
    match category {
        PuzzleCategory::Maze => Box::new(super::MazeGame::default()),
        PuzzleCategory::Matching => Box::new(super::MatchingGame::default()),
        PuzzleCategory::Word => Box::new(super::WordPuzzleGame::default()),
    }
}

/// Rebuilds a game of the given category from a saved snapshot.
pub fn restore_game(
    category: PuzzleCategory,
    snapshot: &StateMap,
) -> Result<Box<dyn PuzzleGame>, GameError> {
    let mut game = new_game(category);
    game.restore_state(snapshot)?;
    Ok(game)
}
