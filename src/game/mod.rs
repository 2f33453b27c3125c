mod matching;
mod maze;
mod puzzle_game;
mod session;
mod word;

pub use matching::MatchingGame;
pub use maze::MazeGame;
pub use puzzle_game::{new_game, restore_game, GameError, PuzzleGame};
pub use session::{SessionError, SessionOrchestrator};
pub use word::{WordPuzzleGame, HINT_TOKEN};
