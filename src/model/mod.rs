mod category;
mod difficulty;
mod game_result;
mod puzzle_definition;
mod session;
mod session_event;
mod state_value;
mod timer_state;
mod user_progress;

pub use category::{PuzzleCategory, WordFlavor};
pub use difficulty::Difficulty;
pub use game_result::GameResult;
pub use puzzle_definition::{
    MatchingPayload, MazePayload, PuzzleDefinition, PuzzlePayload, WordPayload, OPEN, WALL,
};
pub use session::{GameSession, DOOR_COUNT};
pub use session_event::SessionEvent;
pub use state_value::{StateMap, StateMapExt, StateValue};
pub use timer_state::TimerState;
pub use user_progress::{PausedPuzzle, UserProgress};
