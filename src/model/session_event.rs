use super::{Difficulty, GameResult, PuzzleCategory};

/// Orchestrator lifecycle notifications, published on the event channel
/// for whatever front end is listening.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SessionStarted {
        difficulty: Difficulty,
        doors: Vec<(u8, String)>,
    },
    DoorOpened {
        door: u8,
        puzzle_id: String,
        category: PuzzleCategory,
    },
    DoorCompleted {
        door: u8,
        result: GameResult,
    },
    SessionCompleted,
    SessionTimedOut,
    Ticked {
        elapsed_seconds: u64,
        remaining_seconds: u64,
    },
}
