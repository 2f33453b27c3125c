use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Difficulty;

/// Outcome of a finished puzzle, derived from final game state so it can
/// never disagree with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameResult {
    pub won: bool,
    pub elapsed: Duration,
    /// Moves for maze/matching, attempts used for word puzzles.
    pub moves: u32,
    pub hints_revealed: u32,
    /// The canonical answer, disclosed only on a loss.
    pub answer: Option<String>,
}

impl GameResult {
    /// Score for progress bookkeeping. Losses score zero; wins start from
    /// a difficulty-scaled base and pay small penalties for moves and
    /// slow completion.
    pub fn score(&self, difficulty: Difficulty) -> u32 {
        if !self.won {
            return 0;
        }
        let base = 1000 * difficulty.score_multiplier();
        let move_penalty = self.moves.saturating_mul(5);
        let time_penalty = (self.elapsed.as_secs() as u32).saturating_mul(2);
        let hint_penalty = self.hints_revealed.saturating_mul(50);
        base.saturating_sub(move_penalty)
            .saturating_sub(time_penalty)
            .saturating_sub(hint_penalty)
            .max(100)
    }
}
