use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};

use super::{GameSession, PuzzleCategory, StateMap};

/// A single saved mid-puzzle snapshot. At most one exists per player.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PausedPuzzle {
    pub puzzle_id: String,
    pub category: PuzzleCategory,
    pub state: StateMap,
    #[serde_as(as = "TimestampSeconds")]
    pub saved_at: DateTime<Utc>,
}

/// Long-lived per-player record. The paused puzzle and the session
/// envelope are independent slots; clearing one leaves the other alone.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserProgress {
    pub player_id: String,
    #[serde(default)]
    pub completed_puzzles: BTreeSet<String>,
    #[serde(default)]
    pub best_scores: BTreeMap<String, u32>,
    #[serde(default)]
    pub total_score: u32,
    #[serde(default)]
    pub paused_puzzle: Option<PausedPuzzle>,
    #[serde(default)]
    pub session: Option<GameSession>,
}

impl UserProgress {
    pub fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            ..Default::default()
        }
    }

    pub fn is_puzzle_completed(&self, puzzle_id: &str) -> bool {
        self.completed_puzzles.contains(puzzle_id)
    }

    /// Records a finished puzzle: permanent completion plus best-score
    /// and total-score bookkeeping. Total score only grows by the
    /// improvement over the previous best, so replays can't farm points.
    pub fn record_completion(&mut self, puzzle_id: &str, score: u32) {
        self.completed_puzzles.insert(puzzle_id.to_string());
        let best = self.best_scores.entry(puzzle_id.to_string()).or_insert(0);
        if score > *best {
            self.total_score += score - *best;
            *best = score;
        }
    }

    pub fn best_score(&self, puzzle_id: &str) -> Option<u32> {
        self.best_scores.get(puzzle_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_score_keeps_maximum() {
        let mut progress = UserProgress::new("ada");
        progress.record_completion("maze-1", 700);
        progress.record_completion("maze-1", 500);
        assert_eq!(progress.best_score("maze-1"), Some(700));
        assert_eq!(progress.total_score, 700);
    }

    #[test]
    fn test_total_score_grows_by_improvement_only() {
        let mut progress = UserProgress::new("ada");
        progress.record_completion("word-1", 400);
        progress.record_completion("word-1", 900);
        assert_eq!(progress.total_score, 900);
        assert_eq!(progress.best_score("word-1"), Some(900));
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut progress = UserProgress::new("ada");
        progress.paused_puzzle = Some(PausedPuzzle {
            puzzle_id: "maze-1".to_string(),
            category: PuzzleCategory::Maze,
            state: StateMap::new(),
            saved_at: Utc::now(),
        });
        progress.session = Some(GameSession::new(
            crate::model::Difficulty::Easy,
            BTreeMap::from([(1, "maze-1".to_string())]),
        ));

        progress.session = None;
        assert!(progress.paused_puzzle.is_some());
    }

    #[test]
    fn test_saved_at_persists_as_unix_seconds() {
        let mut progress = UserProgress::new("ada");
        progress.paused_puzzle = Some(PausedPuzzle {
            puzzle_id: "maze-1".to_string(),
            category: PuzzleCategory::Maze,
            state: StateMap::new(),
            saved_at: Utc::now(),
        });
        let json = serde_json::to_value(&progress).unwrap();
        assert!(json["paused_puzzle"]["saved_at"].is_i64());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let progress: UserProgress =
            serde_json::from_str(r#"{"player_id": "ada"}"#).unwrap();
        assert!(progress.completed_puzzles.is_empty());
        assert!(progress.paused_puzzle.is_none());
        assert!(progress.session.is_none());
    }
}
