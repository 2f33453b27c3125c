use serde::{Deserialize, Serialize};

use super::{Difficulty, PuzzleCategory, WordFlavor};
use crate::game::GameError;

pub const WALL: char = '#';
pub const OPEN: char = '.';

/// Immutable puzzle content, created once at content-load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleDefinition {
    pub id: String,
    pub difficulty: Difficulty,
    pub title: String,
    pub payload: PuzzlePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum PuzzlePayload {
    Maze(MazePayload),
    Matching(MatchingPayload),
    Word(WordPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazePayload {
    pub rows: usize,
    pub cols: usize,
    /// One string per row; `#` is a wall, `.` is open.
    pub grid: Vec<String>,
    pub start: (usize, usize),
    pub exit: (usize, usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingPayload {
    pub rows: usize,
    pub cols: usize,
    /// Every value appears exactly twice once dealt onto the board.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPayload {
    pub flavor: WordFlavor,
    pub prompt: String,
    pub answer: String,
    pub max_attempts: u32,
    #[serde(default)]
    pub hints: Vec<String>,
}

impl PuzzleDefinition {
    pub fn category(&self) -> PuzzleCategory {
        match &self.payload {
            PuzzlePayload::Maze(_) => PuzzleCategory::Maze,
            PuzzlePayload::Matching(_) => PuzzleCategory::Matching,
            PuzzlePayload::Word(_) => PuzzleCategory::Word,
        }
    }

    pub fn hints(&self) -> &[String] {
        match &self.payload {
            PuzzlePayload::Word(payload) => &payload.hints,
            _ => &[],
        }
    }

    /// Setup-time validation: a definition that fails here must never
    /// reach a game's `initialize`.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.id.is_empty() {
            return Err(GameError::InvalidDefinition("empty puzzle id".to_string()));
        }
        match &self.payload {
            PuzzlePayload::Maze(maze) => maze.validate(&self.id),
            PuzzlePayload::Matching(matching) => matching.validate(&self.id),
            PuzzlePayload::Word(word) => word.validate(&self.id),
        }
    }
}

impl MazePayload {
    pub fn cell(&self, row: usize, col: usize) -> Option<char> {
        self.grid.get(row).and_then(|r| r.chars().nth(col))
    }

    pub fn is_wall(&self, row: usize, col: usize) -> bool {
        self.cell(row, col).map(|c| c == WALL).unwrap_or(true)
    }

    fn validate(&self, id: &str) -> Result<(), GameError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GameError::InvalidDefinition(format!(
                "{}: maze dimensions must be nonzero",
                id
            )));
        }
        if self.grid.len() != self.rows
            || self.grid.iter().any(|row| row.chars().count() != self.cols)
        {
            return Err(GameError::InvalidDefinition(format!(
                "{}: maze grid does not match {}x{}",
                id, self.rows, self.cols
            )));
        }
        if let Some(bad) = self
            .grid
            .iter()
            .flat_map(|row| row.chars())
            .find(|c| *c != WALL && *c != OPEN)
        {
            return Err(GameError::InvalidDefinition(format!(
                "{}: unexpected maze cell '{}'",
                id, bad
            )));
        }
        for (name, (row, col)) in [("start", self.start), ("exit", self.exit)] {
            if self.is_wall(row, col) {
                return Err(GameError::InvalidDefinition(format!(
                    "{}: {} cell ({}, {}) is a wall or out of bounds",
                    id, name, row, col
                )));
            }
        }
        Ok(())
    }
}

impl MatchingPayload {
    fn validate(&self, id: &str) -> Result<(), GameError> {
        let cells = self.rows * self.cols;
        if cells == 0 || cells % 2 != 0 {
            return Err(GameError::InvalidDefinition(format!(
                "{}: matching board needs an even, nonzero cell count",
                id
            )));
        }
        if self.values.len() * 2 != cells {
            return Err(GameError::InvalidDefinition(format!(
                "{}: expected {} pair values, found {}",
                id,
                cells / 2,
                self.values.len()
            )));
        }
        Ok(())
    }
}

impl WordPayload {
    fn validate(&self, id: &str) -> Result<(), GameError> {
        if self.answer.trim().is_empty() {
            return Err(GameError::InvalidDefinition(format!(
                "{}: word puzzle has no answer",
                id
            )));
        }
        if self.max_attempts == 0 {
            return Err(GameError::InvalidDefinition(format!(
                "{}: max_attempts must be at least 1",
                id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maze_definition(grid: Vec<&str>) -> PuzzleDefinition {
        PuzzleDefinition {
            id: "maze-test".to_string(),
            difficulty: Difficulty::Easy,
            title: "Test Maze".to_string(),
            payload: PuzzlePayload::Maze(MazePayload {
                rows: grid.len(),
                cols: grid.first().map(|r| r.len()).unwrap_or(0),
                grid: grid.into_iter().map(String::from).collect(),
                start: (1, 1),
                exit: (1, 2),
            }),
        }
    }

    #[test]
    fn test_valid_maze_passes() {
        let def = maze_definition(vec!["####", "#..#", "####"]);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_maze_start_on_wall_rejected() {
        let def = maze_definition(vec!["####", "##.#", "####"]);
        assert!(matches!(
            def.validate(),
            Err(GameError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_matching_pair_count_must_fill_board() {
        let def = PuzzleDefinition {
            id: "match-test".to_string(),
            difficulty: Difficulty::Easy,
            title: "Pairs".to_string(),
            payload: PuzzlePayload::Matching(MatchingPayload {
                rows: 2,
                cols: 2,
                values: vec!["A".to_string()],
            }),
        };
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_word_needs_answer_and_budget() {
        let mut def = PuzzleDefinition {
            id: "word-test".to_string(),
            difficulty: Difficulty::Easy,
            title: "Riddle".to_string(),
            payload: PuzzlePayload::Word(WordPayload {
                flavor: WordFlavor::Riddle,
                prompt: "What has keys but no locks?".to_string(),
                answer: "PIANO".to_string(),
                max_attempts: 3,
                hints: vec![],
            }),
        };
        assert!(def.validate().is_ok());
        if let PuzzlePayload::Word(word) = &mut def.payload {
            word.max_attempts = 0;
        }
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_payload_round_trips_through_json() {
        let def = maze_definition(vec!["####", "#..#", "####"]);
        let json = serde_json::to_string(&def).unwrap();
        let back: PuzzleDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.category(), PuzzleCategory::Maze);
        assert_eq!(back.id, def.id);
    }
}
