use serde::{Deserialize, Serialize};

/// The three puzzle kinds, each backed by its own state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PuzzleCategory {
    Maze,
    Matching,
    Word,
}

impl PuzzleCategory {
    pub fn all() -> Vec<PuzzleCategory> {
        vec![
            PuzzleCategory::Maze,
            PuzzleCategory::Matching,
            PuzzleCategory::Word,
        ]
    }

    /// Stable tag used as the factory key and the renderer's game-type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            PuzzleCategory::Maze => "maze",
            PuzzleCategory::Matching => "matching",
            PuzzleCategory::Word => "word",
        }
    }

}

impl std::fmt::Display for PuzzleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Word puzzle flavor. Only the prompt and answer content differ; the
/// state machine is shared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WordFlavor {
    Riddle,
    Anagram,
    Cipher,
}

impl std::fmt::Display for WordFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WordFlavor::Riddle => "riddle",
            WordFlavor::Anagram => "anagram",
            WordFlavor::Cipher => "cipher",
        };
        write!(f, "{}", name)
    }
}
