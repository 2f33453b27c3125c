use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::{debug, warn};
use rand::seq::IndexedRandom;
use rand::Rng;

use super::StoreError;
use crate::model::{
    Difficulty, MatchingPayload, MazePayload, PuzzleCategory, PuzzleDefinition, PuzzlePayload,
    WordFlavor, WordPayload,
};

/// Immutable catalog of puzzle definitions. Doubles as the hint source:
/// hint texts live here, keyed by puzzle id, and are re-attached to word
/// games after restore.
#[derive(Debug, Default)]
pub struct PuzzleLibrary {
    puzzles: Vec<PuzzleDefinition>,
}

impl PuzzleLibrary {
    pub fn new(puzzles: Vec<PuzzleDefinition>) -> Self {
        for puzzle in &puzzles {
            if let Err(err) = puzzle.validate() {
                warn!(target: "library", "Skipping invalid definition: {}", err);
            }
        }
        let puzzles = puzzles
            .into_iter()
            .filter(|p| p.validate().is_ok())
            .collect_vec();
        debug!(target: "library", "Loaded {} puzzle definitions", puzzles.len());
        Self { puzzles }
    }

    /// Loads a definition catalog from a JSON file (an array of
    /// definitions). Invalid entries are skipped with a warning.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let contents = fs::read_to_string(path)?;
        let puzzles: Vec<PuzzleDefinition> = serde_json::from_str(&contents)?;
        Ok(Self::new(puzzles))
    }

    pub fn builtin() -> Self {
        Self::new(builtin_puzzles())
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    pub fn get(&self, puzzle_id: &str) -> Option<&PuzzleDefinition> {
        self.puzzles.iter().find(|p| p.id == puzzle_id)
    }

    /// Ordered hint texts for a puzzle; empty for non-word puzzles and
    /// unknown ids.
    pub fn hints_for(&self, puzzle_id: &str) -> Vec<String> {
        self.get(puzzle_id)
            .map(|p| p.hints().to_vec())
            .unwrap_or_default()
    }

    pub fn of(&self, category: PuzzleCategory, difficulty: Difficulty) -> Vec<&PuzzleDefinition> {
        self.puzzles
            .iter()
            .filter(|p| p.category() == category && p.difficulty == difficulty)
            .collect_vec()
    }

    /// Picks one puzzle for a door: prefers one the player has never
    /// permanently completed, falling back to a random replay when the
    /// whole category is exhausted.
    pub fn pick<R: Rng>(
        &self,
        category: PuzzleCategory,
        difficulty: Difficulty,
        completed: &BTreeSet<String>,
        rng: &mut R,
    ) -> Option<&PuzzleDefinition> {
        let candidates = self.of(category, difficulty);
        let fresh = candidates
            .iter()
            .filter(|p| !completed.contains(&p.id))
            .copied()
            .collect_vec();
        if fresh.is_empty() {
            candidates.choose(rng).copied()
        } else {
            fresh.choose(rng).copied()
        }
    }
}

fn maze(id: &str, difficulty: Difficulty, title: &str, grid: Vec<&str>) -> PuzzleDefinition {
    let rows = grid.len();
    let cols = grid.first().map(|r| r.len()).unwrap_or(0);
    PuzzleDefinition {
        id: id.to_string(),
        difficulty,
        title: title.to_string(),
        payload: PuzzlePayload::Maze(MazePayload {
            rows,
            cols,
            grid: grid.into_iter().map(String::from).collect(),
            start: (1, 1),
            exit: (rows - 2, cols - 2),
        }),
    }
}

fn matching(
    id: &str,
    difficulty: Difficulty,
    title: &str,
    rows: usize,
    cols: usize,
    values: &[&str],
) -> PuzzleDefinition {
    PuzzleDefinition {
        id: id.to_string(),
        difficulty,
        title: title.to_string(),
        payload: PuzzlePayload::Matching(MatchingPayload {
            rows,
            cols,
            values: values.iter().map(|v| v.to_string()).collect(),
        }),
    }
}

fn word(
    id: &str,
    difficulty: Difficulty,
    title: &str,
    flavor: WordFlavor,
    prompt: &str,
    answer: &str,
    max_attempts: u32,
    hints: &[&str],
) -> PuzzleDefinition {
    PuzzleDefinition {
        id: id.to_string(),
        difficulty,
        title: title.to_string(),
        payload: PuzzlePayload::Word(WordPayload {
            flavor,
            prompt: prompt.to_string(),
            answer: answer.to_string(),
            max_attempts,
            hints: hints.iter().map(|h| h.to_string()).collect(),
        }),
    }
}

/// The built-in catalog: two puzzles per category per difficulty so the
/// never-completed preference has something to prefer.
pub fn builtin_puzzles() -> Vec<PuzzleDefinition> {
    vec![
        // Mazes
        maze(
            "maze-easy-1",
            Difficulty::Easy,
            "Garden Path",
            vec!["######", "#....#", "#.##.#", "#.##.#", "#....#", "######"],
        ),
        maze(
            "maze-easy-2",
            Difficulty::Easy,
            "Hedge Loop",
            vec!["######", "#..#.#", "#....#", "#.#..#", "#....#", "######"],
        ),
        maze(
            "maze-medium-1",
            Difficulty::Medium,
            "Cellar Run",
            vec![
                "########", "#......#", "#.####.#", "#....#.#", "#.##.#.#", "#.#....#",
                "#...##.#", "########",
            ],
        ),
        maze(
            "maze-medium-2",
            Difficulty::Medium,
            "Switchback",
            vec![
                "########", "#.....##", "####.#.#", "#....#.#", "#.####.#", "#......#",
                "#.####.#", "########",
            ],
        ),
        maze(
            "maze-hard-1",
            Difficulty::Hard,
            "Catacombs",
            vec![
                "##########", "#........#", "#.######.#", "#.#....#.#", "#.#.##.#.#",
                "#.#.##.#.#", "#.#....#.#", "#.######.#", "#........#", "##########",
            ],
        ),
        maze(
            "maze-hard-2",
            Difficulty::Hard,
            "Mirror Halls",
            vec![
                "##########", "#...#....#", "#.#.#.##.#", "#.#...##.#", "#.#####..#",
                "#.....##.#", "#####.##.#", "#.....#..#", "#.###....#", "##########",
            ],
        ),
        // Matching boards
        matching(
            "match-easy-1",
            Difficulty::Easy,
            "Fruit Pairs",
            2,
            4,
            &["APPLE", "PEAR", "PLUM", "FIG"],
        ),
        matching(
            "match-easy-2",
            Difficulty::Easy,
            "Color Pairs",
            2,
            4,
            &["RED", "BLUE", "GREEN", "GOLD"],
        ),
        matching(
            "match-medium-1",
            Difficulty::Medium,
            "Beast Pairs",
            3,
            4,
            &["WOLF", "BEAR", "LYNX", "HART", "BOAR", "OWL"],
        ),
        matching(
            "match-medium-2",
            Difficulty::Medium,
            "Gem Pairs",
            3,
            4,
            &["RUBY", "OPAL", "JADE", "ONYX", "PEARL", "TOPAZ"],
        ),
        matching(
            "match-hard-1",
            Difficulty::Hard,
            "Rune Pairs",
            4,
            4,
            &["ANSUZ", "KENAZ", "EHWAZ", "DAGAZ", "ISAZ", "URUZ", "FEHU", "SOWILO"],
        ),
        matching(
            "match-hard-2",
            Difficulty::Hard,
            "Star Pairs",
            4,
            4,
            &["VEGA", "DENEB", "RIGEL", "SPICA", "MIRA", "ATLAS", "MAIA", "ALCOR"],
        ),
        // Word puzzles: riddles, anagrams, ciphers
        word(
            "word-easy-1",
            Difficulty::Easy,
            "Keyboard Riddle",
            WordFlavor::Riddle,
            "What has keys but opens no locks?",
            "PIANO",
            5,
            &["You can play it.", "It has black and white keys."],
        ),
        word(
            "word-easy-2",
            Difficulty::Easy,
            "Simple Anagram",
            WordFlavor::Anagram,
            "Unscramble: NELIST",
            "SILENT",
            5,
            &["It is the opposite of loud.", "It starts with S."],
        ),
        word(
            "word-medium-1",
            Difficulty::Medium,
            "Echo Riddle",
            WordFlavor::Riddle,
            "I speak without a mouth and hear without ears. What am I?",
            "ECHO",
            4,
            &["You find me in mountains.", "I repeat what you say."],
        ),
        word(
            "word-medium-2",
            Difficulty::Medium,
            "Shifted Word",
            WordFlavor::Cipher,
            "Decode (each letter shifted forward by one): CNNQ",
            "DOOR",
            4,
            &["Shift every letter forward once.", "You walk through it."],
        ),
        word(
            "word-hard-1",
            Difficulty::Hard,
            "Harder Anagram",
            WordFlavor::Anagram,
            "Unscramble: THE CLASSROOM",
            "SCHOOLMASTER",
            3,
            &["A person, not a place.", "He runs the classroom."],
        ),
        word(
            "word-hard-2",
            Difficulty::Hard,
            "Caesar's Secret",
            WordFlavor::Cipher,
            "Decode (each letter shifted back by three): SXCCOH",
            "PUZZLE",
            3,
            &["Shift every letter back by three.", "You are solving one right now."],
        ),
    ]
}
