use std::time::SystemTime;

use log::trace;

use super::{GameError, PuzzleGame};
use crate::model::{
    GameResult, PuzzleCategory, PuzzleDefinition, PuzzlePayload, StateMap, StateMapExt,
    StateValue, TimerState, WordFlavor, WordPayload,
};

/// The literal control token that reveals the next hint.
pub const HINT_TOKEN: &str = "HINT";

/// Guess-budget state machine shared by the riddle, anagram and cipher
/// flavors; the flavor only changes the prompt and answer content.
/// Wrong guesses always consume an attempt, even repeats; the visible
/// guess list is deduplicated. `HINT` never consumes an attempt.
#[derive(Debug, Clone)]
pub struct WordPuzzleGame {
    flavor: WordFlavor,
    prompt: String,
    answer: String,
    max_attempts: u32,
    attempts_used: u32,
    wrong_guesses: Vec<String>,
    /// Hint texts from the definition. Never serialized; the
    /// orchestrator re-attaches them after restore.
    hints: Vec<String>,
    revealed_hints: Vec<String>,
    won: bool,
    timer: TimerState,
}

impl Default for WordPuzzleGame {
    fn default() -> Self {
        Self {
            flavor: WordFlavor::Riddle,
            prompt: String::new(),
            answer: String::new(),
            max_attempts: 0,
            attempts_used: 0,
            wrong_guesses: Vec::new(),
            hints: Vec::new(),
            revealed_hints: Vec::new(),
            won: false,
            timer: TimerState::default(),
        }
    }
}

impl WordPuzzleGame {
    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn hints_revealed(&self) -> u32 {
        self.revealed_hints.len() as u32
    }

    fn matches_answer(&self, guess: &str) -> bool {
        guess.trim().eq_ignore_ascii_case(self.answer.trim())
    }

    fn flavor_tag(flavor: WordFlavor) -> &'static str {
        match flavor {
            WordFlavor::Riddle => "riddle",
            WordFlavor::Anagram => "anagram",
            WordFlavor::Cipher => "cipher",
        }
    }

    fn flavor_from_tag(tag: &str) -> Option<WordFlavor> {
        match tag {
            "riddle" => Some(WordFlavor::Riddle),
            "anagram" => Some(WordFlavor::Anagram),
            "cipher" => Some(WordFlavor::Cipher),
            _ => None,
        }
    }
}

impl PuzzleGame for WordPuzzleGame {
    fn category(&self) -> PuzzleCategory {
        PuzzleCategory::Word
    }

    fn initialize(&mut self, definition: &PuzzleDefinition) -> Result<(), GameError> {
        definition.validate()?;
        let payload = match &definition.payload {
            PuzzlePayload::Word(payload) => payload,
            _ => {
                return Err(GameError::WrongCategory {
                    expected: PuzzleCategory::Word,
                    found: definition.category(),
                })
            }
        };
        let WordPayload {
            flavor,
            prompt,
            answer,
            max_attempts,
            hints,
        } = payload.clone();
        self.flavor = flavor;
        self.prompt = prompt;
        self.answer = answer;
        self.max_attempts = max_attempts;
        self.attempts_used = 0;
        self.wrong_guesses = Vec::new();
        self.hints = hints;
        self.revealed_hints = Vec::new();
        self.won = false;
        self.timer = TimerState::default();
        Ok(())
    }

    fn process_input(&mut self, raw: &str) -> bool {
        if self.is_game_over() {
            return false;
        }
        let guess = raw.trim();
        if guess.is_empty() {
            return false;
        }
        if guess.eq_ignore_ascii_case(HINT_TOKEN) {
            // Accepted even once hints are exhausted; just inert then.
            if self.revealed_hints.len() < self.hints.len() {
                let next = self.hints[self.revealed_hints.len()].clone();
                trace!(target: "word", "Revealing hint {}", self.revealed_hints.len() + 1);
                self.revealed_hints.push(next);
            }
            return true;
        }
        if self.matches_answer(guess) {
            self.won = true;
            self.timer = self.timer.ended(SystemTime::now());
            return true;
        }
        // Every wrong guess consumes an attempt; the visible list dedupes.
        self.attempts_used += 1;
        if !self
            .wrong_guesses
            .iter()
            .any(|g| g.eq_ignore_ascii_case(guess))
        {
            self.wrong_guesses.push(guess.to_string());
        }
        if self.attempts_used >= self.max_attempts {
            self.timer = self.timer.ended(SystemTime::now());
        }
        true
    }

    fn is_game_over(&self) -> bool {
        self.won || (self.max_attempts > 0 && self.attempts_used >= self.max_attempts)
    }

    fn state(&self) -> StateMap {
        let mut state = StateMap::new();
        state.insert("flavor".to_string(), Self::flavor_tag(self.flavor).into());
        state.insert("prompt".to_string(), StateValue::Str(self.prompt.clone()));
        state.insert("attempts_used".to_string(), StateValue::from(self.attempts_used));
        state.insert("max_attempts".to_string(), StateValue::from(self.max_attempts));
        state.insert(
            "wrong_guesses".to_string(),
            StateValue::List(
                self.wrong_guesses
                    .iter()
                    .map(|g| StateValue::Str(g.clone()))
                    .collect(),
            ),
        );
        state.insert(
            "revealed_hints".to_string(),
            StateValue::List(
                self.revealed_hints
                    .iter()
                    .map(|h| StateValue::Str(h.clone()))
                    .collect(),
            ),
        );
        state.insert(
            "hints_available".to_string(),
            StateValue::from(self.hints.len().saturating_sub(self.revealed_hints.len())),
        );
        state.insert("won".to_string(), StateValue::Bool(self.won));
        state
    }

    fn result(&self) -> GameResult {
        GameResult {
            won: self.won,
            elapsed: self.timer.elapsed(),
            moves: self.attempts_used,
            hints_revealed: self.hints_revealed(),
            // The canonical answer is disclosed only on a loss.
            answer: (!self.won).then(|| self.answer.clone()),
        }
    }

    fn save_state(&self) -> StateMap {
        let mut snapshot = StateMap::new();
        snapshot.insert("flavor".to_string(), Self::flavor_tag(self.flavor).into());
        snapshot.insert("prompt".to_string(), StateValue::Str(self.prompt.clone()));
        snapshot.insert("answer".to_string(), StateValue::Str(self.answer.clone()));
        snapshot.insert("max_attempts".to_string(), StateValue::from(self.max_attempts));
        snapshot.insert("attempts_used".to_string(), StateValue::from(self.attempts_used));
        snapshot.insert(
            "wrong_guesses".to_string(),
            StateValue::List(
                self.wrong_guesses
                    .iter()
                    .map(|g| StateValue::Str(g.clone()))
                    .collect(),
            ),
        );
        // Hint texts live in the definition; only the count round-trips.
        snapshot.insert(
            "hints_revealed".to_string(),
            StateValue::from(self.revealed_hints.len()),
        );
        snapshot.insert("won".to_string(), StateValue::Bool(self.won));
        snapshot.insert("timer".to_string(), self.timer.to_state());
        snapshot
    }

    fn restore_state(&mut self, snapshot: &StateMap) -> Result<(), GameError> {
        let flavor = snapshot
            .str("flavor")
            .and_then(Self::flavor_from_tag)
            .ok_or(GameError::Snapshot("flavor".into()))?;
        let prompt = snapshot
            .str("prompt")
            .ok_or(GameError::Snapshot("prompt".into()))?
            .to_string();
        let answer = snapshot
            .str("answer")
            .ok_or(GameError::Snapshot("answer".into()))?
            .to_string();
        let max_attempts = snapshot
            .int("max_attempts")
            .filter(|n| *n > 0)
            .ok_or(GameError::Snapshot("max_attempts".into()))? as u32;
        let attempts_used = snapshot
            .int("attempts_used")
            .ok_or(GameError::Snapshot("attempts_used".into()))? as u32;
        if attempts_used > max_attempts {
            return Err(GameError::Snapshot("attempts_used".into()));
        }
        let wrong_guesses: Vec<String> = snapshot
            .list("wrong_guesses")
            .unwrap_or(&[])
            .iter()
            .map(|g| g.as_str().map(String::from))
            .collect::<Option<_>>()
            .ok_or(GameError::Snapshot("wrong_guesses".into()))?;
        let hints_revealed = snapshot.int("hints_revealed").unwrap_or(0).max(0) as usize;

        self.flavor = flavor;
        self.prompt = prompt;
        self.answer = answer;
        self.max_attempts = max_attempts;
        self.attempts_used = attempts_used;
        self.wrong_guesses = wrong_guesses;
        self.won = snapshot.boolean("won").unwrap_or(false);
        // Placeholder count until the orchestrator re-attaches the texts.
        self.hints = Vec::new();
        self.revealed_hints = vec![String::new(); hints_revealed];
        self.timer = snapshot
            .get("timer")
            .and_then(TimerState::from_state)
            .map(|timer| timer.resumed())
            .unwrap_or_default();
        Ok(())
    }

    fn attach_hints(&mut self, hints: &[String]) {
        let revealed = self.revealed_hints.len().min(hints.len());
        self.hints = hints.to_vec();
        self.revealed_hints = hints[..revealed].to_vec();
    }
}
