use std::time::SystemTime;

use log::trace;
use rand::seq::SliceRandom;

use super::{GameError, PuzzleGame};
use crate::model::{
    GameResult, MatchingPayload, PuzzleCategory, PuzzleDefinition, PuzzlePayload, StateMap,
    StateMapExt, StateValue, TimerState,
};

/// Pair-reveal state machine. A pair attempt is two distinct, unmatched
/// selections; matching values lock both cells. After any pair attempt
/// the board sits in a pair-shown state until the driver calls
/// `clear_transient` — the engine never sleeps on its own.
#[derive(Debug, Clone, Default)]
pub struct MatchingGame {
    values: Vec<Vec<String>>,
    matched: Vec<Vec<bool>>,
    first: Option<(usize, usize)>,
    second: Option<(usize, usize)>,
    moves: u32,
    timer: TimerState,
}

impl MatchingGame {
    fn rows(&self) -> usize {
        self.values.len()
    }

    fn cols(&self) -> usize {
        self.values.first().map(Vec::len).unwrap_or(0)
    }

    fn is_matched(&self, row: usize, col: usize) -> bool {
        self.matched
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_pair_shown(&self) -> bool {
        self.second.is_some()
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    fn parse_cell(&self, raw: &str) -> Option<(usize, usize)> {
        let mut parts = raw.split_whitespace();
        let row = parts.next()?.parse::<usize>().ok()?;
        let col = parts.next()?.parse::<usize>().ok()?;
        if parts.next().is_some() || row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some((row, col))
    }

    fn cell_view(&self, row: usize, col: usize) -> StateValue {
        let matched = self.is_matched(row, col);
        let selected = self.first == Some((row, col)) || self.second == Some((row, col));
        let mut cell = StateMap::new();
        cell.insert("matched".to_string(), StateValue::Bool(matched));
        if matched || selected {
            cell.insert(
                "value".to_string(),
                StateValue::Str(self.values[row][col].clone()),
            );
        }
        StateValue::Map(cell)
    }
}

impl PuzzleGame for MatchingGame {
    fn category(&self) -> PuzzleCategory {
        PuzzleCategory::Matching
    }

    fn initialize(&mut self, definition: &PuzzleDefinition) -> Result<(), GameError> {
        definition.validate()?;
        let payload = match &definition.payload {
            PuzzlePayload::Matching(payload) => payload,
            _ => {
                return Err(GameError::WrongCategory {
                    expected: PuzzleCategory::Matching,
                    found: definition.category(),
                })
            }
        };
        let MatchingPayload { rows, cols, values } = payload;

        let mut deck: Vec<String> = values.iter().chain(values.iter()).cloned().collect();
        deck.shuffle(&mut rand::rng());

        self.values = (0..*rows)
            .map(|row| deck[row * cols..(row + 1) * cols].to_vec())
            .collect();
        self.matched = vec![vec![false; *cols]; *rows];
        self.first = None;
        self.second = None;
        self.moves = 0;
        self.timer = TimerState::default();
        Ok(())
    }

    fn process_input(&mut self, raw: &str) -> bool {
        if self.is_game_over() || self.is_pair_shown() {
            return false;
        }
        let Some((row, col)) = self.parse_cell(raw) else {
            return false;
        };
        if self.is_matched(row, col) {
            return false;
        }
        match self.first {
            None => {
                self.first = Some((row, col));
                true
            }
            Some(first) if first == (row, col) => false,
            Some(first) => {
                self.second = Some((row, col));
                self.moves += 1;
                if self.values[first.0][first.1] == self.values[row][col] {
                    self.matched[first.0][first.1] = true;
                    self.matched[row][col] = true;
                    trace!(target: "matching", "Matched '{}' at {:?} and ({}, {})",
                        self.values[row][col], first, row, col);
                    if self.is_game_over() {
                        self.timer = self.timer.ended(SystemTime::now());
                    }
                }
                true
            }
        }
    }

    fn clear_transient(&mut self) {
        self.first = None;
        self.second = None;
    }

    fn is_game_over(&self) -> bool {
        !self.matched.is_empty() && self.matched.iter().flatten().all(|m| *m)
    }

    fn state(&self) -> StateMap {
        let mut state = StateMap::new();
        state.insert(
            "board".to_string(),
            StateValue::List(
                (0..self.rows())
                    .map(|row| {
                        StateValue::List(
                            (0..self.cols()).map(|col| self.cell_view(row, col)).collect(),
                        )
                    })
                    .collect(),
            ),
        );
        state.insert("moves".to_string(), StateValue::from(self.moves));
        state.insert("pair_shown".to_string(), StateValue::Bool(self.is_pair_shown()));
        state.insert("won".to_string(), StateValue::Bool(self.is_game_over()));
        state
    }

    fn result(&self) -> GameResult {
        GameResult {
            won: self.is_game_over(),
            elapsed: self.timer.elapsed(),
            moves: self.moves,
            hints_revealed: 0,
            answer: None,
        }
    }

    fn save_state(&self) -> StateMap {
        let mut snapshot = StateMap::new();
        snapshot.insert(
            "values".to_string(),
            StateValue::grid(&self.values, |v| StateValue::Str(v.clone())),
        );
        snapshot.insert(
            "matched".to_string(),
            StateValue::grid(&self.matched, |m| StateValue::Bool(*m)),
        );
        if let Some((row, col)) = self.first {
            snapshot.insert("first".to_string(), StateValue::position(row, col));
        }
        if let Some((row, col)) = self.second {
            snapshot.insert("second".to_string(), StateValue::position(row, col));
        }
        snapshot.insert("moves".to_string(), StateValue::from(self.moves));
        snapshot.insert("timer".to_string(), self.timer.to_state());
        snapshot
    }

    fn restore_state(&mut self, snapshot: &StateMap) -> Result<(), GameError> {
        let values: Vec<Vec<String>> = snapshot
            .list("values")
            .ok_or(GameError::Snapshot("values".into()))?
            .iter()
            .map(|row| {
                row.as_list().and_then(|cells| {
                    cells
                        .iter()
                        .map(|cell| cell.as_str().map(String::from))
                        .collect::<Option<Vec<_>>>()
                })
            })
            .collect::<Option<_>>()
            .ok_or(GameError::Snapshot("values".into()))?;
        let matched: Vec<Vec<bool>> = snapshot
            .list("matched")
            .ok_or(GameError::Snapshot("matched".into()))?
            .iter()
            .map(|row| {
                row.as_list().and_then(|cells| {
                    cells
                        .iter()
                        .map(StateValue::as_bool)
                        .collect::<Option<Vec<_>>>()
                })
            })
            .collect::<Option<_>>()
            .ok_or(GameError::Snapshot("matched".into()))?;
        if values.is_empty()
            || values.len() != matched.len()
            || values
                .iter()
                .zip(matched.iter())
                .any(|(v, m)| v.len() != m.len() || v.len() != values[0].len())
        {
            return Err(GameError::Snapshot("matched".into()));
        }
        let moves = snapshot
            .int("moves")
            .ok_or(GameError::Snapshot("moves".into()))? as u32;

        self.values = values;
        self.matched = matched;
        self.first = snapshot.pos("first");
        self.second = snapshot.pos("second");
        self.moves = moves;
        // A selection sits on a matched cell only as a completed pair
        // attempt: both selections present and both matched. Anything
        // else is not a state the engine can reach.
        let selections: Vec<_> = [self.first, self.second].into_iter().flatten().collect();
        let on_matched = selections
            .iter()
            .filter(|(row, col)| self.is_matched(*row, *col))
            .count();
        if on_matched > 0 && !(selections.len() == 2 && on_matched == 2) {
            return Err(GameError::Snapshot("first".into()));
        }
        self.timer = snapshot
            .get("timer")
            .and_then(TimerState::from_state)
            .map(|timer| timer.resumed())
            .unwrap_or_default();
        Ok(())
    }
}
