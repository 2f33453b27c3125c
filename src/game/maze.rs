use std::time::SystemTime;

use log::trace;

use super::{GameError, PuzzleGame};
use crate::model::{
    GameResult, MazePayload, PuzzleCategory, PuzzleDefinition, PuzzlePayload, StateMap,
    StateMapExt, StateValue, TimerState, WALL,
};

/// Grid-traversal state machine. Directional input moves the player one
/// cell; bounds and walls reject the move; reaching the exit wins. There
/// is no move limit.
#[derive(Debug, Clone)]
pub struct MazeGame {
    rows: usize,
    cols: usize,
    grid: Vec<String>,
    start: (usize, usize),
    exit: (usize, usize),
    player: (usize, usize),
    moves: u32,
    timer: TimerState,
}

impl Default for MazeGame {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            grid: Vec::new(),
            start: (0, 0),
            exit: (0, 0),
            player: (0, 0),
            moves: 0,
            timer: TimerState::default(),
        }
    }
}

impl MazeGame {
    fn is_wall(&self, row: usize, col: usize) -> bool {
        self.grid
            .get(row)
            .and_then(|r| r.chars().nth(col))
            .map(|c| c == WALL)
            .unwrap_or(true)
    }

    fn step(&self, direction: char) -> Option<(usize, usize)> {
        let (row, col) = self.player;
        match direction {
            'W' => row.checked_sub(1).map(|r| (r, col)),
            'S' => (row + 1 < self.rows).then_some((row + 1, col)),
            'A' => col.checked_sub(1).map(|c| (row, c)),
            'D' => (col + 1 < self.cols).then_some((row, col + 1)),
            _ => None,
        }
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn player(&self) -> (usize, usize) {
        self.player
    }
}

impl PuzzleGame for MazeGame {
    fn category(&self) -> PuzzleCategory {
        PuzzleCategory::Maze
    }

    fn initialize(&mut self, definition: &PuzzleDefinition) -> Result<(), GameError> {
        definition.validate()?;
        let payload = match &definition.payload {
            PuzzlePayload::Maze(payload) => payload,
            _ => {
                return Err(GameError::WrongCategory {
                    expected: PuzzleCategory::Maze,
                    found: definition.category(),
                })
            }
        };
        let MazePayload {
            rows,
            cols,
            grid,
            start,
            exit,
        } = payload.clone();
        self.rows = rows;
        self.cols = cols;
        self.grid = grid;
        self.start = start;
        self.exit = exit;
        self.player = start;
        self.moves = 0;
        self.timer = TimerState::default();
        Ok(())
    }

    fn process_input(&mut self, raw: &str) -> bool {
        if self.is_game_over() {
            return false;
        }
        let direction = match raw.trim().to_ascii_uppercase().as_str() {
            d @ ("W" | "A" | "S" | "D") => d.chars().next().unwrap(),
            _ => return false,
        };
        let Some((row, col)) = self.step(direction) else {
            return false;
        };
        if self.is_wall(row, col) {
            return false;
        }
        self.player = (row, col);
        self.moves += 1;
        trace!(target: "maze", "Moved {} to ({}, {})", direction, row, col);
        if self.player == self.exit {
            self.timer = self.timer.ended(SystemTime::now());
        }
        true
    }

    fn is_game_over(&self) -> bool {
        self.rows > 0 && self.player == self.exit
    }

    fn state(&self) -> StateMap {
        let mut state = StateMap::new();
        state.insert(
            "grid".to_string(),
            StateValue::List(
                self.grid
                    .iter()
                    .map(|row| StateValue::Str(row.clone()))
                    .collect(),
            ),
        );
        state.insert(
            "player".to_string(),
            StateValue::position(self.player.0, self.player.1),
        );
        state.insert(
            "exit".to_string(),
            StateValue::position(self.exit.0, self.exit.1),
        );
        state.insert("moves".to_string(), StateValue::from(self.moves));
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
        let mut snapshot = self.state();
        snapshot.insert(
            "start".to_string(),
            StateValue::position(self.start.0, self.start.1),
        );
        snapshot.insert("rows".to_string(), StateValue::from(self.rows));
        snapshot.insert("cols".to_string(), StateValue::from(self.cols));
        snapshot.insert("timer".to_string(), self.timer.to_state());
        snapshot.remove("won");
        snapshot
    }

    fn restore_state(&mut self, snapshot: &StateMap) -> Result<(), GameError> {
        let rows = snapshot.int("rows").ok_or(GameError::Snapshot("rows".into()))? as usize;
        let cols = snapshot.int("cols").ok_or(GameError::Snapshot("cols".into()))? as usize;
        let grid: Vec<String> = snapshot
            .list("grid")
            .ok_or(GameError::Snapshot("grid".into()))?
            .iter()
            .map(|value| value.as_str().map(String::from))
            .collect::<Option<_>>()
            .ok_or(GameError::Snapshot("grid".into()))?;
        if grid.len() != rows || grid.iter().any(|row| row.chars().count() != cols) {
            return Err(GameError::Snapshot("grid".into()));
        }
        let player = snapshot
            .pos("player")
            .ok_or(GameError::Snapshot("player".into()))?;
        let start = snapshot
            .pos("start")
            .ok_or(GameError::Snapshot("start".into()))?;
        let exit = snapshot
            .pos("exit")
            .ok_or(GameError::Snapshot("exit".into()))?;
        let moves = snapshot
            .int("moves")
            .ok_or(GameError::Snapshot("moves".into()))? as u32;

        self.rows = rows;
        self.cols = cols;
        self.grid = grid;
        self.start = start;
        self.exit = exit;
        self.player = player;
        self.moves = moves;
        if self.is_wall(player.0, player.1) {
            return Err(GameError::Snapshot("player".into()));
        }
        self.timer = snapshot
            .get("timer")
            .and_then(TimerState::from_state)
            .map(|timer| timer.resumed())
            .unwrap_or_default();
        Ok(())
    }
}
