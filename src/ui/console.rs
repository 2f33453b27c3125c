use itertools::Itertools;

use super::Renderer;
use crate::model::{PuzzleCategory, StateMap, StateMapExt, StateValue};

/// Plain-text renderer for the console driver. Everything it prints
/// comes out of the generic snapshot; unknown or missing keys simply
/// render as blanks.
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn render(&self, state: &StateMap, category: PuzzleCategory) {
        match category {
            PuzzleCategory::Maze => render_maze(state),
            PuzzleCategory::Matching => render_matching(state),
            PuzzleCategory::Word => render_word(state),
        }
    }
}

fn render_maze(state: &StateMap) {
    let player = state.pos("player");
    let exit = state.pos("exit");
    if let Some(rows) = state.list("grid") {
        for (row_idx, row) in rows.iter().enumerate() {
            let Some(cells) = row.as_str() else { continue };
            let line: String = cells
                .chars()
                .enumerate()
                .map(|(col_idx, cell)| {
                    if player == Some((row_idx, col_idx)) {
                        'P'
                    } else if exit == Some((row_idx, col_idx)) {
                        'E'
                    } else {
                        cell
                    }
                })
                .collect();
            println!("  {}", line);
        }
    }
    println!("  moves: {}", state.int("moves").unwrap_or(0));
}

fn render_matching(state: &StateMap) {
    if let Some(rows) = state.list("board") {
        for row in rows {
            let Some(cells) = row.as_list() else { continue };
            let line = cells
                .iter()
                .map(|cell| {
                    let view = cell.as_map();
                    let matched = view
                        .and_then(|c| c.boolean("matched"))
                        .unwrap_or(false);
                    match view.and_then(|c| c.str("value")) {
                        Some(value) if matched => format!("[{}]", value),
                        Some(value) => format!(" {} ", value),
                        None => " ?? ".to_string(),
                    }
                })
                .join(" ");
            println!("  {}", line);
        }
    }
    println!("  moves: {}", state.int("moves").unwrap_or(0));
    if state.boolean("pair_shown").unwrap_or(false) {
        println!("  (memorize the pair!)");
    }
}

fn render_word(state: &StateMap) {
    if let Some(prompt) = state.str("prompt") {
        println!("  {}", prompt);
    }
    let used = state.int("attempts_used").unwrap_or(0);
    let max = state.int("max_attempts").unwrap_or(0);
    println!("  attempts: {}/{}", used, max);
    if let Some(guesses) = state.list("wrong_guesses") {
        if !guesses.is_empty() {
            let shown = guesses.iter().filter_map(StateValue::as_str).join(", ");
            println!("  wrong so far: {}", shown);
        }
    }
    if let Some(hints) = state.list("revealed_hints") {
        for hint in hints.iter().filter_map(StateValue::as_str) {
            println!("  hint: {}", hint);
        }
    }
    if state.int("hints_available").unwrap_or(0) > 0 {
        println!("  (type HINT for a free hint)");
    }
}
