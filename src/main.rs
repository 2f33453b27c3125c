use std::io::{self, BufRead, Write as IoWrite};
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::warn;

use puzzledoors::events::Channel;
use puzzledoors::game::{PuzzleGame, SessionOrchestrator};
use puzzledoors::helpers::Capitalize;
use puzzledoors::model::{Difficulty, SessionEvent, StateMapExt, DOOR_COUNT};
use puzzledoors::store::{JsonProgressStore, PuzzleLibrary};
use puzzledoors::ui::{ConsoleRenderer, Renderer};

/// How long a revealed pair stays on screen before the selection is
/// cleared. A driver courtesy, not a gameplay rule.
const PAIR_SHOWN_PAUSE: Duration = Duration::from_millis(1200);

#[derive(Parser, Debug)]
#[command(name = "puzzledoors", about = "Three doors, three puzzles, one clock.")]
struct Cli {
    /// Player name used to key saved progress.
    #[arg(long, default_value = "player")]
    player: String,

    /// Directory for saved progress files.
    #[arg(long, default_value = "./puzzledoors-data")]
    data_dir: PathBuf,

    /// Session difficulty for new sessions.
    #[arg(long, default_value = "easy")]
    difficulty: Difficulty,

    /// Optional JSON puzzle catalog; the built-in catalog is used
    /// otherwise.
    #[arg(long)]
    puzzles: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let library = match &cli.puzzles {
        Some(path) => match PuzzleLibrary::load_from_file(path) {
            Ok(library) => library,
            Err(err) => {
                eprintln!("Could not load puzzle catalog {:?}: {}", path, err);
                std::process::exit(1);
            }
        },
        None => PuzzleLibrary::builtin(),
    };

    let (emitter, observer) = Channel::<SessionEvent>::new();
    let _subscription = observer.subscribe(|event| match event {
        SessionEvent::SessionTimedOut => println!("\n*** Time is up! The doors slam shut. ***"),
        SessionEvent::SessionCompleted => println!("\n*** Every door cleared! ***"),
        _ => (),
    });

    let store = Box::new(JsonProgressStore::new(&cli.data_dir));
    let mut orchestrator =
        match SessionOrchestrator::new(store, Rc::new(library), &cli.player, emitter) {
            Ok(orchestrator) => orchestrator,
            Err(err) => {
                eprintln!("Could not load progress: {}", err);
                std::process::exit(1);
            }
        };

    if orchestrator.restore_session() {
        println!("Resuming your session ({}s used).", orchestrator.elapsed_seconds());
    } else if let Err(err) = orchestrator.start_new_session(cli.difficulty) {
        eprintln!("Could not start a session: {}", err);
        std::process::exit(1);
    }

    let renderer = ConsoleRenderer;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if orchestrator.is_session_complete() {
            println!("Final score: {}", orchestrator.progress().total_score);
            break;
        }
        let Some(session) = orchestrator.session() else {
            // Timed out mid-loop.
            break;
        };

        println!("\n{} left on the clock.", format_seconds(session.remaining_seconds()));
        for door in 1..=DOOR_COUNT {
            let marker = if orchestrator.is_door_completed(door) {
                "done"
            } else {
                "locked"
            };
            println!("  door {} [{}]", door, marker);
        }
        if orchestrator.has_paused_puzzle() {
            println!("  (a paused puzzle is waiting; type 'resume')");
        }
        print!("door number, resume, or quit> ");
        let Some(input) = read_line(&mut lines) else { break };
        if let Err(err) = orchestrator.tick() {
            warn!("Tick bookkeeping failed: {}", err);
        }

        match input.as_str() {
            "quit" => break,
            "resume" => match orchestrator.resume_paused_puzzle() {
                Ok(Some((puzzle_id, game))) => {
                    play(&mut orchestrator, &renderer, &mut lines, &puzzle_id, game);
                }
                Ok(None) => println!("Nothing to resume."),
                Err(err) => println!("Could not resume: {}", err),
            },
            _ => {
                let Ok(door) = input.parse::<u8>() else {
                    println!("Pick a door number between 1 and {}.", DOOR_COUNT);
                    continue;
                };
                if orchestrator.is_door_completed(door) {
                    println!("Door {} is already done this session.", door);
                    continue;
                }
                let puzzle_id = orchestrator
                    .session()
                    .and_then(|s| s.puzzle_for_door(door))
                    .map(String::from);
                match (puzzle_id, orchestrator.open_door(door)) {
                    (Some(puzzle_id), Ok(game)) => {
                        println!("\nBehind door {}: a {} puzzle.", door, game.category());
                        let outcome = play(&mut orchestrator, &renderer, &mut lines, &puzzle_id, game);
                        if let Some(result) = outcome {
                            if let Err(err) = orchestrator.record_result(door, &result) {
                                println!("Could not record the result: {}", err);
                            }
                        }
                    }
                    (_, Err(err)) => println!("{}", err),
                    (None, _) => println!("Door {} has nothing behind it.", door),
                }
            }
        }
    }
    println!("Goodbye.");
}

/// Drives one game through the uniform contract. `save` and `quit` are
/// driver commands and never reach `process_input`. Returns the result
/// when the game ran to completion.
fn play(
    orchestrator: &mut SessionOrchestrator,
    renderer: &ConsoleRenderer,
    lines: &mut impl Iterator<Item = io::Result<String>>,
    puzzle_id: &str,
    mut game: Box<dyn PuzzleGame>,
) -> Option<puzzledoors::model::GameResult> {
    loop {
        let state = game.state();
        println!();
        renderer.render(&state, game.category());

        if game.is_game_over() {
            let result = game.result();
            if result.won {
                println!("Solved it!");
            } else if let Some(answer) = &result.answer {
                println!("Out of attempts. The answer was {}.", answer);
            } else {
                println!("{} over.", game.category().tag().capitalize());
            }
            return Some(result);
        }

        print!("move (or save/quit)> ");
        let input = read_line(lines)?;
        if let Err(err) = orchestrator.tick() {
            warn!("Tick bookkeeping failed: {}", err);
        }
        if orchestrator.session().is_none() {
            // The clock ran out while the puzzle was open.
            return None;
        }

        match input.as_str() {
            "quit" => return None,
            "save" => {
                match orchestrator.pause_puzzle(puzzle_id, game.as_ref()) {
                    Ok(()) => {
                        println!("Saved. Come back through 'resume'.");
                        return None;
                    }
                    Err(err) => println!("Save failed, still playing: {}", err),
                }
            }
            _ => {
                if !game.process_input(&input) {
                    println!("That move was not accepted.");
                }
                if game.state().boolean("pair_shown").unwrap_or(false) {
                    // Let the player memorize the revealed pair.
                    renderer.render(&game.state(), game.category());
                    thread::sleep(PAIR_SHOWN_PAUSE);
                    game.clear_transient();
                }
            }
        }
    }
}

fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<String> {
    io::stdout().flush().ok();
    let line = lines.next()?.ok()?;
    Some(line.trim().to_string())
}

fn format_seconds(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
