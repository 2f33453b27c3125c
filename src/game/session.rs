use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::Utc;
use log::{info, trace, warn};
use rand::seq::SliceRandom;
use thiserror::Error;

use super::{new_game, restore_game, GameError, PuzzleGame};
use crate::events::EventEmitter;
use crate::model::{
    Difficulty, GameResult, GameSession, PausedPuzzle, PuzzleCategory, SessionEvent,
    UserProgress, DOOR_COUNT,
};
use crate::store::{ProgressStore, PuzzleLibrary, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("no active session")]
    NoSession,
    #[error("door {0} has no puzzle assigned")]
    DoorUnassigned(u8),
    #[error("puzzle '{0}' is not in the library")]
    PuzzleNotFound(String),
    #[error("no {category} puzzle available at {difficulty} difficulty")]
    NoPuzzleAvailable {
        category: PuzzleCategory,
        difficulty: Difficulty,
    },
}

/// Owns the session lifecycle: door assignment, the tick-driven time
/// budget, completion tracking, and the persistence of both the session
/// envelope and the single paused-puzzle slot.
///
/// The persistence handle is injected, so tests drive the orchestrator
/// against an in-memory store. Elapsed time advances only through
/// `tick()`; there is no internal clock.
pub struct SessionOrchestrator {
    store: Box<dyn ProgressStore>,
    library: Rc<PuzzleLibrary>,
    emitter: EventEmitter<SessionEvent>,
    progress: UserProgress,
    session: Option<GameSession>,
}

impl SessionOrchestrator {
    pub fn new(
        store: Box<dyn ProgressStore>,
        library: Rc<PuzzleLibrary>,
        player_id: &str,
        emitter: EventEmitter<SessionEvent>,
    ) -> Result<Self, SessionError> {
        let progress = store
            .load(player_id)?
            .unwrap_or_else(|| UserProgress::new(player_id));
        Ok(Self {
            store,
            library,
            emitter,
            progress,
            session: None,
        })
    }

    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.session.as_ref().map(|s| s.difficulty)
    }

    /// Writes current progress through the store. A fully completed
    /// session envelope is not persisted; completion destroys it across
    /// restarts while in-memory queries keep working.
    fn persist(&mut self) -> Result<(), SessionError> {
        self.progress.session = self
            .session
            .as_ref()
            .filter(|session| !session.is_complete())
            .cloned();
        self.store.save(&self.progress)?;
        Ok(())
    }

    /// Starts a fresh session: clears any stale envelope (the paused
    /// puzzle slot is left alone), shuffles the three categories across
    /// the doors, and assigns one puzzle per category, preferring
    /// puzzles the player has never completed.
    pub fn start_new_session(&mut self, difficulty: Difficulty) -> Result<(), SessionError> {
        self.session = None;

        let mut rng = rand::rng();
        let mut categories = PuzzleCategory::all();
        categories.shuffle(&mut rng);

        let mut door_puzzles = BTreeMap::new();
        for (index, category) in categories.iter().enumerate() {
            let door = index as u8 + 1;
            let puzzle = self
                .library
                .pick(*category, difficulty, &self.progress.completed_puzzles, &mut rng)
                .ok_or(SessionError::NoPuzzleAvailable {
                    category: *category,
                    difficulty,
                })?;
            door_puzzles.insert(door, puzzle.id.clone());
        }

        let session = GameSession::new(difficulty, door_puzzles);
        info!(
            target: "session",
            "Started session {} at {} difficulty", session.session_id, difficulty
        );
        let doors = session
            .door_puzzles
            .iter()
            .map(|(door, id)| (*door, id.clone()))
            .collect();
        self.session = Some(session);
        self.persist()?;
        self.emitter
            .emit(&SessionEvent::SessionStarted { difficulty, doors });
        Ok(())
    }

    /// Reloads a previously persisted envelope verbatim. Returns false
    /// when none exists; a corrupt store read also counts as "nothing to
    /// restore" rather than a crash.
    pub fn restore_session(&mut self) -> bool {
        let reloaded = match self.store.load(&self.progress.player_id) {
            Ok(progress) => progress,
            Err(err) => {
                warn!(target: "session", "Could not reload progress: {}", err);
                None
            }
        };
        if let Some(progress) = reloaded {
            self.progress = progress;
        }
        match self.progress.session.clone() {
            Some(session) => {
                info!(
                    target: "session",
                    "Restored session {} ({}s elapsed)",
                    session.session_id, session.elapsed_seconds
                );
                self.session = Some(session);
                true
            }
            None => false,
        }
    }

    /// Destroys the current envelope without touching permanent progress
    /// or the paused-puzzle slot.
    pub fn abandon_session(&mut self) -> Result<(), SessionError> {
        self.session = None;
        self.persist()
    }

    /// Builds an initialized game for the puzzle behind a door and
    /// announces it. The caller drives it through the uniform contract.
    pub fn open_door(&mut self, door: u8) -> Result<Box<dyn PuzzleGame>, SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NoSession)?;
        let puzzle_id = session
            .puzzle_for_door(door)
            .ok_or(SessionError::DoorUnassigned(door))?
            .to_string();
        let definition = self
            .library
            .get(&puzzle_id)
            .ok_or_else(|| SessionError::PuzzleNotFound(puzzle_id.clone()))?;
        let mut game = new_game(definition.category());
        game.initialize(definition)?;
        self.emitter.emit(&SessionEvent::DoorOpened {
            door,
            puzzle_id,
            category: definition.category(),
        });
        Ok(game)
    }

    pub fn is_door_completed(&self, door: u8) -> bool {
        self.session
            .as_ref()
            .map(|session| session.is_door_completed(door))
            .unwrap_or(false)
    }

    pub fn is_session_complete(&self) -> bool {
        self.session
            .as_ref()
            .map(GameSession::is_complete)
            .unwrap_or(false)
    }

    /// Session-local completion tracking, independent of the permanent
    /// completed-puzzle history.
    pub fn mark_door_completed(&mut self, door: u8) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoSession)?;
        if !session.mark_door_completed(door) {
            return Err(SessionError::DoorUnassigned(door));
        }
        let complete = session.is_complete();
        self.persist()?;
        if complete {
            info!(target: "session", "Session complete");
            self.emitter.emit(&SessionEvent::SessionCompleted);
        }
        Ok(())
    }

    /// Records a finished puzzle: on a win, permanent completion plus
    /// score bookkeeping, then door completion. Losses leave both the
    /// door and the permanent history untouched.
    pub fn record_result(&mut self, door: u8, result: &GameResult) -> Result<(), SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NoSession)?;
        let puzzle_id = session
            .puzzle_for_door(door)
            .ok_or(SessionError::DoorUnassigned(door))?
            .to_string();
        if !result.won {
            return Ok(());
        }
        self.emitter.emit(&SessionEvent::DoorCompleted {
            door,
            result: result.clone(),
        });
        let score = result.score(session.difficulty);
        self.progress.record_completion(&puzzle_id, score);
        self.mark_door_completed(door)
    }

    /// One external tick of the session clock. Crossing the budget
    /// atomically invalidates both the envelope and any paused puzzle:
    /// a timed-out session cannot be resumed.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.tick();
        let elapsed = session.elapsed_seconds;
        let remaining = session.remaining_seconds();
        trace!(target: "session", "Tick: {}s elapsed, {}s remaining", elapsed, remaining);
        self.emitter.emit(&SessionEvent::Ticked {
            elapsed_seconds: elapsed,
            remaining_seconds: remaining,
        });
        if remaining == 0 {
            info!(target: "session", "Session timed out");
            self.session = None;
            self.progress.paused_puzzle = None;
            self.persist()?;
            self.emitter.emit(&SessionEvent::SessionTimedOut);
        }
        Ok(())
    }

    pub fn is_session_time_up(&self) -> bool {
        // A session destroyed by timeout no longer reports time-up.
        self.session
            .as_ref()
            .map(GameSession::is_time_up)
            .unwrap_or(false)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.session
            .as_ref()
            .map(|session| session.elapsed_seconds)
            .unwrap_or(0)
    }

    /// Saves a mid-puzzle snapshot into the single paused-puzzle slot.
    /// A failed save is reported; the in-memory game is unaffected.
    pub fn pause_puzzle(
        &mut self,
        puzzle_id: &str,
        game: &dyn PuzzleGame,
    ) -> Result<(), SessionError> {
        self.progress.paused_puzzle = Some(PausedPuzzle {
            puzzle_id: puzzle_id.to_string(),
            category: game.category(),
            state: game.save_state(),
            saved_at: Utc::now(),
        });
        self.persist()
    }

    /// Rebuilds the paused game, re-attaching hint texts from the
    /// definition. An unreadable snapshot is discarded and treated as
    /// "no saved state".
    pub fn resume_paused_puzzle(
        &mut self,
    ) -> Result<Option<(String, Box<dyn PuzzleGame>)>, SessionError> {
        let Some(paused) = self.progress.paused_puzzle.clone() else {
            return Ok(None);
        };
        match restore_game(paused.category, &paused.state) {
            Ok(mut game) => {
                game.attach_hints(&self.library.hints_for(&paused.puzzle_id));
                self.progress.paused_puzzle = None;
                self.persist()?;
                Ok(Some((paused.puzzle_id, game)))
            }
            Err(err) => {
                warn!(
                    target: "session",
                    "Discarding unreadable paused snapshot for '{}': {}",
                    paused.puzzle_id, err
                );
                self.progress.paused_puzzle = None;
                self.persist()?;
                Ok(None)
            }
        }
    }

    pub fn has_paused_puzzle(&self) -> bool {
        self.progress.paused_puzzle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Channel;
    use crate::model::{StateMap, StateValue};
    use crate::store::MemoryProgressStore;
    use crate::tests::UsingLogger;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use test_context::test_context;

    fn orchestrator_with_store(
        store: Box<dyn ProgressStore>,
    ) -> (SessionOrchestrator, Rc<RefCell<Vec<SessionEvent>>>) {
        let (emitter, observer) = Channel::<SessionEvent>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        std::mem::forget(observer.subscribe(move |event: &SessionEvent| {
            seen_clone.borrow_mut().push(event.clone());
        }));
        let orchestrator = SessionOrchestrator::new(
            store,
            Rc::new(PuzzleLibrary::builtin()),
            "ada",
            emitter,
        )
        .unwrap();
        (orchestrator, seen)
    }

    fn orchestrator() -> (SessionOrchestrator, Rc<RefCell<Vec<SessionEvent>>>) {
        orchestrator_with_store(Box::new(MemoryProgressStore::new()))
    }

    fn won_result() -> GameResult {
        GameResult {
            won: true,
            elapsed: Duration::from_secs(20),
            moves: 10,
            hints_revealed: 0,
            answer: None,
        }
    }

    #[test]
    fn test_new_session_covers_every_category_once() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();

        let session = orchestrator.session().unwrap();
        assert_eq!(session.door_puzzles.len(), DOOR_COUNT as usize);
        let categories: BTreeSet<PuzzleCategory> = session
            .door_puzzles
            .values()
            .map(|id| {
                orchestrator
                    .library
                    .get(id)
                    .expect("assigned puzzle exists")
                    .category()
            })
            .collect();
        assert_eq!(categories.len(), 3);
    }

    #[test]
    fn test_session_complete_iff_all_doors_marked() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        for door in 1..=DOOR_COUNT {
            assert!(!orchestrator.is_session_complete());
            orchestrator.mark_door_completed(door).unwrap();
            assert!(orchestrator.is_door_completed(door));
        }
        assert!(orchestrator.is_session_complete());
    }

    #[test]
    fn test_completed_session_not_restorable() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        for door in 1..=DOOR_COUNT {
            orchestrator.mark_door_completed(door).unwrap();
        }
        assert!(orchestrator.is_session_complete());
        assert!(!orchestrator.restore_session());
    }

    #[test]
    fn test_restore_session_round_trips_envelope() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Medium).unwrap();
        orchestrator.tick().unwrap();
        orchestrator.tick().unwrap();
        orchestrator.mark_door_completed(1).unwrap();
        let saved = orchestrator.session().unwrap().clone();

        // mark_door_completed persisted after the ticks were counted
        // in-memory only; restore reflects the last persisted envelope.
        assert!(orchestrator.restore_session());
        let restored = orchestrator.session().unwrap();
        assert_eq!(restored.session_id, saved.session_id);
        assert!(restored.is_door_completed(1));
        assert_eq!(restored.elapsed_seconds, saved.elapsed_seconds);
    }

    #[test]
    fn test_restore_without_envelope_is_false() {
        let (mut orchestrator, _) = orchestrator();
        assert!(!orchestrator.restore_session());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_timeout_clears_envelope_and_paused_puzzle(_: &mut UsingLogger) {
        let (mut orchestrator, seen) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();

        let game = orchestrator.open_door(1).unwrap();
        let puzzle_id = orchestrator
            .session()
            .unwrap()
            .puzzle_for_door(1)
            .unwrap()
            .to_string();
        orchestrator.pause_puzzle(&puzzle_id, game.as_ref()).unwrap();
        assert!(orchestrator.has_paused_puzzle());

        let budget = Difficulty::Easy.time_budget_seconds();
        for _ in 0..budget {
            orchestrator.tick().unwrap();
        }
        assert!(orchestrator.session().is_none());
        assert!(!orchestrator.has_paused_puzzle());
        assert!(seen
            .borrow()
            .iter()
            .any(|event| matches!(event, SessionEvent::SessionTimedOut)));
        assert!(!orchestrator.restore_session());
    }

    #[test]
    fn test_start_new_session_keeps_paused_puzzle() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        let game = orchestrator.open_door(1).unwrap();
        orchestrator.pause_puzzle("some-id", game.as_ref()).unwrap();

        orchestrator.start_new_session(Difficulty::Hard).unwrap();
        assert!(orchestrator.has_paused_puzzle());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_pause_resume_round_trip(_: &mut UsingLogger) {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        let mut game = orchestrator.open_door(1).unwrap();
        let puzzle_id = orchestrator
            .session()
            .unwrap()
            .puzzle_for_door(1)
            .unwrap()
            .to_string();
        // Make at least one accepted move on whichever game this is.
        let moved = ["D", "S", "0 0", "HINT"]
            .iter()
            .any(|input| game.process_input(input));
        assert!(moved);

        orchestrator.pause_puzzle(&puzzle_id, game.as_ref()).unwrap();
        let (resumed_id, resumed) = orchestrator.resume_paused_puzzle().unwrap().unwrap();
        assert_eq!(resumed_id, puzzle_id);
        assert_eq!(resumed.category(), game.category());
        // Timers carry wall-clock pause bookkeeping; compare the rest.
        let mut restored_state = resumed.save_state();
        let mut original_state = game.save_state();
        restored_state.remove("timer");
        original_state.remove("timer");
        assert_eq!(restored_state, original_state);
        assert!(!orchestrator.has_paused_puzzle());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_unreadable_paused_snapshot_treated_as_absent(_: &mut UsingLogger) {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        orchestrator.progress.paused_puzzle = Some(PausedPuzzle {
            puzzle_id: "maze-easy-1".to_string(),
            category: PuzzleCategory::Maze,
            state: StateMap::from([("junk".to_string(), StateValue::Int(1))]),
            saved_at: Utc::now(),
        });
        assert!(orchestrator.resume_paused_puzzle().unwrap().is_none());
        assert!(!orchestrator.has_paused_puzzle());
    }

    #[test]
    fn test_record_win_updates_permanent_progress() {
        let (mut orchestrator, seen) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        let puzzle_id = orchestrator
            .session()
            .unwrap()
            .puzzle_for_door(2)
            .unwrap()
            .to_string();

        orchestrator.record_result(2, &won_result()).unwrap();
        assert!(orchestrator.is_door_completed(2));
        assert!(orchestrator.progress().is_puzzle_completed(&puzzle_id));
        assert!(orchestrator.progress().total_score > 0);
        assert!(seen
            .borrow()
            .iter()
            .any(|event| matches!(event, SessionEvent::DoorCompleted { door: 2, .. })));
    }

    #[test]
    fn test_record_loss_leaves_door_open() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        let lost = GameResult {
            won: false,
            ..won_result()
        };
        orchestrator.record_result(1, &lost).unwrap();
        assert!(!orchestrator.is_door_completed(1));
        assert!(orchestrator.progress().completed_puzzles.is_empty());
    }

    #[test]
    fn test_failed_save_reports_and_keeps_memory_state() {
        let store = MemoryProgressStore::new();
        // Keep a handle on the store alongside the boxed trait object.
        let store = Rc::new(store);

        struct Shared(Rc<MemoryProgressStore>);
        impl ProgressStore for Shared {
            fn load(&self, player_id: &str) -> Result<Option<UserProgress>, StoreError> {
                self.0.load(player_id)
            }
            fn save(&self, progress: &UserProgress) -> Result<(), StoreError> {
                self.0.save(progress)
            }
        }

        let (mut orchestrator, _) = orchestrator_with_store(Box::new(Shared(store.clone())));
        orchestrator.start_new_session(Difficulty::Easy).unwrap();

        store.fail_next_operation();
        assert!(orchestrator.mark_door_completed(1).is_err());
        // In-memory view is unaffected by the failed write, while the
        // store still holds the pre-failure envelope.
        assert!(orchestrator.is_door_completed(1));
        let persisted = store.stored("ada").unwrap();
        assert!(persisted.session.unwrap().completed_doors.is_empty());
    }

    #[test]
    fn test_preference_for_uncompleted_puzzles() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        // Complete the entire easy maze catalog except one.
        orchestrator
            .progress
            .completed_puzzles
            .insert("maze-easy-1".to_string());

        for _ in 0..10 {
            orchestrator.start_new_session(Difficulty::Easy).unwrap();
            let session = orchestrator.session().unwrap();
            let maze_id = session
                .door_puzzles
                .values()
                .find(|id| id.starts_with("maze"))
                .unwrap();
            assert_eq!(maze_id.as_str(), "maze-easy-2");
        }
    }

    #[test]
    fn test_open_door_requires_session() {
        let (mut orchestrator, _) = orchestrator();
        assert!(matches!(
            orchestrator.open_door(1),
            Err(SessionError::NoSession)
        ));
    }

    #[test]
    fn test_open_unassigned_door_fails() {
        let (mut orchestrator, _) = orchestrator();
        orchestrator.start_new_session(Difficulty::Easy).unwrap();
        assert!(matches!(
            orchestrator.open_door(9),
            Err(SessionError::DoorUnassigned(9))
        ));
    }
}
