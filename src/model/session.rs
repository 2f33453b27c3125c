use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use uuid::Uuid;

use super::Difficulty;

/// Number of session doors; one puzzle category behind each.
pub const DOOR_COUNT: u8 = 3;

/// The persisted session envelope: which puzzle sits behind each door,
/// which doors are done this session, and how much of the time budget
/// has been spent. Elapsed time is a tick counter advanced by the
/// driver, never sampled from the wall clock.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSession {
    pub session_id: Uuid,
    pub difficulty: Difficulty,
    pub elapsed_seconds: u64,
    /// Door number (1..=DOOR_COUNT) to puzzle id.
    pub door_puzzles: BTreeMap<u8, String>,
    pub completed_doors: BTreeSet<u8>,
    #[serde_as(as = "TimestampSeconds")]
    pub started_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(difficulty: Difficulty, door_puzzles: BTreeMap<u8, String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            difficulty,
            elapsed_seconds: 0,
            door_puzzles,
            completed_doors: BTreeSet::new(),
            started_at: Utc::now(),
        }
    }

    pub fn time_budget(&self) -> u64 {
        self.difficulty.time_budget_seconds()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.time_budget().saturating_sub(self.elapsed_seconds)
    }

    /// One external tick. Saturates at the budget; the counter never
    /// decreases.
    pub fn tick(&mut self) {
        if self.elapsed_seconds < self.time_budget() {
            self.elapsed_seconds += 1;
        }
    }

    pub fn is_time_up(&self) -> bool {
        self.elapsed_seconds >= self.time_budget()
    }

    pub fn puzzle_for_door(&self, door: u8) -> Option<&str> {
        self.door_puzzles.get(&door).map(String::as_str)
    }

    /// Marks a door done for this session. Unassigned door numbers are
    /// ignored, preserving completed ⊆ assigned.
    pub fn mark_door_completed(&mut self, door: u8) -> bool {
        if self.door_puzzles.contains_key(&door) {
            self.completed_doors.insert(door);
            true
        } else {
            false
        }
    }

    pub fn is_door_completed(&self, door: u8) -> bool {
        self.completed_doors.contains(&door)
    }

    pub fn is_complete(&self) -> bool {
        !self.door_puzzles.is_empty()
            && self
                .door_puzzles
                .keys()
                .all(|door| self.completed_doors.contains(door))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        let doors = BTreeMap::from([
            (1, "maze-1".to_string()),
            (2, "match-1".to_string()),
            (3, "word-1".to_string()),
        ]);
        GameSession::new(Difficulty::Easy, doors)
    }

    #[test]
    fn test_complete_only_when_every_door_done() {
        let mut session = session();
        assert!(!session.is_complete());
        session.mark_door_completed(1);
        session.mark_door_completed(2);
        assert!(!session.is_complete());
        session.mark_door_completed(3);
        assert!(session.is_complete());
    }

    #[test]
    fn test_unassigned_door_not_tracked() {
        let mut session = session();
        assert!(!session.mark_door_completed(7));
        assert!(!session.is_door_completed(7));
        assert!(session.completed_doors.is_empty());
    }

    #[test]
    fn test_tick_saturates_at_budget() {
        let mut session = session();
        session.elapsed_seconds = session.time_budget() - 1;
        assert!(!session.is_time_up());
        session.tick();
        assert!(session.is_time_up());
        session.tick();
        assert_eq!(session.elapsed_seconds, session.time_budget());
    }

    #[test]
    fn test_envelope_round_trips_verbatim() {
        let mut session = session();
        session.elapsed_seconds = 42;
        session.mark_door_completed(2);
        // Timestamps persist at second granularity.
        session.started_at =
            DateTime::from_timestamp(session.started_at.timestamp(), 0).unwrap();
        let json = serde_json::to_string(&session).unwrap();
        let back: GameSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_started_at_persists_as_unix_seconds() {
        let session = session();
        let json = serde_json::to_value(&session).unwrap();
        assert!(json["started_at"].is_i64());
    }
}
