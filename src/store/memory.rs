use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::{ProgressStore, StoreError};
use crate::model::UserProgress;

/// In-memory store used by tests and as an orchestrator fake. The
/// failure toggle exercises the "failed save leaves state untouched"
/// contract.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: RefCell<HashMap<String, UserProgress>>,
    fail_next: Cell<bool>,
    save_count: Cell<u32>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_operation(&self) {
        self.fail_next.set(true);
    }

    pub fn save_count(&self) -> u32 {
        self.save_count.get()
    }

    pub fn stored(&self, player_id: &str) -> Option<UserProgress> {
        self.records.borrow().get(player_id).cloned()
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_next.take() {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, player_id: &str) -> Result<Option<UserProgress>, StoreError> {
        self.check_failure()?;
        Ok(self.records.borrow().get(player_id).cloned())
    }

    fn save(&self, progress: &UserProgress) -> Result<(), StoreError> {
        self.check_failure()?;
        self.save_count.set(self.save_count.get() + 1);
        self.records
            .borrow_mut()
            .insert(progress.player_id.clone(), progress.clone());
        Ok(())
    }
}
