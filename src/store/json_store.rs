use std::fs;
use std::path::PathBuf;

use log::trace;

use super::{ProgressStore, StoreError};
use crate::model::UserProgress;

/// One pretty-printed JSON file per player under an explicitly injected
/// data directory.
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    data_dir: PathBuf,
}

impl JsonProgressStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn progress_path(&self, player_id: &str) -> PathBuf {
        // Keep filenames tame regardless of what the player typed.
        let slug: String = player_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.data_dir.join(format!("progress_{}.json", slug.to_lowercase()))
    }
}

impl ProgressStore for JsonProgressStore {
    fn load(&self, player_id: &str) -> Result<Option<UserProgress>, StoreError> {
        let path = self.progress_path(player_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let progress = serde_json::from_str(&contents)?;
        trace!(target: "store", "Loaded progress from {:?}", path);
        Ok(Some(progress))
    }

    fn save(&self, progress: &UserProgress) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.progress_path(&progress.player_id);
        let contents = serde_json::to_string_pretty(progress)?;
        fs::write(&path, contents)?;
        trace!(target: "store", "Saved progress to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path());

        let mut progress = UserProgress::new("Ada Lovelace");
        progress.record_completion("maze-1", 800);
        store.save(&progress).unwrap();

        let loaded = store.load("Ada Lovelace").unwrap().unwrap();
        assert_eq!(loaded, progress);
    }

    #[test]
    #[serial]
    fn test_missing_player_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path());
        assert!(store.load("nobody").unwrap().is_none());
    }

    #[test]
    #[serial]
    fn test_corrupt_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path());
        let path = store.progress_path("ada");
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(store.load("ada"), Err(StoreError::Format(_))));
    }

    #[test]
    #[serial]
    fn test_player_id_slug_collides_consistently() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path());
        let progress = UserProgress::new("a/b c");
        store.save(&progress).unwrap();
        assert!(store.load("a/b c").unwrap().is_some());
    }
}
