//! Mastery state persistence
//!
//! The state is always read and written as one whole document. There is no
//! locking: two processes doing read-modify-write on the same file at the
//! same time can lose an update (last writer wins).

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::mastery::MasteryState;
use crate::error::{KnowledgeError, KnowledgeResult};

/// Whole-document load/save of the mastery state
pub trait StateStore {
    /// Current state; an empty state when nothing has been saved yet
    fn load(&self) -> KnowledgeResult<MasteryState>;

    /// Replace the persisted state
    fn save(&self, state: &MasteryState) -> KnowledgeResult<()>;
}

/// State kept in a single pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateFile {
    fn load(&self) -> KnowledgeResult<MasteryState> {
        if !self.path.exists() {
            return Ok(MasteryState::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| KnowledgeError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| KnowledgeError::parse(&self.path, e))
    }

    fn save(&self, state: &MasteryState) -> KnowledgeResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KnowledgeError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| KnowledgeError::serialize(&self.path, e))?;

        // Write beside the target, then swap it in
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| KnowledgeError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| KnowledgeError::io(&self.path, e))?;

        debug!("Saved knowledge state to {}", self.path.display());
        Ok(())
    }
}

/// Process-local state, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RefCell<MasteryState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of what is currently "persisted"
    pub fn snapshot(&self) -> MasteryState {
        self.state.borrow().clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> KnowledgeResult<MasteryState> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &MasteryState) -> KnowledgeResult<()> {
        *self.state.borrow_mut() = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateFile::new(dir.path().join("knowledge_state.json"));
        let state = store.load().unwrap();
        assert!(state.domains.is_empty());
        assert_eq!(state.version, 1);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateFile::new(dir.path().join("deep").join("knowledge_state.json"));

        let mut state = MasteryState::default();
        state.get_or_create_record("ml", "backprop").observe(3, chrono::Utc::now());
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
        assert!(!dir.path().join("deep").join("knowledge_state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_state.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonStateFile::new(&path).load().unwrap_err();
        assert!(matches!(err, KnowledgeError::Parse { .. }));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStateStore::new();
        let mut state = store.load().unwrap();
        state.get_or_create_record("ml", "x");
        store.save(&state).unwrap();
        assert_eq!(store.snapshot().record_count(), 1);
    }
}
