//! Profile persistence in a single JSON document

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use super::{Challenge, ChallengeOutcome, Profile};
use crate::error::{ProfileError, ProfileResult};

#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create a fresh profile; an existing one is only replaced when `force`
    pub fn init(&self, username: &str, force: bool) -> ProfileResult<Profile> {
        if self.exists() && !force {
            return Err(ProfileError::AlreadyExists(self.path.clone()));
        }
        let profile = Profile::new(username, Utc::now());
        self.save(&profile)?;
        info!("Initialized profile for '{}' at {}", username, self.path.display());
        Ok(profile)
    }

    pub fn load(&self) -> ProfileResult<Profile> {
        if !self.exists() {
            return Err(ProfileError::NotInitialized(self.path.clone()));
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ProfileError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| ProfileError::parse(&self.path, e))
    }

    pub fn save(&self, profile: &Profile) -> ProfileResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProfileError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| ProfileError::serialize(&self.path, e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| ProfileError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ProfileError::io(&self.path, e))?;
        debug!("Saved profile to {}", self.path.display());
        Ok(())
    }

    /// Load, apply one challenge, save
    pub fn record_challenge(&self, challenge: &Challenge) -> ProfileResult<ChallengeOutcome> {
        let mut profile = self.load()?;
        let outcome = profile.record(challenge, Utc::now());
        self.save(&profile)?;
        info!(
            "Challenge #{} on '{}': +{} XP (total {}, streak {})",
            challenge.id, challenge.topic, outcome.xp_earned, outcome.total_xp, outcome.streak
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Difficulty;

    #[test]
    fn test_load_missing_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));
        assert!(matches!(store.load(), Err(ProfileError::NotInitialized(_))));
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("nested").join("profile.json"));
        store.init("ada", false).unwrap();

        assert!(matches!(store.init("bob", false), Err(ProfileError::AlreadyExists(_))));
        assert_eq!(store.load().unwrap().username, "ada");

        store.init("bob", true).unwrap();
        assert_eq!(store.load().unwrap().username, "bob");
    }

    #[test]
    fn test_record_challenge_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));
        store.init("ada", false).unwrap();

        let challenge = Challenge {
            id: 7,
            score: 2,
            topic: "sql".to_string(),
            difficulty: Difficulty::Expert,
            hint_used: true,
        };
        let outcome = store.record_challenge(&challenge).unwrap();
        // 12 * 2.0 * 1.15 * 0.75 = 20.7
        assert_eq!(outcome.xp_earned, 21);

        let profile = store.load().unwrap();
        assert_eq!(profile.total_xp, 21);
        assert_eq!(profile.next_challenge_id, 8);
        assert_eq!(profile.topics["sql"].attempts, 1);
        assert!(!dir.path().join("profile.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_profile_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(ProfileStore::new(path).load(), Err(ProfileError::Parse { .. })));
    }
}
