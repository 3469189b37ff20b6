//! Profile and high-score persistence over a small key/value store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use deadeye_core::settings::GameSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PROFILE_KEY: &str = "userProfile";
pub const HIGH_SCORES_KEY: &str = "highScores";
pub const DEFAULT_RECENT_SCORES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque string key/value storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::write(path, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub high_score: u64,
    #[serde(default)]
    pub settings: GameSettings,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            high_score: 0,
            settings: GameSettings::default(),
        }
    }
}

/// Recent session scores, best first.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScores {
    pub scores: Vec<u64>,
}

impl HighScores {
    /// Insert `score` keeping the list descending and at most `cap` long.
    /// Returns the 1-based rank, or `None` if it fell off the end.
    pub fn insert(&mut self, score: u64, cap: usize) -> Option<usize> {
        let pos = self
            .scores
            .iter()
            .position(|&s| score > s)
            .unwrap_or(self.scores.len());
        self.scores.insert(pos, score);
        self.scores.truncate(cap);
        (pos < cap).then_some(pos + 1)
    }

    pub fn best(&self) -> Option<u64> {
        self.scores.first().copied()
    }
}

/// Typed access to the stored profile and high scores.
pub struct ProfileRepository {
    store: Box<dyn KeyValueStore>,
    max_scores: usize,
}

impl std::fmt::Debug for ProfileRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileRepository")
            .field("max_scores", &self.max_scores)
            .finish_non_exhaustive()
    }
}

impl ProfileRepository {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            max_scores: DEFAULT_RECENT_SCORES,
        }
    }

    /// A repository over an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Length of the recent high-score list.
    pub fn with_max_scores(mut self, max_scores: usize) -> Self {
        self.max_scores = max_scores;
        self
    }

    pub fn max_scores(&self) -> usize {
        self.max_scores
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    pub fn load_profile(&self) -> Result<Option<UserProfile>, StoreError> {
        self.read(PROFILE_KEY)
    }

    pub fn save_profile(&mut self, profile: &UserProfile) -> Result<(), StoreError> {
        self.write(PROFILE_KEY, profile)
    }

    /// Stored high scores. A missing entry reads as an empty list.
    pub fn load_high_scores(&self) -> Result<HighScores, StoreError> {
        Ok(self.read(HIGH_SCORES_KEY)?.unwrap_or_default())
    }

    pub fn record_score(&mut self, score: u64) -> Result<HighScores, StoreError> {
        let mut scores = self.load_high_scores()?;
        scores.insert(score, self.max_scores);
        self.write(HIGH_SCORES_KEY, &scores)?;
        Ok(scores)
    }

    pub fn clear_high_scores(&mut self) -> Result<(), StoreError> {
        self.store.remove(HIGH_SCORES_KEY)
    }

    /// Persist the end of a session: raise the profile's high score if
    /// beaten, store the settings in use, and append to the recent scores.
    pub fn flush_session(
        &mut self,
        score: u64,
        username: &str,
        settings: &GameSettings,
    ) -> Result<UserProfile, StoreError> {
        let mut profile = match self.load_profile() {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::new(username),
            Err(e) => {
                tracing::warn!(error = %e, "Stored profile unreadable, starting fresh");
                UserProfile::new(username)
            },
        };
        profile.high_score = profile.high_score.max(score);
        profile.settings = settings.clone();
        self.save_profile(&profile)?;
        self.record_score(score)?;
        tracing::info!(score, high_score = profile.high_score, "Session flushed");
        Ok(profile)
    }
}
