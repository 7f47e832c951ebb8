//! Path-keyed artifact storage for trained models
//!
//! The store is the only shared state between training and prediction:
//! "does the artifact exist" decides whether a model is retrained.

use crate::features::StatExpr;
use crate::{HoopsError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of a stored artifact, restricted to file-safe characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn new(name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !name.starts_with('.');
        if !valid {
            return Err(HoopsError::Config(format!("Invalid artifact key: '{}'", name)));
        }
        Ok(ArtifactKey(name.to_string()))
    }

    /// Key for a player's over/under model, e.g. "LeBron_James_PTS_REB_model"
    pub fn over_under_model(player_slug: &str, expr: &StatExpr) -> Result<Self> {
        Self::new(&format!("{}_{}_model", player_slug, expr.key_fragment()))
    }

    /// Key for the team matchup model
    pub fn winner_model() -> Self {
        ArtifactKey("nba_prediction_model".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage interface for serialized artifacts
pub trait ArtifactStore {
    fn exists(&self, key: &ArtifactKey) -> bool;

    /// Human-readable location of an artifact, used in error messages
    fn location(&self, key: &ArtifactKey) -> String;

    fn load<T: DeserializeOwned>(&self, key: &ArtifactKey) -> Result<T>;

    fn store<T: Serialize>(&self, key: &ArtifactKey, value: &T) -> Result<()>;
}

/// JSON files in a directory, written atomically
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FileArtifactStore {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(format!("{}.json", key.as_str()))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn exists(&self, key: &ArtifactKey) -> bool {
        self.path(key).is_file()
    }

    fn location(&self, key: &ArtifactKey) -> String {
        self.path(key).display().to_string()
    }

    fn load<T: DeserializeOwned>(&self, key: &ArtifactKey) -> Result<T> {
        let path = self.path(key);
        if !path.is_file() {
            return Err(HoopsError::MissingArtifact {
                what: "model file".to_string(),
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn store<T: Serialize>(&self, key: &ArtifactKey, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path(key);
        let tmp = self.root.join(format!(".{}.json.tmp", key.as_str()));

        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        log::debug!("Stored artifact {}", path.display());
        Ok(())
    }
}

/// In-process store, mainly for tests
#[derive(Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<HashMap<ArtifactKey, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn exists(&self, key: &ArtifactKey) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    fn location(&self, key: &ArtifactKey) -> String {
        format!("memory:{}", key)
    }

    fn load<T: DeserializeOwned>(&self, key: &ArtifactKey) -> Result<T> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| HoopsError::Config("artifact store lock poisoned".into()))?;
        let content = entries.get(key).ok_or_else(|| HoopsError::MissingArtifact {
            what: "model".to_string(),
            path: self.location(key),
        })?;
        Ok(serde_json::from_str(content)?)
    }

    fn store<T: Serialize>(&self, key: &ArtifactKey, value: &T) -> Result<()> {
        let content = serde_json::to_string(value)?;
        self.entries
            .lock()
            .map_err(|_| HoopsError::Config("artifact store lock poisoned".into()))?
            .insert(key.clone(), content);
        Ok(())
    }
}
