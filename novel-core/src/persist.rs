//! Profile persistence.
//!
//! Only the API key and the key event log survive a restart. Characters,
//! chapters and the running buffer are deliberately not saved.

use crate::world::KeyStoryEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current profile file version.
const PROFILE_VERSION: u32 = 1;

/// Directory name under the platform data dir.
const APP_DIR: &str = "gia-thien-ky-truyen";

/// What is remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub key_events: Vec<KeyStoryEvent>,
}

impl StoredProfile {
    pub fn new(credential: Option<String>, key_events: Vec<KeyStoryEvent>) -> Self {
        Self {
            version: PROFILE_VERSION,
            saved_at: Utc::now(),
            credential,
            key_events,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

impl Default for StoredProfile {
    fn default() -> Self {
        Self::new(None, Vec::new())
    }
}

/// A JSON profile file on disk.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/gia-thien-ky-truyen/profile.json`, when the platform has
    /// a data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR).join("profile.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the profile. A missing file is an empty profile.
    pub async fn load(&self) -> Result<StoredProfile, PersistError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no profile yet");
                return Ok(StoredProfile::default());
            }
            Err(e) => return Err(e.into()),
        };

        let profile: StoredProfile = serde_json::from_str(&content)?;
        if profile.version != PROFILE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: PROFILE_VERSION,
                found: profile.version,
            });
        }
        Ok(profile)
    }

    /// Write the profile, creating parent directories as needed.
    pub async fn save(&self, profile: &StoredProfile) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, content).await?;
        tracing::debug!(path = %self.path.display(), events = profile.key_events.len(), "profile saved");
        Ok(())
    }

    /// Load the profile, treating an unreadable one as empty.
    ///
    /// A corrupt or foreign-version file is logged and ignored; the next save
    /// overwrites it.
    pub async fn load_or_default(&self) -> StoredProfile {
        match self.load().await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable profile, starting empty");
                StoredProfile::default()
            }
        }
    }

    /// Replace the stored credential, keeping the events.
    pub async fn save_credential(&self, credential: &str) -> Result<(), PersistError> {
        let current = self.load_or_default().await;
        self.save(&StoredProfile::new(Some(credential.to_string()), current.key_events))
            .await
    }

    /// Replace the stored key events, keeping the credential.
    pub async fn save_key_events(&self, key_events: Vec<KeyStoryEvent>) -> Result<(), PersistError> {
        let current = self.load_or_default().await;
        self.save(&StoredProfile::new(current.credential, key_events))
            .await
    }
}
