//! Filesystem session store.
//!
//! Layout per session under the store root:
//!
//! ```text
//! <root>/<session_id>/state.json    # latest GameState snapshot
//! <root>/<session_id>/turns.jsonl   # append-only audit records
//! <root>/<session_id>/stories.jsonl # append-only reader-facing story log
//! ```
//!
//! Snapshots are written to a temp file and renamed into place so a crash
//! mid-write never corrupts the last good state. Append logs tolerate
//! trailing corruption: unreadable lines are skipped with a warning.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use fable_types::{GameState, InvalidSessionId, SessionId, TurnRecord};

use crate::error::StoreError;

/// Generate a fresh session id: `YYYYMMDD_HHMMSS_<8 hex>`.
///
/// Sortable by creation time and filesystem-safe by construction; the
/// validation only exists to uphold the `SessionId` contract.
pub fn generate_session_id(now: DateTime<Utc>) -> Result<SessionId, InvalidSessionId> {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    SessionId::parse(format!("{stamp}_{}", &suffix[..8]))
}

/// One reader-facing story log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryEntry {
    /// Turn index the line belongs to.
    pub turn_id: u64,
    /// When the line was written.
    pub timestamp: DateTime<Utc>,
    /// What the player typed.
    pub player_text: String,
    /// The narration shown, guard notices included.
    pub narration: String,
}

/// Durable state surface for sessions.
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    fn session_dir(&self, session_id: &SessionId) -> PathBuf {
        self.root.join(session_id.as_str())
    }

    /// Atomically replace the session's state snapshot.
    pub fn save_state(&self, state: &GameState) -> Result<(), StoreError> {
        let dir = self.session_dir(&state.session_id);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join("state.json");
        let tmp = dir.join("state.json.tmp");
        let json = serde_json::to_vec_pretty(state).map_err(|source| StoreError::Serde {
            path: path.clone(),
            source,
        })?;
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(session = state.session_id.as_str(), "state snapshot saved");
        Ok(())
    }

    /// Load the latest state snapshot for a session.
    pub fn load_state(&self, session_id: &SessionId) -> Result<GameState, StoreError> {
        let path = self.session_dir(session_id).join("state.json");
        if !path.exists() {
            return Err(StoreError::SessionNotFound {
                session: session_id.as_str().to_owned(),
                root: self.root.clone(),
            });
        }
        let bytes = fs::read(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Serde { path, source })
    }

    /// Append one audit record to the session's turn log.
    pub fn append_turn(&self, record: &TurnRecord) -> Result<(), StoreError> {
        self.append_jsonl(&record.session_id.clone(), "turns.jsonl", record)
    }

    /// Read every readable audit record, oldest first. Corrupt lines are
    /// skipped, not fatal.
    pub fn read_turns(&self, session_id: &SessionId) -> Result<Vec<TurnRecord>, StoreError> {
        self.read_jsonl(session_id, "turns.jsonl")
    }

    /// Append one story line to the session's story log.
    pub fn append_story(
        &self,
        session_id: &SessionId,
        entry: &StoryEntry,
    ) -> Result<(), StoreError> {
        self.append_jsonl(session_id, "stories.jsonl", entry)
    }

    /// Read every readable story line, oldest first.
    pub fn read_stories(&self, session_id: &SessionId) -> Result<Vec<StoryEntry>, StoreError> {
        self.read_jsonl(session_id, "stories.jsonl")
    }

    /// Session ids with a saved state, newest first by id.
    pub fn list_sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        let mut sessions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Ok(session_id) = SessionId::parse(name) {
                if entry.path().join("state.json").exists() {
                    sessions.push(session_id);
                }
            }
        }
        sessions.sort_by(|a, b| b.as_str().cmp(a.as_str()));
        Ok(sessions)
    }

    fn append_jsonl<T: Serialize>(
        &self,
        session_id: &SessionId,
        file: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(file);
        let mut line = serde_json::to_vec(value).map_err(|source| StoreError::Serde {
            path: path.clone(),
            source,
        })?;
        line.push(b'\n');
        let mut handle = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        handle.write_all(&line).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }

    fn read_jsonl<T: for<'de> Deserialize<'de>>(
        &self,
        session_id: &SessionId,
        file: &str,
    ) -> Result<Vec<T>, StoreError> {
        let path = self.session_dir(session_id).join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(path = %path.display(), line = index + 1, %error, "skipping corrupt log line");
                }
            }
        }
        Ok(records)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("root", &self.root)
            .finish()
    }
}

/// Path of a session's directory, for diagnostics.
pub fn session_path(root: &Path, session_id: &SessionId) -> PathBuf {
    root.join(session_id.as_str())
}
