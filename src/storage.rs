//! Persisted remediation state
//!
//! Risks and tasks are rebuilt from scratch on every evaluation pass, so any
//! disposition that must outlive a rebuild lives here: a JSON document under
//! `.riskgraph/state.json`, keyed by the composite identities the engine
//! reproduces deterministically.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::risk::Treatment;
use crate::task::TaskState;

/// Directory the state file lives in, relative to the store root
pub const STATE_DIR: &str = ".riskgraph";

/// State file name inside [`STATE_DIR`]
pub const STATE_FILE: &str = "state.json";

/// Errors raised while loading or saving the state file
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed
    #[error("failed to access state file `{path}`: {source}")]
    Io {
        /// Path of the state file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The state file holds invalid JSON
    #[error("invalid state file `{path}`: {source}")]
    Parse {
        /// Path of the state file
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },
}

/// Recorded disposition of one risk, keyed by its risk id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStateRecord {
    /// The recorded treatment
    pub treatment: Treatment,
    /// Tracking ticket, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    /// Free-form comment, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// When the disposition was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Recorded lifecycle of one task, keyed by `template_id@risk_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStateRecord {
    /// The recorded lifecycle state
    pub state: TaskState,
    /// Tracking ticket, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    /// Free-form comment, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// When the state was recorded
    pub recorded_at: DateTime<Utc>,
}

/// The full persisted state of one model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelState {
    /// Risk dispositions keyed by risk id
    #[serde(default)]
    pub risks: BTreeMap<String, RiskStateRecord>,
    /// Task lifecycles keyed by `template_id@risk_id`
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskStateRecord>,
}

impl ModelState {
    /// Whether nothing has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.risks.is_empty() && self.tasks.is_empty()
    }
}

/// File-backed store for [`ModelState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given project directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the state file
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join(STATE_FILE)
    }

    /// Load the persisted state; a missing file yields the empty state
    pub fn load(&self) -> Result<ModelState, StorageError> {
        let path = self.path();
        if !path.exists() {
            debug!("no state file at {}, starting empty", path.display());
            return Ok(ModelState::default());
        }
        let raw = fs::read_to_string(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StorageError::Parse { path, source })
    }

    /// Write the state file, creating the state directory if needed
    pub fn save(&self, state: &ModelState) -> Result<(), StorageError> {
        let dir = self.root.join(STATE_DIR);
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = self.path();
        let json = serde_json::to_string_pretty(state).map_err(|source| StorageError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StorageError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_the_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let mut state = ModelState::default();
        state.risks.insert(
            "CAPEC-62@WebApp@Login".to_string(),
            RiskStateRecord {
                treatment: Treatment::Accepted,
                ticket: Some("SEC-42".to_string()),
                comment: None,
                recorded_at: Utc::now(),
            },
        );
        state.tasks.insert(
            "ASVS-4.2.2@CAPEC-62@WebApp@Login".to_string(),
            TaskStateRecord {
                state: TaskState::Closed,
                ticket: None,
                comment: Some("token added".to_string()),
                recorded_at: Utc::now(),
            },
        );

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StorageError::Parse { .. })));
    }
}
