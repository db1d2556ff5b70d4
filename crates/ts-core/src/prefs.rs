//! Per-agent preferences persisted as a small JSON file.
//!
//! The whole file is rewritten on every change. Reads are served from memory
//! so the router can consult the preference on each request without I/O.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_backend::PreferenceStore;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid preference file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
struct PrefsFile {
    /// Agent id → reasoning enabled.
    reasoning: BTreeMap<String, bool>,
}

/// [`PreferenceStore`] backed by a JSON file.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    state: Mutex<PrefsFile>,
}

impl FilePreferences {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| PrefsError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => PrefsFile::default(),
            Err(source) => return Err(PrefsError::Io { path, source }),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Open the store, starting empty if the file is unreadable.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::open(&path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring preference file");
            Self {
                path,
                state: Mutex::new(PrefsFile::default()),
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the reasoning preference and write the file.
    pub fn update_reasoning(&self, agent_id: &str, enabled: bool) -> Result<(), PrefsError> {
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.reasoning.insert(agent_id.to_string(), enabled);
            state.clone()
        };
        self.save(&snapshot)
    }

    fn save(&self, state: &PrefsFile) -> Result<(), PrefsError> {
        let io_err = |source: io::Error| PrefsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|source| PrefsError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io_err)
    }
}

impl PreferenceStore for FilePreferences {
    fn reasoning_preference(&self, agent_id: &str) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reasoning
            .get(agent_id)
            .copied()
            .unwrap_or(false)
    }

    fn set_reasoning_preference(&self, agent_id: &str, enabled: bool) {
        if let Err(e) = self.update_reasoning(agent_id, enabled) {
            tracing::warn!(agent = agent_id, error = %e, "preference not persisted");
        }
    }
}
