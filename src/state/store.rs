// src/state/store.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{OrchixError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ComponentStatus;

/// Default location of the state artifact, relative to the working directory.
pub const DEFAULT_STATE_PATH: &str = ".orchix/state.json";

/// Last-known state of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentState {
    pub status: ComponentStatus,

    #[serde(default)]
    pub outputs: BTreeMap<String, String>,

    pub timestamp: DateTime<Utc>,

    /// Message of the last failure, if the component is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentState {
    pub fn new(status: ComponentStatus) -> Self {
        Self {
            status,
            outputs: BTreeMap::new(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn with_outputs(mut self, outputs: BTreeMap<String, String>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

type StateMap = BTreeMap<String, ComponentState>;

/// Durable id -> [`ComponentState`] mapping backed by one JSON file.
///
/// The file is read once at construction and rewritten in full on every
/// mutation. All access goes through one reader/writer lock, and the write
/// lock is held across the flush, so concurrent writers on distinct ids
/// never lose each other's updates. A failed flush leaves the in-memory map
/// untouched.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    states: RwLock<StateMap>,
}

impl StateStore {
    /// Open (or lazily create) the state file at `path` on the real filesystem.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_fs(path, Arc::new(RealFileSystem))
    }

    /// Open the state file through an arbitrary [`FileSystem`].
    pub fn with_fs(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let path = path.into();
        let states = load_states(&path, fs.as_ref())?;
        info!(path = %path.display(), components = states.len(), "state store loaded");

        Ok(Self {
            path,
            fs,
            states: RwLock::new(states),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<ComponentState> {
        self.read().get(id).cloned()
    }

    /// Consistent copy of every recorded state.
    pub fn snapshot(&self) -> BTreeMap<String, ComponentState> {
        self.read().clone()
    }

    /// Record `state` for `id` and flush to disk before returning.
    pub fn set_state(&self, id: &str, state: ComponentState) -> Result<()> {
        let mut guard = self.write();
        let mut next = guard.clone();
        next.insert(id.to_string(), state);
        self.flush(&next)?;
        *guard = next;
        debug!(component = %id, "state updated");
        Ok(())
    }

    /// Change the status of `id`, keeping any outputs it already has.
    pub fn transition(&self, id: &str, status: ComponentStatus) -> Result<()> {
        let mut guard = self.write();
        let mut next = guard.clone();
        let outputs = next.get(id).map(|s| s.outputs.clone()).unwrap_or_default();
        next.insert(id.to_string(), ComponentState::new(status).with_outputs(outputs));
        self.flush(&next)?;
        *guard = next;
        debug!(component = %id, %status, "state transitioned");
        Ok(())
    }

    /// Mark all `ids` as pending in a single flush.
    pub fn mark_pending<'a, I>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        for id in ids {
            let outputs = next.get(id).map(|s| s.outputs.clone()).unwrap_or_default();
            next.insert(
                id.to_string(),
                ComponentState::new(ComponentStatus::Pending).with_outputs(outputs),
            );
        }
        self.flush(&next)?;
        *guard = next;
        Ok(())
    }

    fn flush(&self, states: &StateMap) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(states)
            .context("serialising state")
            .map_err(|e| self.persistence_error(e))?;
        self.fs
            .write_atomic(&self.path, &bytes)
            .map_err(|e| self.persistence_error(e))
    }

    fn persistence_error(&self, source: anyhow::Error) -> OrchixError {
        OrchixError::StatePersistence {
            path: self.path.clone(),
            source,
        }
    }

    // The map is only replaced wholesale after a successful flush, so a
    // poisoned lock still guards a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, StateMap> {
        self.states.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateMap> {
        self.states.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn load_states(path: &Path, fs: &dyn FileSystem) -> Result<StateMap> {
    if !fs.exists(path) {
        return Ok(StateMap::new());
    }

    let to_err = |source: anyhow::Error| OrchixError::StatePersistence {
        path: path.to_path_buf(),
        source,
    };

    let contents = fs.read_to_string(path).map_err(to_err)?;
    if contents.trim().is_empty() {
        return Ok(StateMap::new());
    }

    serde_json::from_str(&contents)
        .with_context(|| format!("parsing state file {:?}", path))
        .map_err(to_err)
}
