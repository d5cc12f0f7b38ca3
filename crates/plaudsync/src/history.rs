//! Durable record of which recordings have already been mirrored.
//!
//! The backing file is a small JSON document:
//!
//! ```json
//! { "syncedIds": ["r1", "r2"] }
//! ```
//!
//! `failedAttempts` and `deadIds` are written only when non-empty. Failure
//! counters are only kept while an attempt cap is configured, so a default
//! run always writes the minimal form.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Default history file name, relative to the working directory.
pub const DEFAULT_HISTORY_FILE: &str = "synced-recordings.json";

/// On-disk shape of the history file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFile {
    #[serde(default)]
    synced_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    failed_attempts: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dead_ids: Vec<String>,
}

/// Outcome of recording a failed create attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The id stays eligible and will be retried next run.
    Retry { attempts: u32 },
    /// The id reached the attempt cap and was moved to the dead set.
    Dead { attempts: u32 },
}

impl FailureOutcome {
    pub fn attempts(self) -> u32 {
        match self {
            Self::Retry { attempts } | Self::Dead { attempts } => attempts,
        }
    }

    pub fn is_dead(self) -> bool {
        matches!(self, Self::Dead { .. })
    }
}

/// Process state carried between runs.
///
/// `synced_ids` only ever grows. Insertion order is kept for a readable file
/// but carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncHistory {
    synced_ids: Vec<String>,
    synced_index: HashSet<String>,
    failed_attempts: BTreeMap<String, u32>,
    dead_ids: Vec<String>,
    dead_index: HashSet<String>,
}

impl SyncHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with already-synced ids. Duplicates are collapsed.
    pub fn from_synced<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self::new();
        for id in ids {
            history.mark_synced(id);
        }
        history
    }

    fn from_file(file: HistoryFile) -> Self {
        let mut history = Self::from_synced(file.synced_ids);
        for id in file.dead_ids {
            if !history.is_synced(&id) && history.dead_index.insert(id.clone()) {
                history.dead_ids.push(id);
            }
        }
        history.failed_attempts = file
            .failed_attempts
            .into_iter()
            .filter(|(id, attempts)| *attempts > 0 && !history.is_synced(id))
            .collect();
        history
    }

    fn to_file(&self) -> HistoryFile {
        HistoryFile {
            synced_ids: self.synced_ids.clone(),
            failed_attempts: self.failed_attempts.clone(),
            dead_ids: self.dead_ids.clone(),
        }
    }

    pub fn is_synced(&self, id: &str) -> bool {
        self.synced_index.contains(id)
    }

    pub fn is_dead(&self, id: &str) -> bool {
        self.dead_index.contains(id)
    }

    /// Number of synced ids.
    pub fn len(&self) -> usize {
        self.synced_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synced_ids.is_empty()
    }

    pub fn synced_ids(&self) -> &[String] {
        &self.synced_ids
    }

    pub fn dead_ids(&self) -> &[String] {
        &self.dead_ids
    }

    pub fn failed_attempts(&self) -> &BTreeMap<String, u32> {
        &self.failed_attempts
    }

    /// Consecutive failed attempts recorded for `id`.
    pub fn attempts(&self, id: &str) -> u32 {
        self.failed_attempts.get(id).copied().unwrap_or(0)
    }

    /// Record a successful mirror. Returns false if the id was already present.
    pub fn mark_synced(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        self.failed_attempts.remove(&id);
        if self.dead_index.remove(&id) {
            self.dead_ids.retain(|dead| dead != &id);
        }
        if self.synced_index.insert(id.clone()) {
            self.synced_ids.push(id);
            true
        } else {
            false
        }
    }

    /// Record a failed create attempt for `id`.
    ///
    /// With `max_attempts` set, consecutive failures are counted and the id
    /// moves to the dead set once the count reaches the cap. `None` retries
    /// forever and stores nothing.
    pub fn record_failure(&mut self, id: &str, max_attempts: Option<u32>) -> FailureOutcome {
        let Some(cap) = max_attempts else {
            return FailureOutcome::Retry {
                attempts: self.attempts(id).saturating_add(1),
            };
        };

        let attempts = self
            .failed_attempts
            .entry(id.to_string())
            .and_modify(|n| *n = n.saturating_add(1))
            .or_insert(1);
        let attempts = *attempts;

        if attempts >= cap.max(1) {
            if self.dead_index.insert(id.to_string()) {
                self.dead_ids.push(id.to_string());
            }
            FailureOutcome::Dead { attempts }
        } else {
            FailureOutcome::Retry { attempts }
        }
    }

    /// Drop failure counters of live ids the source no longer lists.
    ///
    /// Dead ids keep their counters until revived. Returns how many were dropped.
    pub fn prune_failures<F>(&mut self, mut listed: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.failed_attempts.len();
        let dead = &self.dead_index;
        self.failed_attempts
            .retain(|id, _| dead.contains(id) || listed(id.as_str()));
        before - self.failed_attempts.len()
    }

    /// Return dead ids to circulation. Returns the ids that were actually dead.
    pub fn revive<I, S>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut revived = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if self.dead_index.remove(id) {
                self.dead_ids.retain(|dead| dead != id);
                self.failed_attempts.remove(id);
                revived.push(id.to_string());
            }
        }
        revived
    }

    /// Return every dead id to circulation.
    pub fn revive_all(&mut self) -> Vec<String> {
        let dead = self.dead_ids.clone();
        self.revive(dead)
    }
}

/// Load and save [`SyncHistory`].
///
/// A single run owns the store; concurrent runs against the same backing
/// file are not coordinated.
pub trait HistoryStore: Send + Sync {
    /// Read persisted state. Absent or unreadable state yields an empty history.
    fn load(&self) -> SyncHistory;

    /// Replace persisted state with `history`.
    fn save(&self, history: &SyncHistory) -> Result<(), PersistenceError>;
}

/// History persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_HISTORY_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for JsonHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_FILE)
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> SyncHistory {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No sync history found, starting fresh");
                return SyncHistory::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Sync history unreadable, starting fresh");
                return SyncHistory::new();
            }
        };

        match serde_json::from_str::<HistoryFile>(&data) {
            Ok(file) => {
                let history = SyncHistory::from_file(file);
                tracing::debug!(
                    path = %self.path.display(),
                    synced = history.len(),
                    dead = history.dead_ids().len(),
                    "Loaded sync history"
                );
                history
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Sync history corrupt, starting fresh");
                SyncHistory::new()
            }
        }
    }

    fn save(&self, history: &SyncHistory) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&history.to_file())?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        // Write beside the target, then rename over it.
        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(self.io_error(e));
        }

        tracing::debug!(path = %self.path.display(), synced = history.len(), "Saved sync history");
        Ok(())
    }
}
