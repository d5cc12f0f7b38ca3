//! Sync run options and results.

use std::time::Duration;

use crate::recording::Recording;
use crate::target::CreatedEntry;

/// Fixed delay between consecutive create calls.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Options for one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delay between create attempts. Not applied after the last one.
    pub pacing: Duration,
    /// Report what would be created without calling the target or saving history.
    pub dry_run: bool,
    /// Consecutive failures after which an id stops being retried.
    /// `None` retries every run.
    pub max_attempts: Option<u32>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            dry_run: false,
            max_attempts: None,
        }
    }
}

/// A record the target refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    pub id: String,
    pub title: String,
    pub message: String,
    /// Consecutive failures including this one.
    pub attempts: u32,
    /// Whether this failure moved the id to the dead set.
    pub dead: bool,
}

/// What a sync run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records the source returned.
    pub fetched: usize,
    /// Records not yet synced and not dead.
    pub fresh: usize,
    /// Create attempts made (or planned, in a dry run).
    pub attempted: usize,
    pub synced: usize,
    /// Records skipped because their id already succeeded earlier in the run.
    pub duplicates: usize,
    pub failures: Vec<FailedRecord>,
    /// Ids moved to the dead set during this run.
    pub newly_dead: Vec<String>,
    pub created: Vec<CreatedEntry>,
    /// Records a dry run would have created, summaries truncated.
    pub planned: Vec<Recording>,
    pub dry_run: bool,
    pub history_saved: bool,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every attempted record made it across.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line outcome, e.g. `2/3 synced`.
    pub fn summary(&self) -> String {
        if self.dry_run {
            return format!("{} would be created (dry run)", self.planned.len());
        }
        let mut line = format!("{}/{} synced", self.synced, self.attempted);
        if self.duplicates > 0 {
            line.push_str(&format!(", {} duplicate(s) skipped", self.duplicates));
        }
        if !self.newly_dead.is_empty() {
            line.push_str(&format!(", {} given up", self.newly_dead.len()));
        }
        line
    }
}
