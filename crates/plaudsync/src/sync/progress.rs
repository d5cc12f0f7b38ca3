//! Progress reporting types for sync runs.
//!
//! The orchestrator emits one event per phase and per record so the CLI can
//! drive either a progress bar or plain log lines from the same stream.

/// Progress events emitted during a sync run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// History loaded from the store.
    HistoryLoaded {
        /// Ids already mirrored.
        synced: usize,
        /// Ids that are no longer retried.
        dead: usize,
    },

    /// Logging in to the source and reading its listing.
    FetchingRecordings,

    /// The source returned its full listing.
    FetchedRecordings {
        /// Total recordings found.
        total: usize,
    },

    /// Already-mirrored and dead ids removed.
    FilterComplete {
        /// Recordings still to mirror.
        fresh: usize,
        /// Recordings before filtering.
        total: usize,
    },

    /// Starting to create entries.
    CreatingEntries {
        /// Number of fresh recordings.
        count: usize,
        /// Whether this is a dry run.
        dry_run: bool,
    },

    /// An entry was created.
    CreatedEntry {
        id: String,
        title: String,
        /// Link to the created entry, when the target returned one.
        url: Option<String>,
    },

    /// Dry run: an entry would have been created.
    WouldCreate { id: String, title: String },

    /// The target refused a record.
    CreateFailed {
        id: String,
        title: String,
        /// Error message.
        error: String,
        /// Consecutive failures including this one.
        attempts: u32,
        /// Whether the id will no longer be retried.
        dead: bool,
    },

    /// A record repeated an id that already succeeded in this run.
    SkippedDuplicate { id: String, title: String },

    /// Waiting before the next create call.
    Pacing {
        /// Delay in milliseconds.
        delay_ms: u64,
    },

    /// History written back to the store.
    HistorySaved {
        /// Ids now recorded as mirrored.
        synced: usize,
    },

    /// The run finished.
    SyncComplete {
        synced: usize,
        attempted: usize,
        failed: usize,
    },
}

/// Callback for progress updates during a sync run.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
///
/// This is a convenience function to avoid repetitive `if let Some(cb) = ...` patterns.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
