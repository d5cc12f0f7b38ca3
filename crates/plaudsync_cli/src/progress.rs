//! Progress reporting for sync runs.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): Animated progress bars using indicatif
//! - Logging mode (non-TTY): Structured logging using tracing
//!
//! Progress bars are organized as:
//! - Fetch bar: Spinner while logging in and reading the listing
//! - Create bar: One tick per fresh recording

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use plaudsync::sync::{ProgressCallback, SyncProgress};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes, cron).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: SyncProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> Arc<ProgressCallback> {
        let reporter = Arc::clone(self);
        Arc::new(Box::new(move |event| {
            reporter.handle(event);
        }))
    }

    /// Finish all progress bars (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_forwards_to_reporter() {
        let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
        let callback = reporter.as_callback();
        callback(SyncProgress::FetchingRecordings);
        callback(SyncProgress::SyncComplete {
            synced: 1,
            attempted: 1,
            failed: 0,
        });
        reporter.finish();
    }

    #[test]
    fn test_interactive_reporter_survives_full_run() {
        let reporter = ProgressReporter::Interactive(InteractiveReporter::hidden());
        for event in [
            SyncProgress::HistoryLoaded { synced: 2, dead: 0 },
            SyncProgress::FetchingRecordings,
            SyncProgress::FetchedRecordings { total: 3 },
            SyncProgress::FilterComplete { fresh: 1, total: 3 },
            SyncProgress::CreatingEntries {
                count: 1,
                dry_run: false,
            },
            SyncProgress::CreateFailed {
                id: "r3".to_string(),
                title: "Standup".to_string(),
                error: "HTTP 400".to_string(),
                attempts: 1,
                dead: false,
            },
            SyncProgress::HistorySaved { synced: 2 },
            SyncProgress::SyncComplete {
                synced: 0,
                attempted: 1,
                failed: 1,
            },
        ] {
            reporter.handle(event);
        }
        reporter.finish();
    }
}
