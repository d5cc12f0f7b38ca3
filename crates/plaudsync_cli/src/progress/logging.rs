use plaudsync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::HistoryLoaded { synced, dead } => {
                tracing::info!(synced, dead, "Loaded sync history");
            }

            SyncProgress::FetchingRecordings => {
                tracing::info!("Fetching recordings from Plaud");
            }

            SyncProgress::FetchedRecordings { total } => {
                tracing::info!(total, "Fetched recordings");
            }

            SyncProgress::FilterComplete { fresh, total } => {
                tracing::info!(fresh, total, "Filtered already-synced recordings");
            }

            SyncProgress::CreatingEntries { count, dry_run } => {
                tracing::info!(count, dry_run, "Creating Notion pages");
            }

            SyncProgress::CreatedEntry { id, title, url } => {
                tracing::info!(id = %id, title = %title, url = ?url, "Created page");
            }

            SyncProgress::WouldCreate { id, title } => {
                tracing::info!(id = %id, title = %title, "Would create page");
            }

            SyncProgress::CreateFailed {
                id,
                title,
                error,
                attempts,
                dead,
            } => {
                if dead {
                    tracing::error!(id = %id, title = %title, error = %error, attempts, "Failed to create page, giving up");
                } else {
                    tracing::warn!(id = %id, title = %title, error = %error, attempts, "Failed to create page");
                }
            }

            SyncProgress::SkippedDuplicate { id, title } => {
                tracing::debug!(id = %id, title = %title, "Skipped duplicate recording");
            }

            SyncProgress::Pacing { delay_ms } => {
                tracing::debug!(delay_ms, "Pacing");
            }

            SyncProgress::HistorySaved { synced } => {
                tracing::debug!(synced, "Saved sync history");
            }

            SyncProgress::SyncComplete {
                synced,
                attempted,
                failed,
            } => {
                tracing::info!(synced, attempted, failed, "Sync complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
