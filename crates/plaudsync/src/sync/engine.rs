//! The sync orchestrator.
//!
//! Load history, fetch everything from the source, keep what is fresh, create
//! one target entry per fresh record with a fixed pause between calls, then
//! persist history once. A failed record is logged and skipped; a failed fetch
//! or a failed save ends the run.

use std::collections::HashSet;

use super::filter::select_fresh;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{FailedRecord, SyncOptions, SyncReport};
use crate::error::SyncError;
use crate::history::HistoryStore;
use crate::source::RecordSource;
use crate::target::SyncTarget;

/// Run one sync pass.
///
/// History is left untouched when the fetch fails, when nothing is fresh, and
/// in dry runs.
#[tracing::instrument(skip_all, fields(dry_run = options.dry_run))]
pub async fn run_sync<S, T, H>(
    source: &S,
    target: &T,
    store: &H,
    options: &SyncOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<SyncReport, SyncError>
where
    S: RecordSource + ?Sized,
    T: SyncTarget + ?Sized,
    H: HistoryStore + ?Sized,
{
    let mut report = SyncReport {
        dry_run: options.dry_run,
        ..SyncReport::default()
    };

    let mut history = store.load();
    emit(
        on_progress,
        SyncProgress::HistoryLoaded {
            synced: history.len(),
            dead: history.dead_ids().len(),
        },
    );

    emit(on_progress, SyncProgress::FetchingRecordings);
    let all = source.fetch_all().await?;
    report.fetched = all.len();
    emit(
        on_progress,
        SyncProgress::FetchedRecordings { total: all.len() },
    );

    if !options.dry_run {
        let listed: HashSet<&str> = all.iter().map(|r| r.id.as_str()).collect();
        let pruned = history.prune_failures(|id| listed.contains(id));
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped failure counters for unlisted recordings");
        }
    }

    let fresh = select_fresh(all, &history);
    report.fresh = fresh.len();
    emit(
        on_progress,
        SyncProgress::FilterComplete {
            fresh: fresh.len(),
            total: report.fetched,
        },
    );
    tracing::info!(
        total = report.fetched,
        fresh = report.fresh,
        "Selected recordings to sync"
    );

    if fresh.is_empty() {
        tracing::info!("Nothing new to sync");
        emit(
            on_progress,
            SyncProgress::SyncComplete {
                synced: 0,
                attempted: 0,
                failed: 0,
            },
        );
        return Ok(report);
    }

    emit(
        on_progress,
        SyncProgress::CreatingEntries {
            count: fresh.len(),
            dry_run: options.dry_run,
        },
    );

    let mut done: HashSet<String> = HashSet::new();
    for record in fresh {
        if done.contains(&record.id) {
            tracing::debug!(id = %record.id, title = %record.title, "Skipping duplicate id");
            report.duplicates += 1;
            emit(
                on_progress,
                SyncProgress::SkippedDuplicate {
                    id: record.id,
                    title: record.title,
                },
            );
            continue;
        }

        let record = record.truncated();

        if options.dry_run {
            report.attempted += 1;
            done.insert(record.id.clone());
            emit(
                on_progress,
                SyncProgress::WouldCreate {
                    id: record.id.clone(),
                    title: record.title.clone(),
                },
            );
            report.planned.push(record);
            continue;
        }

        if report.attempted > 0 && !options.pacing.is_zero() {
            emit(
                on_progress,
                SyncProgress::Pacing {
                    delay_ms: u64::try_from(options.pacing.as_millis()).unwrap_or(u64::MAX),
                },
            );
            tokio::time::sleep(options.pacing).await;
        }
        report.attempted += 1;

        match target.create_entry(&record).await {
            Ok(entry) => {
                history.mark_synced(record.id.as_str());
                done.insert(record.id.clone());
                report.synced += 1;
                tracing::info!(id = %record.id, title = %record.title, "Synced recording");
                emit(
                    on_progress,
                    SyncProgress::CreatedEntry {
                        id: record.id,
                        title: record.title,
                        url: entry.url.clone(),
                    },
                );
                report.created.push(entry);
            }
            Err(err) => {
                let outcome = history.record_failure(&record.id, options.max_attempts);
                tracing::warn!(
                    id = %record.id,
                    title = %err.title,
                    attempts = outcome.attempts(),
                    error = %err.message,
                    "Failed to sync recording"
                );
                if outcome.is_dead() && !report.newly_dead.contains(&record.id) {
                    tracing::warn!(id = %record.id, "Giving up on recording after repeated failures");
                    report.newly_dead.push(record.id.clone());
                }
                emit(
                    on_progress,
                    SyncProgress::CreateFailed {
                        id: record.id.clone(),
                        title: record.title.clone(),
                        error: err.message.clone(),
                        attempts: outcome.attempts(),
                        dead: outcome.is_dead(),
                    },
                );
                report.failures.push(FailedRecord {
                    id: record.id,
                    title: record.title,
                    message: err.message,
                    attempts: outcome.attempts(),
                    dead: outcome.is_dead(),
                });
            }
        }
    }

    if !options.dry_run {
        store.save(&history)?;
        report.history_saved = true;
        emit(
            on_progress,
            SyncProgress::HistorySaved {
                synced: history.len(),
            },
        );
    }

    tracing::info!(summary = %report.summary(), "Sync complete");
    emit(
        on_progress,
        SyncProgress::SyncComplete {
            synced: report.synced,
            attempted: report.attempted,
            failed: report.failed(),
        },
    );
    Ok(report)
}
