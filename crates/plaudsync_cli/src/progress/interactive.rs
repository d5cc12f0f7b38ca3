use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use plaudsync::sync::SyncProgress;

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Spinner covering login and listing.
    fetch_bar: Option<ProgressBar>,
    /// One tick per fresh recording.
    create_bar: Option<ProgressBar>,
    created: usize,
    failed: usize,
    duplicates: usize,
    dry_run: bool,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// A reporter that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::HistoryLoaded { synced, dead } => {
                if dead > 0 {
                    drop(state);
                    self.multi
                        .println(format!(
                            "  {} recordings already synced, {} given up",
                            synced, dead
                        ))
                        .ok();
                }
            }

            SyncProgress::FetchingRecordings => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_prefix(format!("{:10}", "Plaud"));
                pb.set_message("Logging in...");
                pb.enable_steady_tick(Duration::from_millis(100));
                state.fetch_bar = Some(pb);
            }

            SyncProgress::FetchedRecordings { total } => {
                if let Some(ref pb) = state.fetch_bar {
                    pb.set_message(format!("Found {} recordings, filtering...", total));
                }
            }

            SyncProgress::FilterComplete { fresh, total } => {
                if let Some(ref pb) = state.fetch_bar {
                    pb.finish_with_message(format!("✓ {} recordings, {} new", total, fresh));
                }
            }

            SyncProgress::CreatingEntries { count, dry_run } => {
                let pb = self.multi.add(ProgressBar::new(count as u64));
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:10}", "Notion"));
                pb.set_message(if dry_run { "Planning..." } else { "Creating..." });
                state.create_bar = Some(pb);
                state.dry_run = dry_run;
            }

            SyncProgress::CreatedEntry { title, .. } => {
                state.created += 1;
                if let Some(ref pb) = state.create_bar {
                    pb.inc(1);
                    pb.set_message(format!("✓ {}", title));
                }
            }

            SyncProgress::WouldCreate { title, .. } => {
                state.created += 1;
                if let Some(ref pb) = state.create_bar {
                    pb.inc(1);
                    pb.set_message(format!("· {}", title));
                }
            }

            SyncProgress::CreateFailed {
                title, error, dead, ..
            } => {
                state.failed += 1;
                if let Some(ref pb) = state.create_bar {
                    pb.inc(1);
                    pb.set_message(format!("✗ {}", title));
                }
                let note = if dead { " (giving up)" } else { "" };
                drop(state);
                self.multi
                    .println(format!("⚠ {}: {}{}", title, error, note))
                    .ok();
            }

            SyncProgress::SkippedDuplicate { title, .. } => {
                state.duplicates += 1;
                if let Some(ref pb) = state.create_bar {
                    pb.inc(1);
                    pb.set_message(format!("= {}", title));
                }
            }

            SyncProgress::Pacing { delay_ms } => {
                if let Some(ref pb) = state.create_bar {
                    pb.set_message(format!("⏳ waiting {:.1}s", delay_ms as f64 / 1000.0));
                }
            }

            SyncProgress::SyncComplete { .. } => {
                if let Some(ref pb) = state.create_bar {
                    let verb = if state.dry_run { "planned" } else { "created" };
                    let mut msg = format!("✓ {} {}", state.created, verb);
                    if state.failed > 0 {
                        msg.push_str(&format!(", {} failed", state.failed));
                    }
                    if state.duplicates > 0 {
                        msg.push_str(&format!(", {} duplicate", state.duplicates));
                    }
                    pb.finish_with_message(msg);
                }
            }

            _ => {}
        }
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for pb in [&state.fetch_bar, &state.create_bar].into_iter().flatten() {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_outcomes() {
        let reporter = InteractiveReporter::hidden();
        reporter.handle(SyncProgress::CreatingEntries {
            count: 3,
            dry_run: false,
        });
        reporter.handle(SyncProgress::CreatedEntry {
            id: "a".to_string(),
            title: "A".to_string(),
            url: None,
        });
        reporter.handle(SyncProgress::SkippedDuplicate {
            id: "a".to_string(),
            title: "A".to_string(),
        });
        reporter.handle(SyncProgress::CreateFailed {
            id: "b".to_string(),
            title: "B".to_string(),
            error: "boom".to_string(),
            attempts: 3,
            dead: true,
        });

        let state = reporter.state.lock().unwrap();
        assert_eq!(state.created, 1);
        assert_eq!(state.duplicates, 1);
        assert_eq!(state.failed, 1);
        assert_eq!(state.create_bar.as_ref().map(|pb| pb.position()), Some(3));
    }

    #[test]
    fn test_finish_closes_open_bars() {
        let reporter = InteractiveReporter::hidden();
        reporter.handle(SyncProgress::FetchingRecordings);
        reporter.finish();

        let state = reporter.state.lock().unwrap();
        assert!(state.fetch_bar.as_ref().is_some_and(|pb| pb.is_finished()));
    }
}
