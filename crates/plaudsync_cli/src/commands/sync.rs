//! The `sync` command: one incremental pass from Plaud into Notion.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::style;

use plaudsync::source::plaud::PlaudSource;
use plaudsync::target::notion::NotionClient;
use plaudsync::{
    ConfigError, JsonHistoryStore, Settings, SyncReport, UntitledPolicy, run_sync,
};

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Flags that override configuration for a single run.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct SyncArgs {
    /// Dry run - list what would be created without touching Notion or the history file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Delay between page creations in milliseconds (default from config or 1000)
    #[arg(short = 'p', long)]
    pub pacing_ms: Option<u64>,

    /// Stop retrying a recording after this many consecutive failures
    #[arg(short = 'm', long)]
    pub max_attempts: Option<u32>,

    /// Skip recordings that have no title instead of using a placeholder
    #[arg(long)]
    pub drop_untitled: bool,

    /// History file (default from config or ./synced-recordings.json)
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,
}

impl SyncArgs {
    /// Layer the flags over resolved settings.
    pub(crate) fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        if self.dry_run {
            settings.sync.dry_run = true;
        }
        if let Some(ms) = self.pacing_ms {
            settings.sync.pacing = Duration::from_millis(ms);
        }
        if let Some(max) = self.max_attempts {
            if max == 0 {
                return Err(ConfigError::invalid("--max-attempts", "must be at least 1"));
            }
            settings.sync.max_attempts = Some(max);
        }
        if self.drop_untitled {
            settings.plaud.untitled_policy = UntitledPolicy::Drop;
        }
        if let Some(ref path) = self.history {
            settings.history_path = path.clone();
        }
        Ok(())
    }
}

/// Handle the sync command.
pub(crate) async fn handle_sync(
    args: SyncArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config.settings()?;
    args.apply(&mut settings)?;

    let source = PlaudSource::new(&settings.plaud)?;
    let target = NotionClient::new(&settings.notion)?;
    let store = JsonHistoryStore::new(&settings.history_path);

    tracing::debug!(
        history = %store.path().display(),
        database = target.database_id(),
        "Starting sync"
    );

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let result = run_sync(&source, &target, &store, &settings.sync, Some(&*callback)).await;
    reporter.finish();

    let report = result?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!();

    if report.dry_run {
        for record in &report.planned {
            println!(
                "  {} {} {}",
                style("·").dim(),
                record.title,
                style(format!("({})", record.id)).dim()
            );
        }
    } else {
        for entry in &report.created {
            if let Some(ref url) = entry.url {
                println!("  {} {}", style("✓").green(), style(url).dim());
            }
        }
    }

    for failure in &report.failures {
        let note = if failure.dead {
            format!(" (giving up after {} attempts)", failure.attempts)
        } else {
            String::new()
        };
        println!(
            "  {} {}: {}{}",
            style("✗").red(),
            failure.title,
            failure.message,
            note
        );
    }

    let mark = if report.is_clean() {
        style("✓").green()
    } else {
        style("⚠").yellow()
    };
    if report.fresh == 0 {
        println!("{} No new recordings ({} found)", mark, report.fetched);
    } else {
        println!("{} {}", mark, report.summary());
    }
}
