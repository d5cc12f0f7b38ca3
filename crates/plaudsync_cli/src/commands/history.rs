//! The `history` command: inspect and edit the sync history file.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use console::style;
use serde::Serialize;
use tabled::Tabled;

use plaudsync::{HistoryStore, JsonHistoryStore, SyncHistory};

use crate::commands::{OutputFormat, print_rows};
use crate::config::Config;

/// History subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum HistoryAction {
    /// Summarize synced, retrying and given-up recordings (default)
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Return given-up recordings to circulation so the next sync retries them
    Revive {
        /// Recording ids to revive
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        ids: Vec<String>,

        /// Revive every given-up recording
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct FailingRow {
    #[tabled(rename = "Recording")]
    pub id: String,
    #[tabled(rename = "Attempts")]
    pub attempts: u32,
    #[tabled(rename = "Status")]
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HistorySummary {
    pub path: String,
    pub synced: usize,
    pub failing: Vec<FailingRow>,
}

impl HistorySummary {
    pub(crate) fn new(path: &Path, history: &SyncHistory) -> Self {
        let mut failing: Vec<FailingRow> = history
            .failed_attempts()
            .iter()
            .filter(|(id, _)| !history.is_dead(id))
            .map(|(id, attempts)| FailingRow {
                id: id.clone(),
                attempts: *attempts,
                status: "retrying",
            })
            .collect();
        failing.extend(history.dead_ids().iter().map(|id| FailingRow {
            id: id.clone(),
            attempts: history.attempts(id),
            status: "given up",
        }));

        Self {
            path: path.display().to_string(),
            synced: history.len(),
            failing,
        }
    }
}

/// Handle history commands.
pub(crate) fn handle_history(
    action: Option<HistoryAction>,
    path: Option<PathBuf>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonHistoryStore::new(path.unwrap_or_else(|| config.history.path.clone()));

    match action.unwrap_or(HistoryAction::Show {
        output: OutputFormat::Table,
    }) {
        HistoryAction::Show { output } => show(&store, output),
        HistoryAction::Revive { ids, all } => revive(&store, &ids, all),
    }
}

fn show(store: &JsonHistoryStore, output: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let summary = HistorySummary::new(store.path(), &store.load());

    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            println!(
                "{} {} recordings synced",
                style(&summary.path).bold(),
                summary.synced
            );
            if !summary.failing.is_empty() {
                print_rows(&summary.failing, output)?;
            }
        }
    }
    Ok(())
}

fn revive(
    store: &JsonHistoryStore,
    ids: &[String],
    all: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut history = store.load();
    let revived = if all {
        history.revive_all()
    } else {
        history.revive(ids)
    };

    if revived.is_empty() {
        println!("{} Nothing to revive", style("⚠").yellow());
        return Ok(());
    }

    store.save(&history)?;
    for id in &revived {
        println!("  {} {}", style("↺").cyan(), id);
    }
    println!(
        "{} {} recording(s) will be retried on the next sync",
        style("✓").green(),
        revived.len()
    );
    Ok(())
}
