//! Plaudsync CLI - mirror Plaud recordings into a Notion database.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::{Term, style};
use tracing_subscriber::EnvFilter;

use plaudsync::target::notion::NotionError;
use plaudsync::{ConfigError, InteractionError, PersistenceError, SyncError};

use crate::commands::OutputFormat;
use crate::commands::history::HistoryAction;
use crate::commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "plaudsync")]
#[command(version)]
#[command(about = "Mirror Plaud voice recordings into a Notion database")]
#[command(
    long_about = "Plaudsync logs in to the Plaud web app, reads every recording it lists and \
creates one Notion database page per recording it has not mirrored before. A local JSON \
history file makes repeated runs incremental; failed recordings are retried next run."
)]
#[command(after_long_help = r#"EXAMPLES
    Mirror new recordings:
        $ plaudsync sync

    See what would be created without touching Notion:
        $ plaudsync sync --dry-run

    Give up on a recording after three failed runs:
        $ plaudsync sync --max-attempts 3

    Retry everything that was given up on:
        $ plaudsync history revive --all

    Generate shell completions:
        $ plaudsync completions bash > ~/.local/share/bash-completion/completions/plaudsync

CONFIGURATION
    Plaudsync reads configuration from (later sources win):
      1. ~/.config/plaudsync/config.toml (or $XDG_CONFIG_HOME/plaudsync/config.toml)
      2. ./plaudsync.toml
      3. Environment variables (see below), including a .env file in the current directory

ENVIRONMENT VARIABLES
    PLAUD_EMAIL               Plaud login email
    PLAUD_PASSWORD            Plaud login password
    NOTION_API_KEY            Notion integration token
    NOTION_DATABASE_ID        Target Notion database
    PLAUDSYNC_<SECTION>__<KEY> Any config key, e.g. PLAUDSYNC_SYNC__PACING_MS=500

EXIT STATUS
    0  Run completed (including runs with failed recordings)
    1  Login, fetch or history write failed
    2  Configuration missing or invalid
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror new recordings into Notion
    Sync {
        #[command(flatten)]
        args: SyncArgs,
    },
    /// Validate configuration and print it with secrets masked
    Check {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Inspect or edit the sync history file
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,

        /// History file (default from config or ./synced-recordings.json)
        #[arg(long, value_name = "PATH", global = true)]
        history: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Process exit status for a failed command.
fn exit_status(err: &(dyn std::error::Error + 'static)) -> u8 {
    let config_error = err.is::<ConfigError>()
        || matches!(err.downcast_ref::<SyncError>(), Some(SyncError::Config(_)));
    if config_error { 2 } else { 1 }
}

/// Label printed in front of a fatal error.
fn error_label(err: &(dyn std::error::Error + 'static)) -> &'static str {
    if let Some(err) = err.downcast_ref::<SyncError>() {
        return match err {
            SyncError::Config(_) => "Configuration error",
            SyncError::Interaction(_) => "Plaud error",
            SyncError::Persistence(_) => "History error",
        };
    }
    if err.is::<ConfigError>() {
        "Configuration error"
    } else if err.is::<InteractionError>() {
        "Plaud error"
    } else if err.is::<NotionError>() {
        "Notion error"
    } else if err.is::<PersistenceError>() {
        "History error"
    } else {
        "Error"
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Completions and man pages never need configuration
    match &cli.command {
        Commands::Completions { shell } => return commands::meta::handle_completions(*shell),
        Commands::Man { output } => return commands::meta::handle_man(output.clone()),
        _ => {}
    }

    let config = config::Config::load()?;

    match cli.command {
        Commands::Sync { args } => commands::sync::handle_sync(args, &config).await,
        Commands::Check { output } => commands::check::handle_check(&config, output),
        Commands::History { action, history } => {
            commands::history::handle_history(action, history, &config)
        }
        Commands::Completions { .. } | Commands::Man { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Structured logging only when not connected to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("plaudsync=info,plaudsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!(
                "{} {}",
                style(format!("{}:", error_label(err.as_ref()))).red().bold(),
                err
            );
            ExitCode::from(exit_status(err.as_ref()))
        }
    }
}
