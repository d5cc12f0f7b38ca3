//! The `check` command: resolve configuration and show it with secrets masked.

use console::style;
use serde::Serialize;
use tabled::Tabled;

use plaudsync::{Settings, UntitledPolicy};

use crate::commands::{OutputFormat, print_rows};
use crate::config::Config;

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct SettingRow {
    #[tabled(rename = "Setting")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl SettingRow {
    fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

/// Mask a secret, keeping a short prefix for recognition.
pub(crate) fn redact(secret: &str) -> String {
    let chars = secret.chars().count();
    if chars <= 8 {
        return "*".repeat(chars.max(4));
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}****")
}

pub(crate) fn redacted_rows(settings: &Settings) -> Vec<SettingRow> {
    let plaud = &settings.plaud;
    let notion = &settings.notion;
    let untitled = match plaud.untitled_policy {
        UntitledPolicy::Keep => "keep",
        UntitledPolicy::Drop => "drop",
    };
    let max_attempts = settings
        .sync
        .max_attempts
        .map_or_else(|| "unlimited".to_string(), |n| n.to_string());

    vec![
        SettingRow::new("plaud.email", plaud.email.as_str()),
        SettingRow::new("plaud.password", redact(&plaud.password)),
        SettingRow::new("plaud.login_url", plaud.login_url()),
        SettingRow::new("plaud.recordings_url", plaud.recordings_url()),
        SettingRow::new(
            "plaud.timeout_secs",
            plaud.navigation_timeout.as_secs().to_string(),
        ),
        SettingRow::new("plaud.untitled", untitled),
        SettingRow::new("plaud.selectors.items", plaud.selectors.items.join(", ")),
        SettingRow::new("notion.api_key", redact(&notion.api_key)),
        SettingRow::new("notion.database_id", notion.database_id.as_str()),
        SettingRow::new("notion.api_base", notion.api_base.as_str()),
        SettingRow::new("notion.source_tag", notion.source_tag.as_str()),
        SettingRow::new(
            "notion.properties",
            format!(
                "{}, {}, {}, {}",
                notion.properties.title,
                notion.properties.date,
                notion.properties.summary,
                notion.properties.source
            ),
        ),
        SettingRow::new("history.path", settings.history_path.display().to_string()),
        SettingRow::new(
            "sync.pacing_ms",
            settings.sync.pacing.as_millis().to_string(),
        ),
        SettingRow::new("sync.max_attempts", max_attempts),
    ]
}

/// Handle the check command.
pub(crate) fn handle_check(
    config: &Config,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.settings()?;
    print_rows(&redacted_rows(&settings), output)?;

    if matches!(output, OutputFormat::Table) {
        let source = Config::default_config_path()
            .filter(|path| path.exists())
            .map_or_else(
                || "defaults and environment".to_string(),
                |path| path.display().to_string(),
            );
        println!("{} Configuration OK ({})", style("✓").green(), source);
    }
    Ok(())
}
