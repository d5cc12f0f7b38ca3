//! Configuration file support for plaudsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables prefixed with `PLAUDSYNC_` (`__` separates
//!    sections, e.g. `PLAUDSYNC_NOTION__DATABASE_ID`)
//! 3. Legacy environment variables (`PLAUD_EMAIL`, `PLAUD_PASSWORD`,
//!    `NOTION_API_KEY`, `NOTION_DATABASE_ID`)
//! 4. Local config file (`./plaudsync.toml`)
//! 5. XDG config file (`~/.config/plaudsync/config.toml`)
//! 6. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [plaud]
//! email = "me@example.com"
//! password = "..."          # or PLAUD_PASSWORD
//! untitled = "keep"         # or "drop"
//!
//! [plaud.selectors]
//! items = [".recording-item", ".file-item"]
//!
//! [notion]
//! api_key = "secret_..."    # or NOTION_API_KEY
//! database_id = "..."       # or NOTION_DATABASE_ID
//!
//! [notion.properties]
//! title = "Name"
//!
//! [history]
//! path = "synced-recordings.json"
//!
//! [sync]
//! pacing_ms = 1000
//! max_attempts = 5          # unset: retry failed recordings forever
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigBuilder as Builder, Environment, File, FileFormat};
use config::builder::DefaultState;
use directories::ProjectDirs;
use serde::Deserialize;

use plaudsync::ConfigError;
use plaudsync::history::DEFAULT_HISTORY_FILE;
use plaudsync::source::plaud::SelectorCascade;
use plaudsync::settings::{
    NOTION_API_BASE, NotionSettings, PLAUD_BASE_URL, PlaudSettings, PropertyNames, SelectorLists,
    Settings,
};
use plaudsync::sync::SyncOptions;

/// Environment variables read for backwards compatibility, with the key each maps to.
pub const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("PLAUD_EMAIL", "plaud.email"),
    ("PLAUD_PASSWORD", "plaud.password"),
    ("NOTION_API_KEY", "notion.api_key"),
    ("NOTION_DATABASE_ID", "notion.database_id"),
];

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub plaud: PlaudConfig,
    pub notion: NotionConfig,
    pub history: HistoryConfig,
    pub sync: SyncConfig,
}

/// Plaud web app configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlaudConfig {
    /// Login email. Can also be set via PLAUD_EMAIL.
    pub email: Option<String>,
    /// Login password. Can also be set via PLAUD_PASSWORD.
    pub password: Option<String>,
    pub base_url: String,
    pub login_path: String,
    pub recordings_path: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// `keep` or `drop` for recordings without a title.
    pub untitled: String,
    pub selectors: SelectorConfig,
}

impl Default for PlaudConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            base_url: PLAUD_BASE_URL.to_string(),
            login_path: "/login".to_string(),
            recordings_path: "/".to_string(),
            timeout_secs: 30,
            untitled: "keep".to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// Selector overrides. Unset lists keep the built-in cascade.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub items: Option<Vec<String>>,
    pub title: Option<Vec<String>>,
    pub date: Option<Vec<String>>,
    pub summary: Option<Vec<String>>,
}

/// Notion configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    /// Integration token. Can also be set via NOTION_API_KEY.
    pub api_key: Option<String>,
    /// Target database. Can also be set via NOTION_DATABASE_ID.
    pub database_id: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
    /// Select value tagging every created page.
    pub source_tag: String,
    pub properties: PropertiesConfig,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            database_id: None,
            api_base: NOTION_API_BASE.to_string(),
            timeout_secs: 30,
            source_tag: "Plaud".to_string(),
            properties: PropertiesConfig::default(),
        }
    }
}

/// Database property names.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PropertiesConfig {
    pub title: String,
    pub date: String,
    pub summary: String,
    pub source: String,
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        let names = PropertyNames::default();
        Self {
            title: names.title,
            date: names.date,
            summary: names.summary,
            source: names.source,
        }
    }
}

/// Sync history configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// History file, relative to the working directory unless absolute.
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_HISTORY_FILE),
        }
    }
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay between create calls.
    pub pacing_ms: u64,
    /// Consecutive failures before a recording is no longer retried.
    pub max_attempts: Option<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 1000,
            max_attempts: None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn selector_list(value: &Option<Vec<String>>, default: Vec<String>) -> Vec<String> {
    match value {
        Some(list) if !list.is_empty() => list.clone(),
        _ => default,
    }
}

/// Map legacy variables onto config keys, using `__` as the section separator.
pub fn legacy_env_map(lookup: impl Fn(&str) -> Option<String>) -> config::Map<String, String> {
    let mut map = config::Map::new();
    for (var, key) in LEGACY_ENV_VARS {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            map.insert(key.replace('.', "__"), value);
        }
    }
    map
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/plaudsync/config.toml)
    /// 3. Local config file (./plaudsync.toml)
    /// 4. Legacy environment variables
    /// 5. Environment variables with PLAUDSYNC_ prefix
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("plaudsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./plaudsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let legacy = legacy_env_map(|var| std::env::var(var).ok());
        Self::from_builder(Self::with_env(builder, legacy, None))
    }

    /// Add the legacy and `PLAUDSYNC_` environment layers.
    ///
    /// `prefixed` replaces the process environment when given. Values stay
    /// strings; numeric keys are converted when deserialized.
    fn with_env(
        builder: Builder<DefaultState>,
        legacy: config::Map<String, String>,
        prefixed: Option<config::Map<String, String>>,
    ) -> Builder<DefaultState> {
        builder
            .add_source(Environment::default().separator("__").source(Some(legacy)))
            .add_source(
                Environment::with_prefix("PLAUDSYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .source(prefixed),
            )
    }

    fn from_builder(builder: Builder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .build()
            .and_then(|settings| settings.try_deserialize::<Config>())
            .map_err(|e| ConfigError::invalid("config", e.to_string()))
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "plaudsync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve into library settings.
    ///
    /// Every missing required key is reported at once, before any network I/O.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let email = non_blank(&self.plaud.email);
        let password = non_blank(&self.plaud.password);
        let api_key = non_blank(&self.notion.api_key);
        let database_id = non_blank(&self.notion.database_id);

        let missing: Vec<String> = [
            ("plaud.email (PLAUD_EMAIL)", email.is_none()),
            ("plaud.password (PLAUD_PASSWORD)", password.is_none()),
            ("notion.api_key (NOTION_API_KEY)", api_key.is_none()),
            ("notion.database_id (NOTION_DATABASE_ID)", database_id.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(key, _)| key.to_string())
        .collect();

        let (Some(email), Some(password), Some(api_key), Some(database_id)) =
            (email, password, api_key, database_id)
        else {
            return Err(ConfigError::Missing(missing));
        };

        if self.plaud.timeout_secs == 0 {
            return Err(ConfigError::invalid("plaud.timeout_secs", "must be at least 1"));
        }
        if self.notion.timeout_secs == 0 {
            return Err(ConfigError::invalid("notion.timeout_secs", "must be at least 1"));
        }
        for (key, url) in [
            ("plaud.base_url", &self.plaud.base_url),
            ("notion.api_base", &self.notion.api_base),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::invalid(key, "expected an http(s) URL"));
            }
        }
        if self.sync.max_attempts == Some(0) {
            return Err(ConfigError::invalid("sync.max_attempts", "must be at least 1"));
        }

        let untitled_policy = self
            .plaud
            .untitled
            .parse()
            .map_err(|e: String| ConfigError::invalid("plaud.untitled", e))?;

        let defaults = SelectorLists::default();
        let selectors = &self.plaud.selectors;
        let mut plaud = PlaudSettings::new(email, password);
        plaud.base_url = self.plaud.base_url.trim_end_matches('/').to_string();
        plaud.login_path = self.plaud.login_path.clone();
        plaud.recordings_path = self.plaud.recordings_path.clone();
        plaud.navigation_timeout = Duration::from_secs(self.plaud.timeout_secs);
        plaud.untitled_policy = untitled_policy;
        plaud.selectors = SelectorLists {
            items: selector_list(&selectors.items, defaults.items),
            title: selector_list(&selectors.title, defaults.title),
            date: selector_list(&selectors.date, defaults.date),
            summary: selector_list(&selectors.summary, defaults.summary),
        };
        SelectorCascade::new(plaud.selectors.clone())
            .map_err(|e| ConfigError::invalid("plaud.selectors", e.to_string()))?;

        let mut notion = NotionSettings::new(api_key, database_id);
        notion.api_base = self.notion.api_base.clone();
        notion.request_timeout = Duration::from_secs(self.notion.timeout_secs);
        notion.source_tag = self.notion.source_tag.clone();
        notion.properties = PropertyNames {
            title: self.notion.properties.title.clone(),
            date: self.notion.properties.date.clone(),
            summary: self.notion.properties.summary.clone(),
            source: self.notion.properties.source.clone(),
        };

        let mut settings = Settings::new(plaud, notion);
        settings.history_path = self.history.path.clone();
        settings.sync = SyncOptions {
            pacing: Duration::from_millis(self.sync.pacing_ms),
            max_attempts: self.sync.max_attempts,
            ..SyncOptions::default()
        };
        Ok(settings)
    }
}
