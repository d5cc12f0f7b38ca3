//! Resolved, validated settings for one run.
//!
//! Built once at startup and handed by reference to the record source, the
//! sync target and the orchestrator. Required credentials are plain `String`s
//! here; absence is caught while resolving user configuration into these types.

use std::path::PathBuf;
use std::time::Duration;

use crate::history::DEFAULT_HISTORY_FILE;
use crate::recording::UntitledPolicy;
use crate::sync::SyncOptions;

/// Default Plaud web application origin.
pub const PLAUD_BASE_URL: &str = "https://web.plaud.ai";

/// Default Notion API origin.
pub const NOTION_API_BASE: &str = "https://api.notion.com";

/// Notion API version sent with every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Default per-request navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Ordered CSS selector fallbacks used to pick recordings out of a page.
///
/// Within each list the first selector that matches wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorLists {
    pub items: Vec<String>,
    pub title: Vec<String>,
    pub date: Vec<String>,
    pub summary: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for SelectorLists {
    fn default() -> Self {
        Self {
            items: owned(&[
                "[data-recording]",
                ".recording-item",
                ".file-item",
                ".note-item",
                "[class*=\"recording\"]",
                "[class*=\"file\"]",
            ]),
            title: owned(&[
                ".title",
                ".recording-title",
                "h3",
                "h4",
                ".name",
                "[class*=\"title\"]",
            ]),
            date: owned(&[
                ".date",
                ".time",
                ".timestamp",
                "time",
                "[class*=\"date\"]",
                "[class*=\"time\"]",
            ]),
            summary: owned(&[
                ".summary",
                ".description",
                ".content",
                ".transcript",
                "[class*=\"summary\"]",
                "[class*=\"description\"]",
            ]),
        }
    }
}

/// Record source settings.
#[derive(Debug, Clone)]
pub struct PlaudSettings {
    pub email: String,
    pub password: String,
    /// Origin of the web application, without trailing slash.
    pub base_url: String,
    pub login_path: String,
    pub recordings_path: String,
    pub navigation_timeout: Duration,
    pub untitled_policy: UntitledPolicy,
    pub selectors: SelectorLists,
}

impl PlaudSettings {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            base_url: PLAUD_BASE_URL.to_string(),
            login_path: "/login".to_string(),
            recordings_path: "/".to_string(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            untitled_policy: UntitledPolicy::default(),
            selectors: SelectorLists::default(),
        }
    }

    pub fn login_url(&self) -> String {
        join_url(&self.base_url, &self.login_path)
    }

    pub fn recordings_url(&self) -> String {
        join_url(&self.base_url, &self.recordings_path)
    }
}

/// Destination property names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNames {
    pub title: String,
    pub date: String,
    pub summary: String,
    pub source: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: "Name".to_string(),
            date: "Date".to_string(),
            summary: "Summary".to_string(),
            source: "Source".to_string(),
        }
    }
}

/// Sync target settings.
#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub api_key: String,
    pub database_id: String,
    pub api_base: String,
    pub request_timeout: Duration,
    pub properties: PropertyNames,
    /// Fixed select value tagging every created page.
    pub source_tag: String,
}

impl NotionSettings {
    pub fn new(api_key: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            database_id: database_id.into(),
            api_base: NOTION_API_BASE.to_string(),
            request_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            properties: PropertyNames::default(),
            source_tag: "Plaud".to_string(),
        }
    }
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub plaud: PlaudSettings,
    pub notion: NotionSettings,
    pub history_path: PathBuf,
    pub sync: SyncOptions,
}

impl Settings {
    pub fn new(plaud: PlaudSettings, notion: NotionSettings) -> Self {
        Self {
            plaud,
            notion,
            history_path: PathBuf::from(DEFAULT_HISTORY_FILE),
            sync: SyncOptions::default(),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        format!("{base}/")
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
