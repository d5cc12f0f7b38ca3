//! Candidate records and their normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum summary length accepted by the destination per text block, in
/// UTF-16 code units.
pub const SUMMARY_MAX_UNITS: usize = 2000;

/// Title used when the source shows none.
pub const UNTITLED_PLACEHOLDER: &str = "Untitled Recording";

/// Summary used when the source shows none.
pub const NO_SUMMARY_PLACEHOLDER: &str = "No summary available";

/// Prefix marking ids derived from content rather than provided by the source.
pub const SYNTHESIZED_ID_PREFIX: &str = "h-";

/// A recording as extracted from one page item, before any defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecording {
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub summary: Option<String>,
}

impl RawRecording {
    /// True when nothing at all could be extracted.
    pub fn is_empty(&self) -> bool {
        self.source_id.is_none()
            && self.title.is_none()
            && self.date.is_none()
            && self.summary.is_none()
    }
}

/// What to do with items that carry no title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UntitledPolicy {
    /// Keep the item under [`UNTITLED_PLACEHOLDER`].
    #[default]
    Keep,
    /// Discard the item.
    Drop,
}

impl std::str::FromStr for UntitledPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-with-placeholder" => Ok(Self::Keep),
            "drop" => Ok(Self::Drop),
            other => Err(format!("expected \"keep\" or \"drop\", got {other:?}")),
        }
    }
}

/// A candidate item from the record source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub title: String,
    /// Free-form timestamp text as shown by the source.
    pub date: String,
    pub summary: String,
}

impl Recording {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        date: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            date: date.into(),
            summary: summary.into(),
        }
    }

    /// Build a recording from raw extraction output.
    ///
    /// Returns `None` when the item has no title and `policy` is
    /// [`UntitledPolicy::Drop`].
    pub fn from_raw(raw: RawRecording, policy: UntitledPolicy, now: DateTime<Utc>) -> Option<Self> {
        let title = non_empty(raw.title);
        if title.is_none() && policy == UntitledPolicy::Drop {
            return None;
        }
        let date = non_empty(raw.date);
        let summary = non_empty(raw.summary);

        let id = match non_empty(raw.source_id) {
            Some(id) => id,
            None => synthesize_id(title.as_deref(), date.as_deref(), summary.as_deref()),
        };

        Some(Self {
            id,
            title: title.unwrap_or_else(|| UNTITLED_PLACEHOLDER.to_string()),
            date: date.unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            summary: summary.unwrap_or_else(|| NO_SUMMARY_PLACEHOLDER.to_string()),
        })
    }

    /// A copy whose summary fits the destination's per-block limit.
    #[must_use]
    pub fn truncated(&self) -> Self {
        Self {
            summary: truncate_summary(&self.summary).to_string(),
            ..self.clone()
        }
    }

    /// The date parsed into an instant, or `now` when it cannot be parsed.
    pub fn recorded_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        parse_recorded_at(&self.date).unwrap_or(now)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
}

/// Collapse internal runs of whitespace to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive a stable id from displayed content.
///
/// Hashes title and date text. Without date text the summary stands in, so an
/// id never depends on the time the page was scraped.
pub fn synthesize_id(title: Option<&str>, date: Option<&str>, summary: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collapse_whitespace(title.unwrap_or_default()).as_bytes());
    hasher.update([0x1f]);
    match date {
        Some(date) => {
            hasher.update(b"date:");
            hasher.update(collapse_whitespace(date).as_bytes());
        }
        None => {
            hasher.update(b"summary:");
            hasher.update(collapse_whitespace(summary.unwrap_or_default()).as_bytes());
        }
    }
    let digest = hasher.finalize();
    let hex: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
    format!("{SYNTHESIZED_ID_PREFIX}{hex}")
}

/// Longest left-anchored prefix that fits in [`SUMMARY_MAX_UNITS`] UTF-16
/// code units. Never splits a character.
pub fn truncate_summary(summary: &str) -> &str {
    let mut units = 0;
    for (idx, ch) in summary.char_indices() {
        units += ch.len_utf16();
        if units > SUMMARY_MAX_UNITS {
            return &summary[..idx];
        }
    }
    summary
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%b %d, %Y %H:%M",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parse timestamp text best-effort. Zone-less values are taken as UTC.
pub fn parse_recorded_at(text: &str) -> Option<DateTime<Utc>> {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
