//! Notion API request and response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/pages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePageRequest {
    pub parent: Parent,
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parent {
    pub database_id: String,
}

/// One database property value. Serialized by shape, without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    Date { date: DateValue },
    Select { select: SelectOption },
}

impl PropertyValue {
    pub fn title(content: impl Into<String>) -> Self {
        Self::Title {
            title: vec![RichText::plain(content)],
        }
    }

    pub fn rich_text(content: impl Into<String>) -> Self {
        Self::RichText {
            rich_text: vec![RichText::plain(content)],
        }
    }

    pub fn date(start: impl Into<String>) -> Self {
        Self::Date {
            date: DateValue {
                start: start.into(),
            },
        }
    }

    pub fn select(name: impl Into<String>) -> Self {
        Self::Select {
            select: SelectOption { name: name.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichText {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: TextContent,
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: TextContent {
                content: content.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateValue {
    pub start: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub name: String,
}

/// The parts of a created page we keep.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPage {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Notion's error object (`{"object":"error","status":400,"code":..,"message":..}`).
#[derive(Debug, Clone, Deserialize)]
pub struct NotionErrorBody {
    pub code: String,
    pub message: String,
}
