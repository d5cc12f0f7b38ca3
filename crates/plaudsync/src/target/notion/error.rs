//! Error types for Notion API operations.

use thiserror::Error;

use crate::error::RemoteApiError;

/// Errors that can occur when creating pages through the Notion API.
#[derive(Debug, Error)]
pub enum NotionError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        /// Notion's machine-readable error code, when the body had one.
        code: Option<String>,
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl NotionError {
    pub fn status(&self) -> Option<u16> {
        match self {
            NotionError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Attach the record title, producing the error the orchestrator reports.
    pub fn for_record(self, title: &str) -> RemoteApiError {
        let err = RemoteApiError::new(title, short_error_message(&self));
        match self.status() {
            Some(status) => err.with_status(status),
            None => err,
        }
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &NotionError) -> String {
    match err {
        NotionError::Http(message) => format!("Network error: {message}"),
        NotionError::Json(_) => "JSON parse error".to_string(),
        NotionError::Api {
            status,
            code,
            message,
        } => {
            let message = message.lines().next().unwrap_or_default();
            let message = if message.chars().count() > 200 {
                let truncated: String = message.chars().take(197).collect();
                format!("{truncated}...")
            } else {
                message.to_string()
            };
            match code {
                Some(code) => format!("HTTP {status} {code}: {message}"),
                None => format!("HTTP {status}: {message}"),
            }
        }
        NotionError::Config(msg) => format!("Config: {msg}"),
    }
}
