//! Error taxonomy for a sync run.
//!
//! Only [`RemoteApiError`] is recoverable: the orchestrator logs it and moves
//! on to the next record. Everything wrapped by [`SyncError`] ends the run.

use std::path::PathBuf;

use thiserror::Error;

/// A required setting is absent or unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required keys have no value.
    #[error("Missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A key has a value that cannot be used.
    #[error("Invalid configuration for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    #[inline]
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Login, navigation or extraction against the record source failed.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The request never produced a response (DNS, TLS, timeout).
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A page answered with an unexpected status.
    #[error("Navigation to {url} failed with HTTP {status}")]
    Navigation { url: String, status: u16 },

    /// The login page did not contain usable credential inputs.
    #[error("Login form not found at {url}")]
    LoginFormNotFound { url: String },

    /// Credentials were submitted but no session was established.
    #[error("Login rejected: {message}")]
    LoginRejected { message: String },

    /// A redirect chain did not settle.
    #[error("Too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    /// A configured CSS selector could not be parsed.
    #[error("Invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
}

/// Creating one entry in the destination failed.
#[derive(Debug, Error)]
#[error("Failed to create entry for \"{title}\": {message}")]
pub struct RemoteApiError {
    /// Title of the record that could not be mirrored.
    pub title: String,
    /// Underlying failure, already shortened for display.
    pub message: String,
    /// HTTP status, when the destination answered at all.
    pub status: Option<u16>,
}

impl RemoteApiError {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Writing the history file failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to write sync history {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize sync history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fatal outcome of a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which is useful for errors
/// that carry a multi-line response body.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_lists_every_missing_key() {
        let err = ConfigError::Missing(vec![
            "plaud.email".to_string(),
            "notion.api_key".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("plaud.email, notion.api_key"));
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::invalid("plaud.untitled", "expected keep or drop");
        assert!(err.to_string().contains("plaud.untitled"));
        assert!(err.to_string().contains("expected keep or drop"));
    }

    #[test]
    fn test_remote_api_error_carries_title_and_status() {
        let err = RemoteApiError::new("Standup", "HTTP 400: validation_error").with_status(400);
        assert_eq!(err.status, Some(400));
        assert!(err.to_string().contains("\"Standup\""));
        assert!(err.to_string().contains("validation_error"));
    }

    #[test]
    fn test_sync_error_is_transparent() {
        let err: SyncError = InteractionError::LoginRejected {
            message: "still on login page".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Login rejected: still on login page");
    }

    #[test]
    fn test_persistence_error_names_path() {
        let err = PersistenceError::Io {
            path: PathBuf::from("/tmp/history.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/history.json"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_short_error_message_takes_first_line() {
        let err = std::io::Error::other("first line\nsecond line");
        assert_eq!(short_error_message(&err), "first line");
    }
}
