//! Where candidate records come from.

use async_trait::async_trait;

use crate::error::InteractionError;
use crate::recording::Recording;

#[cfg(feature = "plaud")]
pub mod plaud;

/// A system of record that can list everything it currently shows.
///
/// The whole listing is materialized up front; nothing is streamed.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Log in, navigate and extract every visible recording.
    ///
    /// Any login or navigation failure is fatal to the run.
    async fn fetch_all(&self) -> Result<Vec<Recording>, InteractionError>;
}
