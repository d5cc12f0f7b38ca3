//! Where fresh records are mirrored to.

use async_trait::async_trait;

use crate::error::RemoteApiError;
use crate::recording::Recording;

#[cfg(feature = "notion")]
pub mod notion;

/// The entry a sync target created for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntry {
    pub id: String,
    pub url: Option<String>,
}

/// A destination that accepts one new entry per record.
///
/// Creation is not idempotent: calling twice creates two entries. Duplicate
/// prevention lives in the sync history.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    async fn create_entry(&self, record: &Recording) -> Result<CreatedEntry, RemoteApiError>;
}
