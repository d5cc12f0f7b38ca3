//! Plaudsync - one-way mirroring of Plaud recordings into a Notion database.
//!
//! A run logs in to the Plaud web app, reads every recording it lists, drops
//! the ones already mirrored according to a local JSON history, creates one
//! Notion page per remaining recording and writes the history back.
//!
//! # Features
//!
//! - `plaud` - The Plaud web app record source ([`source::plaud`]).
//! - `notion` - The Notion sync target ([`target::notion`]).
//!
//! Both are enabled by default. Without them the crate still provides the
//! orchestrator, the history store and the collaborator traits.
//!
//! # Example
//!
//! ```ignore
//! use plaudsync::history::JsonHistoryStore;
//! use plaudsync::source::plaud::PlaudSource;
//! use plaudsync::sync::run_sync;
//! use plaudsync::target::notion::NotionClient;
//!
//! let source = PlaudSource::new(&settings.plaud)?;
//! let target = NotionClient::new(&settings.notion)?;
//! let store = JsonHistoryStore::new(&settings.history_path);
//! let report = run_sync(&source, &target, &store, &settings.sync, None).await?;
//! println!("{}", report.summary());
//! ```

pub mod error;
pub mod history;
pub mod http;
pub mod recording;
pub mod settings;
pub mod source;
pub mod sync;
pub mod target;

pub use error::{
    ConfigError, InteractionError, PersistenceError, RemoteApiError, SyncError,
    short_error_message,
};
pub use history::{FailureOutcome, HistoryStore, JsonHistoryStore, SyncHistory};
pub use recording::{RawRecording, Recording, UntitledPolicy};
pub use settings::{NotionSettings, PlaudSettings, Settings};
pub use source::RecordSource;
pub use sync::{SyncOptions, SyncReport, run_sync};
pub use target::{CreatedEntry, SyncTarget};
