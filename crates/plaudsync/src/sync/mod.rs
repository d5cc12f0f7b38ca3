//! One-way mirroring of fresh records into the sync target.
//!
//! # Module Structure
//!
//! - [`types`] - Run options and the end-of-run report
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`filter`] - Selecting records that still need mirroring
//! - [`engine`] - The orchestrator: `run_sync()`
//!
//! # Example
//!
//! ```ignore
//! use plaudsync::history::JsonHistoryStore;
//! use plaudsync::sync::{SyncOptions, run_sync};
//!
//! let store = JsonHistoryStore::new("synced-recordings.json");
//! let report = run_sync(&source, &target, &store, &SyncOptions::default(), None).await?;
//! println!("{}", report.summary());
//! ```

pub mod engine;
mod filter;
mod progress;
mod types;

pub use engine::run_sync;
pub use filter::select_fresh;
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use types::{DEFAULT_PACING, FailedRecord, SyncOptions, SyncReport};
