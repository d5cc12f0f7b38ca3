//! Notion database as a sync target.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for Notion API calls
//! - [`types`] - Request and response bodies
//! - [`client`] - The page-creating client

mod client;
mod error;
mod types;

pub use client::NotionClient;
pub use error::{NotionError, short_error_message};
pub use types::{CreatePageRequest, CreatedPage, NotionErrorBody, PropertyValue};
