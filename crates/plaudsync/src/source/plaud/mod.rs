//! Plaud web app as a record source.
//!
//! # Module Structure
//!
//! - [`session`] - Cookie jar, redirect handling and the login form
//! - [`extract`] - Turning the listing page into raw recordings

pub mod extract;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::InteractionError;
use crate::http::HttpTransport;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::recording::Recording;
use crate::settings::PlaudSettings;
use crate::source::RecordSource;

pub use extract::{ExtractionStrategy, SelectorCascade};
pub use session::{Page, PlaudSession};

/// Reads recordings from the Plaud web app.
pub struct PlaudSource {
    transport: Arc<dyn HttpTransport>,
    settings: PlaudSettings,
    strategy: Box<dyn ExtractionStrategy>,
}

impl PlaudSource {
    /// Create a source backed by a real HTTP client.
    ///
    /// Every request is bounded by `settings.navigation_timeout`.
    pub fn new(settings: &PlaudSettings) -> Result<Self, InteractionError> {
        let transport = ReqwestTransport::with_timeout(settings.navigation_timeout).map_err(|e| {
            InteractionError::Transport {
                url: settings.base_url.clone(),
                message: e.to_string(),
            }
        })?;
        Self::new_with_transport(settings, Arc::new(transport))
    }

    /// Create a source over an arbitrary transport.
    pub fn new_with_transport(
        settings: &PlaudSettings,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, InteractionError> {
        let strategy = SelectorCascade::new(settings.selectors.clone())?;
        Ok(Self {
            transport,
            settings: settings.clone(),
            strategy: Box::new(strategy),
        })
    }

    /// Swap the extraction strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    async fn fetch_with(
        &self,
        session: &mut PlaudSession<'_>,
    ) -> Result<Vec<Recording>, InteractionError> {
        session.login(&self.settings).await?;
        let page = session.navigate(&self.settings.recordings_url()).await?;

        let raw = self.strategy.extract(&page.body);
        let found = raw.len();
        let now = Utc::now();
        let recordings: Vec<Recording> = raw
            .into_iter()
            .filter_map(|item| Recording::from_raw(item, self.settings.untitled_policy, now))
            .collect();

        if recordings.len() < found {
            tracing::info!(
                dropped = found - recordings.len(),
                "Dropped untitled recordings"
            );
        }
        tracing::info!(count = recordings.len(), url = %page.url, "Fetched recordings");
        Ok(recordings)
    }
}

#[async_trait]
impl RecordSource for PlaudSource {
    async fn fetch_all(&self) -> Result<Vec<Recording>, InteractionError> {
        let mut session = PlaudSession::open(self.transport.as_ref());
        let result = self.fetch_with(&mut session).await;
        session.close();
        result
    }
}
