//! Notion API client for page creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::error::NotionError;
use super::types::{CreatePageRequest, CreatedPage, NotionErrorBody, Parent, PropertyValue};
use crate::error::RemoteApiError;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpTransport};
use crate::recording::{Recording, truncate_summary};
use crate::settings::{NOTION_VERSION, NotionSettings, PropertyNames};
use crate::target::{CreatedEntry, SyncTarget};

/// Creates one database page per record.
#[derive(Clone)]
pub struct NotionClient {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    api_key: String,
    database_id: String,
    properties: PropertyNames,
    source_tag: String,
}

impl NotionClient {
    /// Create a new Notion client.
    pub fn new(settings: &NotionSettings) -> Result<Self, NotionError> {
        let transport = ReqwestTransport::with_timeout(settings.request_timeout)
            .map_err(|e| NotionError::Config(e.to_string()))?;
        Ok(Self::new_with_transport(settings, Arc::new(transport)))
    }

    pub fn new_with_transport(settings: &NotionSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            database_id: settings.database_id.clone(),
            properties: settings.properties.clone(),
            source_tag: settings.source_tag.clone(),
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Map a record onto the database schema.
    ///
    /// Dates that cannot be parsed fall back to `now`.
    pub fn page_request(&self, record: &Recording, now: DateTime<Utc>) -> CreatePageRequest {
        let recorded_at = record
            .recorded_at(now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut properties = BTreeMap::new();
        properties.insert(
            self.properties.title.clone(),
            PropertyValue::title(record.title.as_str()),
        );
        properties.insert(self.properties.date.clone(), PropertyValue::date(recorded_at));
        properties.insert(
            self.properties.summary.clone(),
            PropertyValue::rich_text(truncate_summary(&record.summary)),
        );
        properties.insert(
            self.properties.source.clone(),
            PropertyValue::select(self.source_tag.as_str()),
        );

        CreatePageRequest {
            parent: Parent {
                database_id: self.database_id.clone(),
            },
            properties,
        }
    }

    /// Issue `POST /v1/pages`.
    pub async fn create_page(&self, record: &Recording) -> Result<CreatedPage, NotionError> {
        let body = serde_json::to_vec(&self.page_request(record, Utc::now()))?;
        let request = HttpRequest::new(HttpMethod::Post, format!("{}/v1/pages", self.api_base))
            .with_header("Accept", "application/json")
            .with_header("Content-Type", "application/json")
            .with_header("User-Agent", "plaudsync")
            .with_header("Notion-Version", NOTION_VERSION)
            .with_header("Authorization", format!("Bearer {}", self.api_key))
            .with_body(body);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| NotionError::Http(e.to_string()))?;

        if !response.is_success() {
            return Err(match serde_json::from_slice::<NotionErrorBody>(&response.body) {
                Ok(body) => NotionError::Api {
                    status: response.status,
                    code: Some(body.code),
                    message: body.message,
                },
                Err(_) => NotionError::Api {
                    status: response.status,
                    code: None,
                    message: response.text(),
                },
            });
        }

        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[async_trait]
impl SyncTarget for NotionClient {
    async fn create_entry(&self, record: &Recording) -> Result<CreatedEntry, RemoteApiError> {
        let page = self
            .create_page(record)
            .await
            .map_err(|e| e.for_record(&record.title))?;
        tracing::debug!(id = %page.id, title = %record.title, "Created Notion page");
        Ok(CreatedEntry {
            id: page.id,
            url: page.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockTransport};
    use chrono::TimeZone;
    use serde_json::json;

    const PAGES_URL: &str = "https://notion.test/v1/pages";

    fn settings() -> NotionSettings {
        let mut settings = NotionSettings::new("secret_abc", "db-123");
        settings.api_base = "https://notion.test/".to_string();
        settings
    }

    fn response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[test]
    fn test_page_request_maps_properties() {
        let client = NotionClient::new_with_transport(&settings(), Arc::new(MockTransport::new()));
        let record = Recording::new("r1", "Standup", "2024-01-01", "Plans");
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let body = serde_json::to_value(client.page_request(&record, now)).unwrap();
        assert_eq!(
            body,
            json!({
                "parent": {"database_id": "db-123"},
                "properties": {
                    "Name": {"title": [{"type": "text", "text": {"content": "Standup"}}]},
                    "Date": {"date": {"start": "2024-01-01T00:00:00.000Z"}},
                    "Summary": {"rich_text": [{"type": "text", "text": {"content": "Plans"}}]},
                    "Source": {"select": {"name": "Plaud"}}
                }
            })
        );
    }

    #[test]
    fn test_page_request_unparseable_date_uses_now() {
        let client = NotionClient::new_with_transport(&settings(), Arc::new(MockTransport::new()));
        let record = Recording::new("r1", "T", "yesterday-ish", "S");
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let request = client.page_request(&record, now);
        assert_eq!(
            request.properties["Date"],
            PropertyValue::date("2024-06-01T12:00:00.000Z")
        );
    }

    #[test]
    fn test_page_request_truncates_summary() {
        let client = NotionClient::new_with_transport(&settings(), Arc::new(MockTransport::new()));
        let record = Recording::new("r1", "T", "2024-01-01", "é".repeat(2500));

        let request = client.page_request(&record, Utc::now());
        let PropertyValue::RichText { rich_text } = &request.properties["Summary"] else {
            panic!("summary should be rich text");
        };
        assert_eq!(rich_text[0].text.content.chars().count(), 2000);

        let record = Recording::new("r2", "T", "2024-01-01", "\u{1F399}".repeat(2000));
        let request = client.page_request(&record, Utc::now());
        let PropertyValue::RichText { rich_text } = &request.properties["Summary"] else {
            panic!("summary should be rich text");
        };
        assert_eq!(rich_text[0].text.content.encode_utf16().count(), 2000);
    }

    #[test]
    fn test_page_request_uses_configured_names() {
        let mut settings = settings();
        settings.properties.title = "Title".to_string();
        settings.source_tag = "Recorder".to_string();
        let client = NotionClient::new_with_transport(&settings, Arc::new(MockTransport::new()));

        let request = client.page_request(&Recording::new("r", "T", "", "S"), Utc::now());
        assert!(request.properties.contains_key("Title"));
        assert!(!request.properties.contains_key("Name"));
        assert_eq!(request.properties["Source"], PropertyValue::select("Recorder"));
    }

    #[tokio::test]
    async fn test_create_entry_success() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Post,
            PAGES_URL,
            response(
                200,
                json!({"object": "page", "id": "page-1", "url": "https://www.notion.so/page-1"}),
            ),
        );
        let client = NotionClient::new_with_transport(&settings(), Arc::new(transport.clone()));

        let created = client
            .create_entry(&Recording::new("r1", "Standup", "2024-01-01", "Plans"))
            .await
            .unwrap();
        assert_eq!(
            created,
            CreatedEntry {
                id: "page-1".to_string(),
                url: Some("https://www.notion.so/page-1".to_string()),
            }
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret_abc"));
        assert_eq!(requests[0].header("notion-version"), Some("2022-06-28"));
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["parent"]["database_id"], "db-123");
    }

    #[tokio::test]
    async fn test_create_entry_api_error() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Post,
            PAGES_URL,
            response(
                400,
                json!({
                    "object": "error",
                    "status": 400,
                    "code": "validation_error",
                    "message": "Date is not a property that exists."
                }),
            ),
        );
        let client = NotionClient::new_with_transport(&settings(), Arc::new(transport));

        let err = client
            .create_entry(&Recording::new("r1", "Standup", "2024-01-01", "Plans"))
            .await
            .unwrap_err();
        assert_eq!(err.title, "Standup");
        assert_eq!(err.status, Some(400));
        assert!(err.message.contains("validation_error"));
        assert!(err.message.contains("Date is not a property"));
    }

    #[tokio::test]
    async fn test_create_entry_non_json_error_keeps_raw_body() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Post,
            PAGES_URL,
            HttpResponse {
                status: 503,
                headers: Vec::new(),
                body: b"upstream unavailable".to_vec(),
            },
        );
        let client = NotionClient::new_with_transport(&settings(), Arc::new(transport));

        let err = client
            .create_entry(&Recording::new("r1", "T", "2024-01-01", "S"))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(503));
        assert_eq!(err.message, "HTTP 503: upstream unavailable");
    }

    #[tokio::test]
    async fn test_create_entry_transport_error() {
        let client = NotionClient::new_with_transport(&settings(), Arc::new(MockTransport::new()));

        let err = client
            .create_entry(&Recording::new("r1", "T", "2024-01-01", "S"))
            .await
            .unwrap_err();
        assert_eq!(err.status, None);
        assert!(err.message.starts_with("Network error"));
    }
}
