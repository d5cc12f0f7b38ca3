//! The HTTP seam shared by the Plaud session and the Notion client.
//!
//! Both collaborators talk to the network only through [`HttpTransport`], so
//! unit tests can script exact responses with the in-memory `MockTransport`.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// Ordered name/value pairs. Repeated headers such as `Set-Cookie` keep one
/// entry per occurrence; lookups ignore ASCII case.
pub type HttpHeaders = Vec<(String, String)>;

fn values<'a, 'n>(headers: &'a HttpHeaders, name: &'n str) -> impl Iterator<Item = &'a str> {
    headers
        .iter()
        .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// First value of `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        values(&self.headers, name).next()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First value of `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        values(&self.headers, name).next()
    }

    /// Every value of `name` in the order received.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        values(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A redirect status that carries a `Location` to follow.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// A scripted transport had nothing queued for the request.
    #[error("no response queued for {method} {url}")]
    Unrouted { method: HttpMethod, url: String },
}

/// Sends one request and returns the raw response.
///
/// Implementations never follow redirects: the Plaud session has to see each
/// hop to collect its cookies.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

#[cfg(any(feature = "plaud", feature = "notion"))]
pub mod reqwest_transport {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

    /// [`HttpTransport`] over a `reqwest` client with redirects disabled.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Every request is bounded by `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
            reqwest::Client::builder()
                .timeout(timeout)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map(|client| Self { client })
                .map_err(|e| HttpError::Transport(e.to_string()))
        }
    }

    fn transport_error(e: reqwest::Error) -> HttpError {
        HttpError::Transport(e.to_string())
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
            };
            let builder = request.headers.iter().fold(
                self.client.request(method, &request.url),
                |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
            );
            let builder = if request.body.is_empty() {
                builder
            } else {
                builder.body(request.body)
            };

            let response = builder.send().await.map_err(transport_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    let value = value.to_str().ok()?;
                    Some((name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response.bytes().await.map_err(transport_error)?.to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
pub(crate) use mock::MockTransport;

#[cfg(test)]
mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

    #[derive(Default)]
    struct Script {
        queued: HashMap<(HttpMethod, String), VecDeque<HttpResponse>>,
        seen: Vec<HttpRequest>,
    }

    /// Replays queued responses per method and URL and records every request.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        script: Arc<Mutex<Script>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue `response` for the next `method` request to `url`.
        pub fn push_response(&self, method: HttpMethod, url: &str, response: HttpResponse) {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script
                .queued
                .entry((method, url.to_string()))
                .or_default()
                .push_back(response);
        }

        /// Requests received so far.
        pub fn requests(&self) -> Vec<HttpRequest> {
            let script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script.seen.clone()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            let key = (request.method, request.url.clone());
            script.seen.push(request);
            script
                .queued
                .get_mut(&key)
                .and_then(VecDeque::pop_front)
                .ok_or(HttpError::Unrouted {
                    method: key.0,
                    url: key.1,
                })
        }
    }
}
