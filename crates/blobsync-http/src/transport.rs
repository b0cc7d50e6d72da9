//! HTTP transport abstraction.
//!
//! The channel owns the retry policy; a transport performs exactly one
//! attempt and reports either a response (any status) or a transport
//! failure. The production implementation uses reqwest; tests inject a
//! scripted fake.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::SET_COOKIE;
use url::Url;

use crate::config::ChannelConfig;
use crate::error::{ChannelError, TransportError};

// ============================================================================
// Request / Response
// ============================================================================

/// HTTP method of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully built single attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including the attempt counter for GETs and raw POSTs.
    pub url: Url,
    /// Extra headers (`Content-Type`, `Cookie`, `Authorization`).
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    /// Budget for this attempt alone.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as UTF-8 text, empty if there is none.
    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
            .unwrap_or_default()
    }
}

/// Raw outcome of an attempt that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Every `Set-Cookie` header value, in order.
    pub set_cookies: Vec<String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// A response with no cookies.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            set_cookies: Vec::new(),
            body: body.into(),
        }
    }

    /// Attach a `Set-Cookie` header.
    #[must_use]
    pub fn with_set_cookie(mut self, value: impl Into<String>) -> Self {
        self.set_cookies.push(value.into());
        self
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Performs one HTTP attempt.
///
/// This abstraction allows the retry loop to be tested without a network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request`. HTTP error statuses are returned as responses, not
    /// as errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

/// Production transport using reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(request.url),
            Method::Post => self.client.post(request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.timeout(request.timeout).send().await?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            set_cookies,
            body,
        })
    }
}

// ============================================================================
// Fake Transport for Testing
// ============================================================================
