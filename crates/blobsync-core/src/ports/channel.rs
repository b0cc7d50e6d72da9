//! Channel port definition.
//!
//! The channel performs one logical request against the remote store,
//! absorbing transient failures internally. Every failure, retryable or
//! not, collapses into `None` so callers have a single failure signal.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Default number of attempts for one logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default wall-clock budget for one logical request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6 * 60);

/// Body of a channel request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    /// No body: the request is a GET.
    #[default]
    None,
    /// URL-encoded form fields: the request is a POST.
    Form(BTreeMap<String, String>),
    /// Raw bytes: the request is a POST.
    Bytes {
        /// MIME type sent as `Content-Type`.
        content_type: String,
        /// Body payload.
        data: Bytes,
    },
}

impl RequestBody {
    /// Whether this body makes the request a POST.
    pub const fn is_post(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One logical request with its retry parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    /// Path relative to the channel's base URL.
    pub path: String,
    /// Request body; `None` means GET.
    pub body: RequestBody,
    /// Upper bound on attempts.
    pub max_attempts: u32,
    /// Wall-clock budget across all attempts and backoff sleeps.
    pub timeout: Duration,
    /// Treat HTTP 404 as transient (eventually consistent stores).
    pub retry_404: bool,
}

impl ChannelRequest {
    /// A GET request with default retry parameters.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: RequestBody::None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            retry_404: false,
        }
    }

    /// A form POST request with default retry parameters.
    pub fn post_form(path: impl Into<String>, fields: BTreeMap<String, String>) -> Self {
        Self {
            body: RequestBody::Form(fields),
            ..Self::get(path)
        }
    }

    /// A raw-bytes POST request with default retry parameters.
    pub fn post_bytes(path: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            body: RequestBody::Bytes {
                content_type: content_type.into(),
                data,
            },
            ..Self::get(path)
        }
    }

    /// Set the maximum number of attempts (at least one).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the wall-clock budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Opt into retrying HTTP 404.
    #[must_use]
    pub const fn with_retry_404(mut self, retry_404: bool) -> Self {
        self.retry_404 = retry_404;
        self
    }
}

/// Successful response of a logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResponse {
    /// HTTP status (always 2xx).
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl ChannelResponse {
    pub const fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// Read the body as a stream.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.body.clone())
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Port for the resilient request channel.
///
/// Implementations are shared by all workers of a coordinator and must be
/// safe to call concurrently.
#[async_trait]
pub trait ChannelPort: Send + Sync {
    /// Perform one logical request. `None` means unavailable: attempts or
    /// timeout exhausted, or a non-retryable failure (already logged).
    async fn request(&self, request: ChannelRequest) -> Option<ChannelResponse>;
}
