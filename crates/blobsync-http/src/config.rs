//! Public configuration for the HTTP channel.

use std::path::PathBuf;
use std::time::Duration;

/// File name of the default cookie store, relative to the home directory.
const DEFAULT_COOKIE_FILE: &str = ".blobsync_cookies.json";

/// Configuration for an [`HttpChannel`](crate::HttpChannel).
///
/// Use the builder pattern methods to customize the channel. Per-request
/// retry bounds (attempts, timeout, 404 handling) travel with each
/// `ChannelRequest` instead.
///
/// # Example
///
/// ```
/// use blobsync_http::ChannelConfig;
/// use std::time::Duration;
///
/// let config = ChannelConfig::new()
///     .with_base_url("https://isolate.example.com")
///     .with_attempt_timeout(Duration::from_secs(30))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base URL every request path is resolved against
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Upper bound for a single attempt (the remaining budget may be lower)
    pub(crate) attempt_timeout: Duration,
    /// Connection establishment timeout
    pub(crate) connect_timeout: Duration,
    /// Initial bearer token
    pub(crate) token: Option<String>,
    /// Where session cookies are persisted; `None` keeps them in memory
    pub(crate) cookie_file: Option<PathBuf>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            user_agent: concat!("blobsync-http/", env!("CARGO_PKG_VERSION")).to_string(),
            attempt_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            token: None,
            cookie_file: None,
        }
    }
}

impl ChannelConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL of the remote store.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the user agent string for HTTP requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Cap the duration of a single attempt.
    ///
    /// Defaults to 60 seconds.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Set the connection timeout.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set an initial bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set an optional bearer token.
    #[must_use]
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Persist cookies to `path`.
    #[must_use]
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    /// Persist cookies to `~/.blobsync_cookies.json`.
    ///
    /// Leaves cookies in memory when no home directory can be determined.
    #[must_use]
    pub fn with_default_cookie_file(mut self) -> Self {
        self.cookie_file = dirs::home_dir().map(|home| home.join(DEFAULT_COOKIE_FILE));
        self
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
