//! The resilient HTTP channel.
//!
//! One [`HttpChannel`] is shared by every worker of a coordinator. It owns
//! the session (base URL, cookie jar, auth state) and runs each logical
//! request through an explicit retry state machine:
//!
//! ```text
//! Attempting -> BackingOff -> Attempting | Succeeded | Failed
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blobsync_core::{ChannelPort, ChannelRequest, ChannelResponse, RequestBody};
use bytes::Bytes;
use tracing::{debug, error, warn};
use url::Url;

use crate::auth::{AuthOutcome, AuthState, Authenticator, NoAuthenticator};
use crate::config::ChannelConfig;
use crate::cookies::CookieJar;
use crate::error::{ChannelError, TransportError};
use crate::retry::{MIN_ATTEMPT_TIMEOUT, RetryClock, RetryState, TokioClock};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

/// Reserved request parameter carrying the attempt counter.
pub const ATTEMPT_KEY: &str = "UrlOpenAttempt";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// Attempt classification
// ============================================================================

/// Typed outcome of a single attempt.
#[derive(Debug)]
enum AttemptOutcome {
    Success(HttpResponse),
    /// Transport error, 5xx, or 404 when opted in.
    Retryable(String),
    /// HTTP 403.
    AuthRequired,
    /// Any other failure; the request stops.
    Terminal(String),
}

fn classify(result: Result<HttpResponse, TransportError>, retry_404: bool) -> AttemptOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => return AttemptOutcome::Retryable(e.to_string()),
    };
    match response.status {
        200..=299 => AttemptOutcome::Success(response),
        403 => AttemptOutcome::AuthRequired,
        404 if retry_404 => AttemptOutcome::Retryable("HTTP 404".to_string()),
        500..=599 => AttemptOutcome::Retryable(format!("HTTP {}", response.status)),
        status => AttemptOutcome::Terminal(format!("HTTP {status}")),
    }
}

enum RetryPhase {
    Attempting,
    BackingOff,
    Succeeded(HttpResponse),
    Failed,
}

// ============================================================================
// Channel
// ============================================================================

/// Resilient request channel bound to one base URL.
pub struct HttpChannel<T = ReqwestTransport, K = TokioClock> {
    base_url: Url,
    transport: T,
    clock: K,
    authenticator: Arc<dyn Authenticator>,
    auth: AuthState,
    cookies: Arc<CookieJar>,
    attempt_timeout: Duration,
}

impl HttpChannel {
    /// Create a channel with the reqwest transport and real sleeps.
    pub fn new(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let transport = ReqwestTransport::new(config)?;
        Self::with_parts(config, transport, TokioClock)
    }
}

impl<T: HttpTransport, K: RetryClock> HttpChannel<T, K> {
    /// Create a channel from explicit parts.
    ///
    /// Loads the cookie store once.
    pub fn with_parts(config: &ChannelConfig, transport: T, clock: K) -> Result<Self, ChannelError> {
        let base_url = parse_base_url(&config.base_url)?;
        debug!(base_url = %base_url, "Opening channel");
        Ok(Self {
            base_url,
            transport,
            clock,
            authenticator: Arc::new(NoAuthenticator),
            auth: AuthState::with_token(config.token.as_deref()),
            cookies: Arc::new(CookieJar::load(config.cookie_file.clone())),
            attempt_timeout: config.attempt_timeout,
        })
    }

    /// Set the hook called when the server answers 403.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Save cookies now instead of waiting for the next success or drop.
    pub async fn flush(&self) {
        if !self.cookies.needs_persist() {
            return;
        }
        let cookies = Arc::clone(&self.cookies);
        if let Err(e) = tokio::task::spawn_blocking(move || cookies.persist()).await {
            warn!(error = %e, "Cookie save task failed");
        }
    }

    /// Perform one logical request.
    ///
    /// Returns `None` when attempts or the timeout are exhausted, or on a
    /// non-retryable failure. The failure detail is only logged.
    pub async fn request(&self, request: ChannelRequest) -> Option<ChannelResponse> {
        if matches!(&request.body, RequestBody::Form(fields) if fields.contains_key(ATTEMPT_KEY)) {
            error!(path = %request.path, "Request data must not contain {ATTEMPT_KEY}");
            return None;
        }
        let url = match self.base_url.join(request.path.trim_start_matches('/')) {
            Ok(url) => url,
            Err(e) => {
                error!(path = %request.path, error = %e, "Invalid request path");
                return None;
            }
        };

        let mut state = RetryState::new(self.clock.now(), request.max_attempts, request.timeout);
        let mut reauthenticated = false;
        let mut phase = RetryPhase::Attempting;

        loop {
            phase = match phase {
                RetryPhase::Attempting => {
                    let timeout = self
                        .attempt_timeout
                        .min(state.remaining(self.clock.now()))
                        .max(MIN_ATTEMPT_TIMEOUT);
                    let sequence = state.next_sequence();
                    let attempt = self.build_attempt(&url, &request.body, sequence, timeout);
                    let result = self.transport.send(attempt).await;
                    if let Ok(response) = &result {
                        self.cookies.update_from_headers(&response.set_cookies);
                    }

                    match classify(result, request.retry_404) {
                        AttemptOutcome::Success(response) => RetryPhase::Succeeded(response),
                        AttemptOutcome::Retryable(reason) => {
                            warn!(
                                url = %url,
                                attempt = state.attempt(),
                                reason = %reason,
                                "Request attempt failed, will retry"
                            );
                            RetryPhase::BackingOff
                        }
                        AttemptOutcome::AuthRequired if reauthenticated => {
                            error!(url = %url, "Still forbidden after re-authentication");
                            RetryPhase::Failed
                        }
                        AttemptOutcome::AuthRequired => {
                            reauthenticated = true;
                            self.reauthenticate(&url).await
                        }
                        AttemptOutcome::Terminal(reason) => {
                            error!(url = %url, reason = %reason, "Request failed");
                            RetryPhase::Failed
                        }
                    }
                }
                RetryPhase::BackingOff => {
                    if let Some(max_wait) = state.backoff_budget(self.clock.now()) {
                        self.clock
                            .sleep_before_retry(state.attempt(), Some(max_wait))
                            .await;
                        state.advance();
                        RetryPhase::Attempting
                    } else {
                        error!(
                            url = %url,
                            attempts = state.attempt() + 1,
                            "Giving up: attempts or timeout exhausted"
                        );
                        RetryPhase::Failed
                    }
                }
                RetryPhase::Succeeded(response) => {
                    self.flush().await;
                    return Some(ChannelResponse::new(response.status, response.body));
                }
                RetryPhase::Failed => return None,
            };
        }
    }

    async fn reauthenticate(&self, url: &Url) -> RetryPhase {
        debug!(url = %url, "Got 403, authenticating");
        let outcome = self.authenticator.authenticate().await;
        if outcome == AuthOutcome::Failed {
            error!(url = %url, "Authentication failed");
            return RetryPhase::Failed;
        }
        self.auth.apply(&outcome);
        RetryPhase::Attempting
    }

    fn build_attempt(
        &self,
        url: &Url,
        body: &RequestBody,
        sequence: u32,
        timeout: Duration,
    ) -> HttpRequest {
        let sequence = sequence.to_string();
        let mut url = url.clone();
        let mut headers = Vec::new();

        let (method, body) = match body {
            RequestBody::None => {
                url.query_pairs_mut().append_pair(ATTEMPT_KEY, &sequence);
                (Method::Get, None)
            }
            RequestBody::Form(fields) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .append_pair(ATTEMPT_KEY, &sequence)
                    .finish();
                headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
                (Method::Post, Some(Bytes::from(encoded)))
            }
            RequestBody::Bytes { content_type, data } => {
                url.query_pairs_mut().append_pair(ATTEMPT_KEY, &sequence);
                headers.push(("Content-Type".to_string(), content_type.clone()));
                (Method::Post, Some(data.clone()))
            }
        };

        if let Some(cookie) = self.cookies.header_value() {
            headers.push(("Cookie".to_string(), cookie));
        }
        if let Some(authorization) = self.auth.authorization() {
            headers.push(("Authorization".to_string(), authorization));
        }

        HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        }
    }
}

/// Parse the base URL, making sure relative paths resolve below it.
fn parse_base_url(base_url: &str) -> Result<Url, ChannelError> {
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalized).map_err(|source| ChannelError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })
}

impl<T, K> Drop for HttpChannel<T, K> {
    fn drop(&mut self) {
        self.cookies.persist();
    }
}

#[async_trait]
impl<T: HttpTransport, K: RetryClock> ChannelPort for HttpChannel<T, K> {
    async fn request(&self, request: ChannelRequest) -> Option<ChannelResponse> {
        Self::request(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthenticator;
    use crate::retry::testing::ManualClock;
    use crate::transport::testing::FakeTransport;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestChannel = HttpChannel<FakeTransport, ManualClock>;

    fn channel_with(transport: FakeTransport) -> TestChannel {
        channel_with_tick(transport, Duration::from_millis(1))
    }

    fn channel_with_tick(transport: FakeTransport, tick: Duration) -> TestChannel {
        let config = ChannelConfig::new().with_base_url("http://store.test/api");
        HttpChannel::with_parts(&config, transport, ManualClock::new(tick)).unwrap()
    }

    /// Answers with the given statuses in order, then 200 `"done"` forever.
    fn scripted(statuses: &'static [u16]) -> FakeTransport {
        let calls = AtomicUsize::new(0);
        FakeTransport::new(move |_| {
            let index = calls.fetch_add(1, Ordering::SeqCst);
            let status = statuses.get(index).copied().unwrap_or(200);
            Ok(HttpResponse::new(status, "done"))
        })
    }

    fn query(request: &HttpRequest) -> HashMap<String, String> {
        request.url.query_pairs().into_owned().collect()
    }

    #[tokio::test]
    async fn test_get_success_first_attempt() {
        let transport = scripted(&[]);
        let channel = channel_with(transport.clone());

        let response = channel.request(ChannelRequest::get("/some_request")).await;

        let response = response.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"done"));
        assert!(channel.clock.sleeps().is_empty());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].url.path(), "/api/some_request");
        assert_eq!(query(&requests[0]).get(ATTEMPT_KEY).map(String::as_str), Some("0"));
        assert!(requests[0].body.is_none());
    }

    #[tokio::test]
    async fn test_post_with_empty_form_is_still_post() {
        let transport = scripted(&[]);
        let channel = channel_with(transport.clone());

        let request = ChannelRequest::post_form("some_request", BTreeMap::new());
        assert!(channel.request(request).await.is_some());

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.body_text(), "UrlOpenAttempt=0");
        assert_eq!(sent.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert!(sent.url.query().is_none());
    }

    #[tokio::test]
    async fn test_form_fields_are_encoded_with_counter() {
        let transport = scripted(&[]);
        let channel = channel_with(transport.clone());

        let fields = BTreeMap::from([("foo".to_string(), "a b".to_string())]);
        assert!(channel.request(ChannelRequest::post_form("x", fields)).await.is_some());

        assert_eq!(transport.requests()[0].body_text(), "foo=a+b&UrlOpenAttempt=0");
    }

    #[tokio::test]
    async fn test_raw_bytes_post_carries_counter_in_query() {
        let transport = scripted(&[]);
        let channel = channel_with(transport.clone());

        let request =
            ChannelRequest::post_bytes("upload", "application/octet-stream", Bytes::from_static(b"\x00\x01"));
        assert!(channel.request(request).await.is_some());

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.body.as_deref(), Some(&b"\x00\x01"[..]));
        assert_eq!(sent.header("Content-Type"), Some("application/octet-stream"));
        assert_eq!(query(sent).get(ATTEMPT_KEY).map(String::as_str), Some("0"));
    }

    #[tokio::test]
    async fn test_two_server_errors_then_success() {
        let transport = scripted(&[500, 500]);
        let channel = channel_with(transport.clone());

        let response = channel.request(ChannelRequest::get("blob")).await;

        assert_eq!(response.unwrap().body, Bytes::from_static(b"done"));
        let sleeps = channel.clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert_eq!(sleeps[0].0, 0);
        assert_eq!(sleeps[1].0, 1);

        let counters: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| query(r)[ATTEMPT_KEY].clone())
            .collect();
        assert_eq!(counters, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_network_errors_exhaust_attempts() {
        let transport = FakeTransport::always_unreachable();
        let channel = channel_with(transport.clone());

        let response = channel.request(ChannelRequest::get("blob")).await;

        assert!(response.is_none());
        assert_eq!(transport.request_count(), 30);
        // No sleep after the final attempt.
        assert_eq!(channel.clock.sleeps().len(), 29);
    }

    #[tokio::test]
    async fn test_max_attempts_bound() {
        let transport = FakeTransport::always_status(503);
        let channel = channel_with(transport.clone());

        let request = ChannelRequest::get("blob").with_max_attempts(3);
        assert!(channel.request(request).await.is_none());
        assert_eq!(transport.request_count(), 3);
        assert_eq!(channel.clock.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_bound_stops_before_max_attempts() {
        let transport = FakeTransport::always_status(500);
        // Every clock read moves time forward by 10 seconds.
        let channel = channel_with_tick(transport.clone(), Duration::from_secs(10));

        let request = ChannelRequest::get("blob").with_timeout(Duration::from_secs(60));
        assert!(channel.request(request).await.is_none());

        assert_eq!(transport.request_count(), 3);
        let max_waits: Vec<_> = channel.clock.sleeps().into_iter().map(|(_, w)| w).collect();
        assert_eq!(
            max_waits,
            vec![Some(Duration::from_secs(40)), Some(Duration::from_secs(20))]
        );
    }

    #[tokio::test]
    async fn test_unbounded_timeout_keeps_retrying() {
        let transport = FakeTransport::always_status(500);
        // Ten seconds per clock read would exhaust any small fallback budget.
        let channel = channel_with_tick(transport.clone(), Duration::from_secs(10));

        let request = ChannelRequest::get("blob")
            .with_max_attempts(6)
            .with_timeout(Duration::MAX);
        assert!(channel.request(request).await.is_none());

        assert_eq!(transport.request_count(), 6);
        assert_eq!(transport.requests()[5].timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_attempt_timeout_capped_by_remaining_budget() {
        let transport = scripted(&[]);
        let channel = channel_with(transport.clone());

        let request = ChannelRequest::get("blob").with_timeout(Duration::from_secs(5));
        assert!(channel.request(request).await.is_some());

        let timeout = transport.requests()[0].timeout;
        assert!(timeout <= Duration::from_secs(5));
        assert!(timeout >= MIN_ATTEMPT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = FakeTransport::always_status(400);
        let channel = channel_with(transport.clone());

        assert!(channel.request(ChannelRequest::get("blob")).await.is_none());
        assert_eq!(transport.request_count(), 1);
        assert!(channel.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_404_fails_without_opt_in() {
        let transport = scripted(&[404]);
        let channel = channel_with(transport.clone());

        assert!(channel.request(ChannelRequest::get("blob")).await.is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_404_retried_when_opted_in() {
        let transport = scripted(&[404, 404]);
        let channel = channel_with(transport.clone());

        let request = ChannelRequest::get("blob").with_retry_404(true);
        assert!(channel.request(request).await.is_some());
        assert_eq!(transport.request_count(), 3);
        assert_eq!(channel.clock.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_reserved_key_in_data_fails_without_attempt() {
        let transport = scripted(&[]);
        let channel = channel_with(transport.clone());

        let fields = BTreeMap::from([(ATTEMPT_KEY.to_string(), "1".to_string())]);
        let response = channel.request(ChannelRequest::post_form("x", fields)).await;

        assert!(response.is_none());
        assert_eq!(transport.request_count(), 0);
        assert!(channel.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_auth_success_retries_without_backoff() {
        let transport = scripted(&[403]);
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .times(1)
            .returning(|| AuthOutcome::Authenticated {
                authorization: Some("Bearer fresh".to_string()),
            });
        let channel = channel_with(transport.clone()).with_authenticator(Arc::new(authenticator));

        let response = channel.request(ChannelRequest::get("blob")).await;

        assert_eq!(response.unwrap().status, 200);
        assert!(channel.clock.sleeps().is_empty());
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].header("Authorization"), None);
        assert_eq!(requests[1].header("Authorization"), Some("Bearer fresh"));
        // The counter still advances across the re-authenticated attempt.
        assert_eq!(query(&requests[1])[ATTEMPT_KEY], "1");
    }

    #[tokio::test]
    async fn test_forbidden_with_failed_auth_calls_hook_once() {
        let transport = FakeTransport::always_status(403);
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .times(1)
            .returning(|| AuthOutcome::Failed);
        let channel = channel_with(transport.clone()).with_authenticator(Arc::new(authenticator));

        assert!(channel.request(ChannelRequest::get("blob")).await.is_none());
        assert_eq!(transport.request_count(), 1);
        assert!(channel.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_after_successful_auth_fails() {
        let transport = FakeTransport::always_status(403);
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .times(1)
            .returning(|| AuthOutcome::Authenticated {
                authorization: None,
            });
        let channel = channel_with(transport.clone()).with_authenticator(Arc::new(authenticator));

        assert!(channel.request(ChannelRequest::get("blob")).await.is_none());
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_request_is_sent_before_authentication() {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let transport_calls = Arc::clone(&calls);
        let transport = FakeTransport::new(move |_| {
            transport_calls.lock().unwrap().push("url_open");
            Ok(HttpResponse::new(403, Bytes::new()))
        });
        let auth_calls = Arc::clone(&calls);
        let mut authenticator = MockAuthenticator::new();
        authenticator.expect_authenticate().returning(move || {
            auth_calls.lock().unwrap().push("authenticate");
            AuthOutcome::Failed
        });
        let channel = channel_with(transport).with_authenticator(Arc::new(authenticator));

        assert!(channel.request(ChannelRequest::get("blob")).await.is_none());
        assert_eq!(*calls.lock().unwrap(), vec!["url_open", "authenticate"]);
    }

    #[tokio::test]
    async fn test_configured_token_sent_as_bearer() {
        let transport = scripted(&[]);
        let config = ChannelConfig::new()
            .with_base_url("http://store.test")
            .with_token("t0k3n");
        let channel =
            HttpChannel::with_parts(&config, transport.clone(), ManualClock::new(Duration::ZERO))
                .unwrap();

        assert!(channel.request(ChannelRequest::get("blob")).await.is_some());
        assert_eq!(transport.requests()[0].header("authorization"), Some("Bearer t0k3n"));
    }

    #[tokio::test]
    async fn test_cookies_round_trip_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("cookies.json");
        let transport = FakeTransport::new(|request| {
            let response = HttpResponse::new(200, "ok");
            if request.header("Cookie").is_none() {
                Ok(response.with_set_cookie("SID=abc; Path=/"))
            } else {
                Ok(response)
            }
        });
        let config = ChannelConfig::new()
            .with_base_url("http://store.test")
            .with_cookie_file(&store);
        let channel =
            HttpChannel::with_parts(&config, transport.clone(), ManualClock::new(Duration::ZERO))
                .unwrap();

        assert!(channel.request(ChannelRequest::get("login")).await.is_some());
        assert!(channel.request(ChannelRequest::get("blob")).await.is_some());

        let requests = transport.requests();
        assert_eq!(requests[0].header("Cookie"), None);
        assert_eq!(requests[1].header("Cookie"), Some("SID=abc"));
        assert!(store.exists());

        drop(channel);
        let reloaded = CookieJar::load(Some(store));
        assert_eq!(reloaded.get("SID").as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_flush_saves_pending_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("cookies.json");
        let config = ChannelConfig::new()
            .with_base_url("http://store.test")
            .with_cookie_file(&store);
        let channel =
            HttpChannel::with_parts(&config, scripted(&[]), ManualClock::new(Duration::ZERO))
                .unwrap();

        channel.flush().await;
        assert!(!store.exists());

        channel
            .cookies()
            .update_from_headers(&["token=42; Max-Age=600".to_string()]);
        channel.flush().await;
        assert!(!channel.cookies().needs_persist());
        assert_eq!(
            CookieJar::load(Some(store)).get("token").as_deref(),
            Some("42")
        );
    }

    #[tokio::test]
    async fn test_channel_port_delegates() {
        let transport = scripted(&[500]);
        let channel: Arc<dyn ChannelPort> = Arc::new(channel_with(transport.clone()));

        let response = channel.request(ChannelRequest::get("blob")).await;
        assert_eq!(response.unwrap().body, Bytes::from_static(b"done"));
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_base_url_normalization() {
        let url = parse_base_url("http://store.test/api").unwrap();
        assert_eq!(url.join("a/b").unwrap().as_str(), "http://store.test/api/a/b");

        let url = parse_base_url("http://store.test/api///").unwrap();
        assert_eq!(url.as_str(), "http://store.test/api/");

        assert!(matches!(
            parse_base_url("not a url"),
            Err(ChannelError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_classify() {
        let ok = |status| Ok(HttpResponse::new(status, Bytes::new()));
        assert!(matches!(classify(ok(200), false), AttemptOutcome::Success(_)));
        assert!(matches!(classify(ok(204), false), AttemptOutcome::Success(_)));
        assert!(matches!(classify(ok(403), true), AttemptOutcome::AuthRequired));
        assert!(matches!(classify(ok(404), false), AttemptOutcome::Terminal(_)));
        assert!(matches!(classify(ok(404), true), AttemptOutcome::Retryable(_)));
        assert!(matches!(classify(ok(500), false), AttemptOutcome::Retryable(_)));
        assert!(matches!(classify(ok(502), false), AttemptOutcome::Retryable(_)));
        assert!(matches!(classify(ok(401), false), AttemptOutcome::Terminal(_)));
        assert!(matches!(
            classify(Err(TransportError::Timeout), false),
            AttemptOutcome::Retryable(_)
        ));
    }
}
