#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

// Re-export the port this crate implements
pub use blobsync_core::ports::{
    ChannelPort, ChannelRequest, ChannelResponse, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT,
    RequestBody,
};

mod auth;
mod channel;
mod config;
mod cookies;
mod error;
mod retry;
mod transport;

pub use auth::{AuthOutcome, Authenticator, NoAuthenticator};
pub use channel::{ATTEMPT_KEY, HttpChannel};
pub use config::ChannelConfig;
pub use cookies::CookieJar;
pub use error::{ChannelError, TransportError};
pub use retry::{
    MAX_SLEEP, MIN_ATTEMPT_TIMEOUT, RETRY_BASE, RetryClock, RetryState, TokioClock,
    calculate_sleep_before_retry,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
