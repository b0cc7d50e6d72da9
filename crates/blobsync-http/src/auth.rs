//! Re-authentication hook and the channel's auth state.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

/// Result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Authentication failed; the pending request fails with it.
    Failed,
    /// Authentication succeeded.
    Authenticated {
        /// New `Authorization` header value, or `None` when the session is
        /// carried by cookies alone.
        authorization: Option<String>,
    },
}

/// Called by the channel when the server answers HTTP 403.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> AuthOutcome;
}

/// Authenticator for anonymous access: always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthenticator;

#[async_trait]
impl Authenticator for NoAuthenticator {
    async fn authenticate(&self) -> AuthOutcome {
        debug!("No authenticator configured");
        AuthOutcome::Failed
    }
}

/// Current credentials of a channel session.
#[derive(Debug, Default)]
pub(crate) struct AuthState {
    authorization: RwLock<Option<String>>,
}

impl AuthState {
    /// Start with a bearer token, if any.
    pub(crate) fn with_token(token: Option<&str>) -> Self {
        Self {
            authorization: RwLock::new(token.map(|token| format!("Bearer {token}"))),
        }
    }

    pub(crate) fn authorization(&self) -> Option<String> {
        self.authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a successful authentication.
    pub(crate) fn apply(&self, outcome: &AuthOutcome) {
        if let AuthOutcome::Authenticated {
            authorization: Some(value),
        } = outcome
        {
            *self
                .authorization
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        }
    }
}
