//! Bearer-token lifecycle.
//!
//! [`TokenManager`] holds the current token behind a read/write lock,
//! authenticates lazily, re-authenticates when the service rejects the token
//! mid-request, and makes sure concurrent callers share one refresh. The
//! token's `issued_at` doubles as a generation stamp: a caller that waited
//! for the write lock compares it against the stamp it saw before waiting and
//! skips the exchange if someone else already refreshed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::context::CallContext;
use crate::error::{Result, SyncError};
use crate::retry::{RetryPolicy, retry};
use crate::traits::Authenticator;
use crate::types::{AuthToken, Credentials};

/// How much earlier than the server-declared expiry a token is refreshed.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60 * 60);

fn margin_delta(margin: Duration) -> chrono::Duration {
    chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::MAX)
}

pub struct TokenManager {
    authenticator: Arc<dyn Authenticator>,
    credentials: Credentials,
    token: RwLock<Option<AuthToken>>,
    safety_margin: chrono::Duration,
    retry: RetryPolicy,
}

impl TokenManager {
    pub fn new(authenticator: Arc<dyn Authenticator>, credentials: Credentials) -> Self {
        Self {
            authenticator,
            credentials,
            token: RwLock::new(None),
            safety_margin: margin_delta(DEFAULT_SAFETY_MARGIN),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin_delta(margin);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Current token, if any has been issued yet.
    pub async fn token(&self) -> Option<AuthToken> {
        self.token.read().await.clone()
    }

    /// Run `call` with a valid token.
    ///
    /// Authenticates first when no usable token is held. When `call` fails
    /// with [`SyncError::Unauthorized`] the token is refreshed once and the
    /// call repeated; a second rejection is returned to the caller. The whole
    /// procedure runs under the configured [`RetryPolicy`].
    pub async fn execute<T, F, Fut>(&self, ctx: &CallContext, what: &str, call: F) -> Result<T>
    where
        F: Fn(AuthToken) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let call = &call;
        retry(ctx, &self.retry, what, move || self.attempt(call)).await
    }

    async fn attempt<T, F, Fut>(&self, call: &F) -> Result<T>
    where
        F: Fn(AuthToken) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let snapshot = self.token().await;
        let mut token = match snapshot {
            Some(token) if !token.is_expired(Utc::now()) => token,
            stale => self.authenticate(stale.map(|t| t.issued_at)).await?,
        };

        let mut refreshed = false;
        loop {
            match call(token.clone()).await {
                Err(SyncError::Unauthorized { .. }) if !refreshed => {
                    log::debug!("Token rejected by the service, re-authenticating");
                    refreshed = true;
                    token = self.authenticate(Some(token.issued_at)).await?;
                }
                result => return result,
            }
        }
    }

    /// Exchange credentials unless the held token is newer than `stale`.
    ///
    /// The returned token is used as is, even if the safety margin already
    /// puts it past expiry.
    async fn authenticate(&self, stale: Option<DateTime<Utc>>) -> Result<AuthToken> {
        let mut held = self.token.write().await;

        if let Some(current) = held.as_ref()
            && Some(current.issued_at) != stale
        {
            log::debug!("Token already refreshed by a concurrent caller");
            return Ok(current.clone());
        }

        log::debug!("Authenticating as {}", self.credentials.username);
        let issued = self.authenticator.authenticate(&self.credentials).await?;
        let expires_at = issued
            .expires_at
            .checked_sub_signed(self.safety_margin)
            .unwrap_or(issued.issued_at);
        let token = AuthToken {
            expires_at,
            ..issued
        };

        log::info!(
            "Authenticated as {}, token refresh due at {}",
            self.credentials.username,
            token.expires_at
        );
        *held = Some(token.clone());
        Ok(token)
    }

    #[cfg(test)]
    pub(crate) async fn install_token(&self, token: AuthToken) {
        *self.token.write().await = Some(token);
    }
}
