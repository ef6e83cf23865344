//! Keystone v3 password authentication over HTTP.
//!
//! The token comes back in the `X-Subject-Token` header; the JSON body only
//! carries its validity window. If the body cannot be read the token is
//! assumed to be issued now and to live for 24 hours.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::traits::Authenticator;
use crate::types::{AuthToken, Credentials};
use crate::utils::log_sanitizer::{mask_secret, truncate_for_log};

/// Default identity endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://cloud.api.selcloud.ru/identity/v3/auth/tokens";

/// Header carrying the issued token.
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Fallback lifetime when the response body carries no timestamps.
const FALLBACK_LIFETIME_HOURS: i64 = 24;

/// HTTP 连接超时（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP 请求超时（秒）
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("dns-orchestrator-sync/", env!("CARGO_PKG_VERSION"));

// ============ 请求体 ============

#[derive(Serialize)]
struct AuthRequest<'a> {
    auth: Auth<'a>,
}

#[derive(Serialize)]
struct Auth<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Serialize)]
struct Identity<'a> {
    methods: [&'a str; 1],
    password: PasswordMethod<'a>,
}

#[derive(Serialize)]
struct PasswordMethod<'a> {
    user: User<'a>,
}

#[derive(Serialize)]
struct User<'a> {
    name: &'a str,
    domain: Named<'a>,
    password: &'a str,
}

#[derive(Serialize)]
struct Scope<'a> {
    project: Project<'a>,
}

#[derive(Serialize)]
struct Project<'a> {
    name: &'a str,
    domain: Named<'a>,
}

#[derive(Serialize)]
struct Named<'a> {
    name: &'a str,
}

impl<'a> AuthRequest<'a> {
    /// Password identity scoped to the project; both live in the account's domain.
    fn password(credentials: &'a Credentials) -> Self {
        Self {
            auth: Auth {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: User {
                            name: &credentials.username,
                            domain: Named {
                                name: &credentials.account_id,
                            },
                            password: &credentials.password,
                        },
                    },
                },
                scope: Scope {
                    project: Project {
                        name: &credentials.project_name,
                        domain: Named {
                            name: &credentials.account_id,
                        },
                    },
                },
            },
        }
    }
}

// ============ 响应体 ============

#[derive(Deserialize)]
struct TokenResponse {
    token: TokenWindow,
}

#[derive(Deserialize)]
struct TokenWindow {
    #[serde(default, deserialize_with = "crate::utils::serde_time::timestamp::deserialize")]
    issued_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::serde_time::timestamp::deserialize")]
    expires_at: Option<DateTime<Utc>>,
}

/// Validity window from the response body, or now + 24h.
fn token_window(body: &str, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let fallback = (now, now + chrono::Duration::hours(FALLBACK_LIFETIME_HOURS));

    match serde_json::from_str::<TokenResponse>(body) {
        Ok(TokenResponse {
            token:
                TokenWindow {
                    issued_at: Some(issued_at),
                    expires_at: Some(expires_at),
                },
        }) => (issued_at, expires_at),
        Ok(_) => {
            log::warn!("Token response lacks issued_at/expires_at, assuming a 24h token");
            fallback
        }
        Err(e) => {
            log::warn!("Failed to parse token response ({e}), assuming a 24h token");
            fallback
        }
    }
}

/// [`Authenticator`] for a Keystone v3 identity service.
pub struct KeystoneAuthenticator {
    client: Client,
    token_url: String,
}

impl Default for KeystoneAuthenticator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_URL)
    }
}

impl KeystoneAuthenticator {
    pub fn new(token_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                log::error!("Failed to build HTTP client ({e}), using defaults");
                Client::new()
            });

        Self::with_client(client, token_url)
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(client: Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl Authenticator for KeystoneAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken> {
        let body = serde_json::to_vec(&AuthRequest::password(credentials)).map_err(|e| {
            SyncError::SerializationError {
                detail: e.to_string(),
            }
        })?;

        log::debug!("POST {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Timeout {
                        detail: e.to_string(),
                    }
                } else {
                    SyncError::NetworkError {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        log::debug!("Response Status: {status}");

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let subject_token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().await.unwrap_or_default();
        log::debug!("Response Body: {}", truncate_for_log(&text));

        let raw_message = (!text.is_empty()).then(|| truncate_for_log(&text));
        match status {
            StatusCode::CREATED => {}
            StatusCode::UNAUTHORIZED => {
                log::warn!("Credentials rejected for user {}", credentials.username);
                return Err(SyncError::InvalidCredentials { raw_message });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                log::warn!("Rate limited (HTTP 429), retry_after={retry_after:?}");
                return Err(SyncError::RateLimited {
                    retry_after,
                    raw_message,
                });
            }
            s if s.is_server_error() => {
                log::warn!("Server error (HTTP {})", s.as_u16());
                return Err(SyncError::ServerError {
                    status: s.as_u16(),
                    raw_message,
                });
            }
            s => {
                log::warn!("Unexpected status code {}", s.as_u16());
                return Err(SyncError::Api {
                    status: Some(s.as_u16()),
                    raw_message: raw_message
                        .unwrap_or_else(|| format!("unexpected status code {}", s.as_u16())),
                });
            }
        }

        let value = subject_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            SyncError::ParseError {
                detail: format!("missing {SUBJECT_TOKEN_HEADER} header"),
            }
        })?;

        let (issued_at, expires_at) = token_window(&text, Utc::now());
        log::debug!("Issued token {} expiring at {expires_at}", mask_secret(&value));

        Ok(AuthToken {
            value,
            issued_at,
            expires_at,
        })
    }
}
